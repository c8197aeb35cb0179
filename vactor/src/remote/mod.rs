pub mod client;
pub mod loopback;
pub mod wire;

// Re-exports
pub use client::ActorClient;
pub use loopback::{ClientCall, LoopbackActorClient};
