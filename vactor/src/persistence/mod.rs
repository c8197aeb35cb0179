pub mod state_provider;
pub mod storages;

// Re-exports
pub use state_provider::{StateOperation, StateProvider};
pub use storages::memory::MemoryStateProvider;
