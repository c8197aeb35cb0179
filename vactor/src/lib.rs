//! Client-side runtime for virtual actors hosted by a sidecar runtime.
//!
//! An [`ActorInstance`](actor_instance::ActorInstance) drives user
//! [`ActorBehavior`](actor::ActorBehavior) through activation, method calls and
//! deactivation, caching state through a [`StateManager`](state_manager::StateManager)
//! and registering timers and reminders with the runtime through an
//! [`ActorClient`](remote::ActorClient).

pub mod actor;
pub mod actor_instance;
pub mod base;
pub mod context;
pub mod duration;
pub mod errors;
pub mod message;
pub mod persistence;
pub mod remote;
pub mod serializer;
pub mod state_manager;
pub mod timer;

// Re-exports

pub use bytes;

pub mod prelude {
    pub use bytes::Bytes;

    pub use crate::actor::{ActorBehavior, ActorId};
    pub use crate::actor_instance::{ActorInstance, Lifecycle};
    pub use crate::context::{ActorRuntimeContext, CommitPolicy, Context, RuntimeConfig};
    pub use crate::duration::Interval;
    pub use crate::errors::{
        ActorError, ClientError, FormatError, ProviderError, SerializerError, StateError,
    };
    pub use crate::message::{ActorCallType, ActorMethodContext};
    pub use crate::persistence::{MemoryStateProvider, StateOperation, StateProvider};
    pub use crate::remote::{ActorClient, LoopbackActorClient};
    #[cfg(feature = "postcard")]
    pub use crate::serializer::PostcardSerializer;
    pub use crate::serializer::{JsonSerializer, StateSerializer};
    pub use crate::state_manager::StateManager;
    pub use crate::timer::{ActorReminderParams, ActorTimer};
}
