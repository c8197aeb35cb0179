use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{actor::ActorId, errors::ProviderError};

/// One write inside a state transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOperation {
    Upsert { key: String, value: Bytes },
    Delete { key: String },
}

/// Durable key-value store holding actor state.
///
/// Keys are opaque strings scoped by `(actor_type, actor_id)`. Implementations must apply
/// a transaction all-or-nothing.
#[async_trait]
pub trait StateProvider: Debug + Send + Sync {
    /// Fetch a single key, `Ok(None)` when it does not exist.
    async fn get(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        key: &str,
    ) -> Result<Option<Bytes>, ProviderError>;

    async fn execute_transaction(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        operations: Vec<StateOperation>,
    ) -> Result<(), ProviderError>;
}

// Implementations

impl StateOperation {
    pub fn key(&self) -> &str {
        match self {
            StateOperation::Upsert { key, .. } | StateOperation::Delete { key } => key,
        }
    }

    pub fn is_upsert(&self) -> bool {
        matches!(self, StateOperation::Upsert { .. })
    }
}
