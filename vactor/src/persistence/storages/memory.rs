//! In-memory state provider for tests and single-process development.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::{
    actor::ActorId,
    base::lock,
    errors::ProviderError,
    persistence::state_provider::{StateOperation, StateProvider},
    trace,
};

type Scope = (String, ActorId);

/// A transaction as it reached the provider, committed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransaction {
    pub actor_type: String,
    pub actor_id: ActorId,
    pub operations: Vec<StateOperation>,
    pub committed: bool,
}

/// State provider keeping everything in a process-local map.
///
/// Every transaction attempt is recorded, and failures can be injected with
/// [`fail_next_transactions`](Self::fail_next_transactions) and
/// [`fail_next_gets`](Self::fail_next_gets).
#[derive(Debug, Default)]
pub struct MemoryStateProvider {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    data: FxHashMap<Scope, FxHashMap<String, Bytes>>,
    transactions: Vec<RecordedTransaction>,
    fetches: usize,
    failing_transactions: usize,
    failing_gets: usize,
}

// Implementations

impl MemoryStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value directly, bypassing transactions.
    pub fn insert(
        &self,
        actor_type: impl Into<String>,
        actor_id: &ActorId,
        key: impl Into<String>,
        value: impl Into<Bytes>,
    ) {
        lock(&self.inner)
            .data
            .entry((actor_type.into(), actor_id.clone()))
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn value(&self, actor_type: &str, actor_id: &ActorId, key: &str) -> Option<Bytes> {
        lock(&self.inner)
            .data
            .get(&(actor_type.to_owned(), actor_id.clone()))
            .and_then(|scope| scope.get(key).cloned())
    }

    /// Every transaction attempt so far, in arrival order.
    pub fn transactions(&self) -> Vec<RecordedTransaction> {
        lock(&self.inner).transactions.clone()
    }

    pub fn committed_transactions(&self) -> Vec<RecordedTransaction> {
        lock(&self.inner)
            .transactions
            .iter()
            .filter(|t| t.committed)
            .cloned()
            .collect()
    }

    /// Number of `get` calls that reached the provider.
    pub fn fetch_count(&self) -> usize {
        lock(&self.inner).fetches
    }

    pub fn fail_next_transactions(&self, count: usize) {
        lock(&self.inner).failing_transactions = count;
    }

    pub fn fail_next_gets(&self, count: usize) {
        lock(&self.inner).failing_gets = count;
    }
}

#[async_trait]
impl StateProvider for MemoryStateProvider {
    async fn get(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        key: &str,
    ) -> Result<Option<Bytes>, ProviderError> {
        let mut inner = lock(&self.inner);
        inner.fetches += 1;

        if inner.failing_gets > 0 {
            inner.failing_gets -= 1;
            return Err(ProviderError::new(format!(
                "injected read failure for {actor_type}/{actor_id}/{key}"
            )));
        }

        Ok(inner
            .data
            .get(&(actor_type.to_owned(), actor_id.clone()))
            .and_then(|scope| scope.get(key).cloned()))
    }

    async fn execute_transaction(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        operations: Vec<StateOperation>,
    ) -> Result<(), ProviderError> {
        let mut inner = lock(&self.inner);

        let committed = inner.failing_transactions == 0;
        inner.transactions.push(RecordedTransaction {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.clone(),
            operations: operations.clone(),
            committed,
        });

        if !committed {
            inner.failing_transactions -= 1;
            return Err(ProviderError::new(format!(
                "injected transaction failure for {actor_type}/{actor_id}"
            )));
        }

        let scope = inner
            .data
            .entry((actor_type.to_owned(), actor_id.clone()))
            .or_default();

        for op in operations {
            match op {
                StateOperation::Upsert { key, value } => {
                    scope.insert(key, value);
                }
                StateOperation::Delete { key } => {
                    scope.remove(&key);
                }
            }
        }

        trace!("committed transaction for {actor_type}/{actor_id}");

        Ok(())
    }
}
