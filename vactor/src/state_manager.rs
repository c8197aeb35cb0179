//! Per-actor cache over the durable state provider.
//!
//! The cache holds the net effect of every mutation since the last commit or clear.
//! Nothing reaches the store until [`StateManager::save`], which flushes all pending
//! changes in one transaction.

use std::sync::Arc;

use bytes::Bytes;
use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    actor::ActorId,
    context::ActorRuntimeContext,
    debug,
    errors::StateError,
    persistence::state_provider::StateOperation,
};

/// How a cached entry differs from the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeKind {
    /// Same as the last value read or committed.
    Unchanged,
    Upsert,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    /// `None` exactly when the entry is tagged [`StateChangeKind::Remove`].
    pub value: Option<Bytes>,
    pub change: StateChangeKind,
}

#[derive(Debug)]
pub struct StateManager {
    runtime: Arc<ActorRuntimeContext>,
    actor_id: ActorId,
    cache: FxHashMap<String, StateEntry>,
}

// Implementations

impl StateEntry {
    fn unchanged(value: Bytes) -> Self {
        Self {
            value: Some(value),
            change: StateChangeKind::Unchanged,
        }
    }

    fn upsert(value: Bytes) -> Self {
        Self {
            value: Some(value),
            change: StateChangeKind::Upsert,
        }
    }

    fn remove() -> Self {
        Self {
            value: None,
            change: StateChangeKind::Remove,
        }
    }
}

impl StateManager {
    pub fn new(runtime: Arc<ActorRuntimeContext>, actor_id: ActorId) -> Self {
        Self {
            runtime,
            actor_id,
            cache: FxHashMap::default(),
        }
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Typed read, failing with [`StateError::NotFound`] when the key does not exist.
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, StateError> {
        self.try_get(key)
            .await?
            .ok_or_else(|| StateError::NotFound(key.to_owned()))
    }

    pub async fn try_get<T: DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Option<T>, StateError> {
        let Some(bytes) = self.get_raw(key).await? else {
            return Ok(None);
        };

        Ok(Some(self.runtime.serializer().deserialize_value(&bytes)?))
    }

    /// Raw read. Consults the cache first and fetches from the provider on a miss.
    ///
    /// A fetched value is cached as unchanged. Absence is not cached, so a later read
    /// fetches again.
    pub async fn get_raw(&mut self, key: &str) -> Result<Option<Bytes>, StateError> {
        if let Some(entry) = self.cache.get(key) {
            return Ok(entry.value.clone());
        }

        let fetched = self
            .runtime
            .state_provider()
            .get(self.runtime.actor_type(), &self.actor_id, key)
            .await
            .map_err(StateError::Provider)?;

        if let Some(value) = &fetched {
            self.cache
                .insert(key.to_owned(), StateEntry::unchanged(value.clone()));
        }

        Ok(fetched)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let bytes = self.runtime.serializer().serialize_value(value)?;
        self.set_raw(key, bytes);
        Ok(())
    }

    pub fn set_raw(&mut self, key: &str, value: Bytes) {
        self.cache.insert(key.to_owned(), StateEntry::upsert(value));
    }

    /// Like [`set`](Self::set), but fails with [`StateError::AlreadyExists`] when the key
    /// is present.
    pub async fn add<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        if self.contains(key).await? {
            return Err(StateError::AlreadyExists(key.to_owned()));
        }

        self.set(key, value)
    }

    /// Mark `key` for deletion. Idempotent and valid whether or not the key exists.
    pub fn remove(&mut self, key: &str) {
        self.cache.insert(key.to_owned(), StateEntry::remove());
    }

    pub async fn contains(&mut self, key: &str) -> Result<bool, StateError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Flush every pending change in a single transaction.
    ///
    /// On failure the cache is left as it was, so a retry sends the same operations.
    pub async fn save(&mut self) -> Result<(), StateError> {
        let operations = self.pending_operations();
        if operations.is_empty() {
            return Ok(());
        }

        let count = operations.len();

        self.runtime
            .state_provider()
            .execute_transaction(self.runtime.actor_type(), &self.actor_id, operations)
            .await
            .map_err(StateError::Commit)?;

        self.cache.retain(|_, entry| match entry.change {
            StateChangeKind::Remove => false,
            StateChangeKind::Upsert | StateChangeKind::Unchanged => {
                entry.change = StateChangeKind::Unchanged;
                true
            }
        });

        debug!(
            "committed {count} state operation(s) for {}/{}",
            self.runtime.actor_type(),
            self.actor_id
        );

        Ok(())
    }

    /// Discard the whole cache. Never touches the store.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn change_kind(&self, key: &str) -> Option<StateChangeKind> {
        self.cache.get(key).map(|entry| entry.change)
    }

    /// Operations the next [`save`](Self::save) would send, sorted by key.
    pub fn pending_operations(&self) -> Vec<StateOperation> {
        let mut operations: Vec<_> = self
            .cache
            .iter()
            .filter_map(|(key, entry)| match (entry.change, &entry.value) {
                (StateChangeKind::Upsert, Some(value)) => Some(StateOperation::Upsert {
                    key: key.clone(),
                    value: value.clone(),
                }),
                (StateChangeKind::Remove, _) => Some(StateOperation::Delete { key: key.clone() }),
                _ => None,
            })
            .collect();

        operations.sort_by(|a, b| a.key().cmp(b.key()));
        operations
    }

    pub fn has_pending_changes(&self) -> bool {
        self.cache
            .values()
            .any(|entry| entry.change != StateChangeKind::Unchanged)
    }

    /// Sorted keys currently held in the cache, removed ones included.
    pub fn cached_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.cache.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        persistence::{MemoryStateProvider, state_provider::StateProvider},
        remote::LoopbackActorClient,
    };

    fn manager() -> (Arc<MemoryStateProvider>, StateManager) {
        let provider = Arc::new(MemoryStateProvider::new());
        let runtime = ActorRuntimeContext::builder("DemoActor")
            .state_provider(provider.clone())
            .client(Arc::new(LoopbackActorClient::new()))
            .build()
            .unwrap();

        (provider, StateManager::new(runtime, ActorId::new("maru")))
    }

    #[tokio::test]
    async fn test_set_then_remove_yields_absent() {
        let (_provider, mut state) = manager();

        state.set("counter", &1).unwrap();
        state.remove("counter");

        assert!(!state.contains("counter").await.unwrap());
        assert!(matches!(
            state.get::<i32>("counter").await,
            Err(StateError::NotFound(k)) if k == "counter"
        ));
    }

    #[tokio::test]
    async fn test_remove_then_set_yields_value() {
        let (_provider, mut state) = manager();

        state.remove("counter");
        state.set("counter", &2).unwrap();

        assert_eq!(state.get::<i32>("counter").await.unwrap(), 2);
        assert_eq!(
            state.change_kind("counter"),
            Some(StateChangeKind::Upsert)
        );
    }

    #[tokio::test]
    async fn test_read_is_cached_after_first_fetch() {
        let (provider, mut state) = manager();
        provider.insert("DemoActor", &ActorId::new("maru"), "name", &b"\"maru\""[..]);

        assert_eq!(state.get::<String>("name").await.unwrap(), "maru");
        assert_eq!(state.get::<String>("name").await.unwrap(), "maru");

        assert_eq!(provider.fetch_count(), 1);
        assert!(!state.has_pending_changes());
    }

    #[tokio::test]
    async fn test_removed_key_is_not_fetched() {
        let (provider, mut state) = manager();
        provider.insert("DemoActor", &ActorId::new("maru"), "name", &b"\"maru\""[..]);

        state.remove("name");

        assert!(state.try_get::<String>("name").await.unwrap().is_none());
        assert_eq!(provider.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_save_flushes_one_transaction_and_clear_refetches() {
        let (provider, mut state) = manager();
        let id = ActorId::new("maru");
        provider.insert("DemoActor", &id, "stale", &b"0"[..]);

        state.set("b", &2).unwrap();
        state.set("a", &1).unwrap();
        state.remove("stale");
        state.save().await.unwrap();

        let committed = provider.committed_transactions();
        assert_eq!(committed.len(), 1);
        assert_eq!(
            committed[0].operations,
            vec![
                StateOperation::Upsert {
                    key: "a".into(),
                    value: Bytes::from_static(b"1"),
                },
                StateOperation::Upsert {
                    key: "b".into(),
                    value: Bytes::from_static(b"2"),
                },
                StateOperation::Delete {
                    key: "stale".into(),
                },
            ]
        );

        assert!(committed[0].operations[0].is_upsert());
        assert!(!committed[0].operations[2].is_upsert());

        assert_eq!(state.cached_keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(!state.has_pending_changes());

        state.clear();
        assert_eq!(state.get::<i32>("a").await.unwrap(), 1);
        assert!(state.try_get::<i32>("stale").await.unwrap().is_none());
        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_save_without_changes_skips_provider() {
        let (provider, mut state) = manager();

        state.save().await.unwrap();

        assert!(provider.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_pending_changes() {
        let (provider, mut state) = manager();
        provider.fail_next_transactions(1);

        state.set("counter", &1).unwrap();
        state.remove("gone");

        assert!(matches!(state.save().await, Err(StateError::Commit(_))));
        assert!(state.has_pending_changes());

        state.save().await.unwrap();

        let attempts = provider.transactions();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].operations, attempts[1].operations);
        assert_eq!(
            provider.get("DemoActor", &ActorId::new("maru"), "counter").await.unwrap(),
            Some(Bytes::from_static(b"1"))
        );
    }

    #[tokio::test]
    async fn test_add_rejects_existing_key() {
        let (provider, mut state) = manager();
        provider.insert("DemoActor", &ActorId::new("maru"), "counter", &b"5"[..]);

        assert!(matches!(
            state.add("counter", &1).await,
            Err(StateError::AlreadyExists(_))
        ));

        state.remove("counter");
        state.add("counter", &1).await.unwrap();
        assert_eq!(state.get::<i32>("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_provider_read_failure_surfaces() {
        let (provider, mut state) = manager();
        provider.fail_next_gets(1);

        assert!(matches!(
            state.contains("counter").await,
            Err(StateError::Provider(_))
        ));
        assert!(!state.contains("counter").await.unwrap());
    }
}
