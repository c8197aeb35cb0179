use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    actor::ActorId,
    actor_instance::ActorCore,
    duration::Interval,
    errors::ActorError,
    persistence::state_provider::StateProvider,
    remote::client::ActorClient,
    serializer::{JsonSerializer, StateSerializer},
    state_manager::StateManager,
    timer::{ActorReminderParams, ActorTimer},
};

/// What happens to state written by a method body that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Finish the call normally and commit whatever the body wrote before failing.
    #[default]
    Always,
    /// Roll the call back, discarding every uncommitted change.
    OnSuccess,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub commit_policy: CommitPolicy,
}

/// Collaborators shared by every instance of one actor type.
///
/// Immutable once built and expected to outlive every instance holding it.
#[derive(Debug)]
pub struct ActorRuntimeContext {
    actor_type: String,
    state_provider: Arc<dyn StateProvider>,
    serializer: Arc<dyn StateSerializer>,
    client: Arc<dyn ActorClient>,
    config: RuntimeConfig,
}

#[derive(Debug)]
pub struct ActorRuntimeContextBuilder {
    actor_type: String,
    state_provider: Option<Arc<dyn StateProvider>>,
    serializer: Option<Arc<dyn StateSerializer>>,
    client: Option<Arc<dyn ActorClient>>,
    config: RuntimeConfig,
}

/// View of one actor instance handed to behavior code.
///
/// Borrows the instance for the duration of a single hook or method, so behavior code can
/// never observe the instance between lifecycle steps.
#[derive(Debug)]
pub struct Context<'a> {
    pub(crate) core: &'a mut ActorCore,
}

// Implementations

impl ActorRuntimeContext {
    pub fn builder(actor_type: impl Into<String>) -> ActorRuntimeContextBuilder {
        ActorRuntimeContextBuilder {
            actor_type: actor_type.into(),
            state_provider: None,
            serializer: None,
            client: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    pub fn state_provider(&self) -> &dyn StateProvider {
        &*self.state_provider
    }

    pub fn serializer(&self) -> &dyn StateSerializer {
        &*self.serializer
    }

    pub fn client(&self) -> &dyn ActorClient {
        &*self.client
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl ActorRuntimeContextBuilder {
    pub fn state_provider(mut self, provider: Arc<dyn StateProvider>) -> Self {
        self.state_provider = Some(provider);
        self
    }

    /// Defaults to [`JsonSerializer`].
    pub fn serializer(mut self, serializer: Arc<dyn StateSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn client(mut self, client: Arc<dyn ActorClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.config.commit_policy = policy;
        self
    }

    pub fn build(self) -> Result<Arc<ActorRuntimeContext>, ActorError> {
        if self.actor_type.is_empty() {
            return Err(ActorError::InvalidArgument(
                "actor type name must not be empty".into(),
            ));
        }

        let Some(state_provider) = self.state_provider else {
            return Err(ActorError::InvalidArgument(format!(
                "no state provider configured for {}",
                self.actor_type
            )));
        };

        let Some(client) = self.client else {
            return Err(ActorError::InvalidArgument(format!(
                "no actor client configured for {}",
                self.actor_type
            )));
        };

        Ok(Arc::new(ActorRuntimeContext {
            actor_type: self.actor_type,
            state_provider,
            serializer: self.serializer.unwrap_or_else(|| Arc::new(JsonSerializer)),
            client,
            config: self.config,
        }))
    }
}

impl<'a> Context<'a> {
    pub(crate) fn new(core: &'a mut ActorCore) -> Self {
        Self { core }
    }

    pub fn id(&self) -> &ActorId {
        &self.core.id
    }

    pub fn actor_type(&self) -> &str {
        self.core.runtime.actor_type()
    }

    pub fn runtime(&self) -> &Arc<ActorRuntimeContext> {
        &self.core.runtime
    }

    pub fn state(&mut self) -> &mut StateManager {
        &mut self.core.state
    }

    pub fn serializer(&self) -> &dyn StateSerializer {
        self.core.runtime.serializer()
    }

    pub fn timer(&self, name: &str) -> Option<&ActorTimer> {
        self.core.timers.get(name)
    }

    pub fn timer_names(&self) -> Vec<String> {
        self.core.timers.names()
    }

    /// Register a timer invoking `callback` with `state`, returning its name.
    ///
    /// Without a name one is generated as `<actorId>_Timer_<n>`.
    pub async fn register_timer<T: Serialize + Sync>(
        &mut self,
        name: Option<&str>,
        callback: &str,
        state: &T,
        due_time: impl Into<Interval>,
        period: impl Into<Interval>,
    ) -> Result<String, ActorError> {
        self.core
            .register_actor_timer(name, callback, state, due_time.into(), period.into())
            .await
    }

    pub async fn unregister_timer(&mut self, name: &str) -> Result<(), ActorError> {
        self.core.unregister_timer(name).await
    }

    pub async fn register_reminder<T: Serialize + Sync>(
        &mut self,
        name: &str,
        state: &T,
        due_time: impl Into<Interval>,
        period: impl Into<Interval>,
    ) -> Result<(), ActorError> {
        self.core
            .register_reminder(name, state, due_time.into(), period.into())
            .await
    }

    /// Register a reminder from prebuilt parameters, e.g. one carrying no data.
    pub async fn register_reminder_params(
        &mut self,
        name: &str,
        params: &ActorReminderParams,
    ) -> Result<(), ActorError> {
        self.core.register_reminder_params(name, params).await
    }

    pub async fn unregister_reminder(&mut self, name: &str) -> Result<(), ActorError> {
        self.core.unregister_reminder(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{persistence::MemoryStateProvider, remote::LoopbackActorClient};

    #[test]
    fn test_build_requires_collaborators() {
        let err = ActorRuntimeContext::builder("DemoActor")
            .client(Arc::new(LoopbackActorClient::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ActorError::InvalidArgument(_)));

        let err = ActorRuntimeContext::builder("")
            .state_provider(Arc::new(MemoryStateProvider::new()))
            .client(Arc::new(LoopbackActorClient::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ActorError::InvalidArgument(_)));
    }

    #[test]
    fn test_build_defaults() {
        let runtime = ActorRuntimeContext::builder("DemoActor")
            .state_provider(Arc::new(MemoryStateProvider::new()))
            .client(Arc::new(LoopbackActorClient::new()))
            .build()
            .unwrap();

        assert_eq!(runtime.actor_type(), "DemoActor");
        assert_eq!(runtime.serializer().content_type(), "application/json");
        assert_eq!(runtime.config().commit_policy, CommitPolicy::Always);
    }

    #[test]
    fn test_runtime_config_from_json() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"commitPolicy":"on_success"}"#).unwrap();
        assert_eq!(config.commit_policy, CommitPolicy::OnSuccess);

        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
