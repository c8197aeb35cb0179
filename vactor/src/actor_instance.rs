use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use serde::Serialize;

use crate::{
    actor::{ActorBehavior, ActorId},
    context::{ActorRuntimeContext, CommitPolicy, Context},
    debug,
    duration::Interval,
    error,
    errors::ActorError,
    info,
    message::ActorMethodContext,
    state_manager::StateManager,
    timer::{ActorReminderParams, ActorTimer, TimerTable},
    warn,
};

/// Where an instance stands in its lifecycle.
///
/// `Inert -> Activating -> Idle <-> InCall -> Deactivating -> Gone`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Inert,
    Activating,
    Idle,
    InCall,
    Deactivating,
    Gone,
}

/// Everything of an instance except its behavior.
#[derive(Debug)]
pub(crate) struct ActorCore {
    pub(crate) id: ActorId,
    pub(crate) runtime: Arc<ActorRuntimeContext>,
    pub(crate) state: StateManager,
    pub(crate) timers: TimerTable,
}

/// One in-memory activation of a virtual actor.
///
/// The dispatch layer owns the instance and delivers at most one step at a time; every
/// step takes `&mut self`. The call-in-flight flag still fails fast if the protocol is
/// broken, e.g. a second `begin_call` without `end_call`.
pub struct ActorInstance<B: ActorBehavior> {
    behavior: B,
    core: ActorCore,
    lifecycle: Lifecycle,
    call_in_flight: AtomicBool,
}

// Implementations

impl ActorCore {
    fn new(runtime: Arc<ActorRuntimeContext>, id: ActorId) -> Self {
        Self {
            state: StateManager::new(runtime.clone(), id.clone()),
            timers: TimerTable::new(id.clone()),
            id,
            runtime,
        }
    }

    pub(crate) async fn register_actor_timer<T: Serialize + Sync>(
        &mut self,
        name: Option<&str>,
        callback: &str,
        state: &T,
        due_time: Interval,
        period: Interval,
    ) -> Result<String, ActorError> {
        if callback.is_empty() {
            return Err(ActorError::InvalidArgument(
                "timer callback must not be empty".into(),
            ));
        }

        let name = match name {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => self.timers.next_name(),
        };

        let data = self.runtime.serializer().serialize_value(state)?;
        let timer = ActorTimer::new(name.clone(), callback, data, due_time, period);
        let payload = timer.encode()?;

        // The local entry stays even if the runtime rejects the registration
        self.timers.insert(timer);

        self.runtime
            .client()
            .register_timer(self.runtime.actor_type(), &self.id, &name, payload)
            .await
            .map_err(|source| {
                warn!("failed to register timer {name} for {}: {source}", self.id);
                ActorError::Registration {
                    name: name.clone(),
                    source,
                }
            })?;

        debug!("registered timer {name} for {}", self.id);

        Ok(name)
    }

    pub(crate) async fn unregister_timer(&mut self, name: &str) -> Result<(), ActorError> {
        if !self.timers.contains(name) {
            return Err(ActorError::TimerNotFound(name.to_owned()));
        }

        self.runtime
            .client()
            .unregister_timer(self.runtime.actor_type(), &self.id, name)
            .await
            .map_err(|source| ActorError::Registration {
                name: name.to_owned(),
                source,
            })?;

        self.timers.remove(name);

        Ok(())
    }

    pub(crate) async fn register_reminder<T: Serialize + Sync>(
        &mut self,
        name: &str,
        state: &T,
        due_time: Interval,
        period: Interval,
    ) -> Result<(), ActorError> {
        let data = self.runtime.serializer().serialize_value(state)?;
        let params = ActorReminderParams::new(Some(data), due_time, period);

        self.register_reminder_params(name, &params).await
    }

    pub(crate) async fn register_reminder_params(
        &mut self,
        name: &str,
        params: &ActorReminderParams,
    ) -> Result<(), ActorError> {
        if name.is_empty() {
            return Err(ActorError::InvalidArgument(
                "reminder name must not be empty".into(),
            ));
        }

        let payload = params.encode()?;

        self.runtime
            .client()
            .register_reminder(self.runtime.actor_type(), &self.id, name, payload)
            .await
            .map_err(|source| ActorError::Registration {
                name: name.to_owned(),
                source,
            })
    }

    pub(crate) async fn unregister_reminder(&mut self, name: &str) -> Result<(), ActorError> {
        if name.is_empty() {
            return Err(ActorError::InvalidArgument(
                "reminder name must not be empty".into(),
            ));
        }

        self.runtime
            .client()
            .unregister_reminder(self.runtime.actor_type(), &self.id, name)
            .await
            .map_err(|source| ActorError::Registration {
                name: name.to_owned(),
                source,
            })
    }
}

impl<B: ActorBehavior> ActorInstance<B> {
    pub fn new(runtime: Arc<ActorRuntimeContext>, id: impl Into<ActorId>, behavior: B) -> Self {
        Self {
            behavior,
            core: ActorCore::new(runtime, id.into()),
            lifecycle: Lifecycle::Inert,
            call_in_flight: AtomicBool::new(false),
        }
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

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_call_in_flight(&self) -> bool {
        self.call_in_flight.load(Ordering::Acquire)
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn state(&self) -> &StateManager {
        &self.core.state
    }

    pub fn timers(&self) -> &TimerTable {
        &self.core.timers
    }

    /// Behavior-side view of the instance, for dispatch layers running code between steps.
    pub fn context(&mut self) -> Context<'_> {
        Context::new(&mut self.core)
    }

    /// Bring the instance into memory.
    ///
    /// State written by `on_activate` is committed before the instance accepts calls. On
    /// failure the instance is `Gone` and must be discarded.
    pub async fn activate(&mut self) -> Result<(), ActorError> {
        if self.lifecycle != Lifecycle::Inert {
            return Err(self.violation(format!("cannot activate while {:?}", self.lifecycle)));
        }

        info!(
            actor_type = %self.actor_type(),
            actor_id = %self.core.id,
            "Activating ..."
        );

        self.lifecycle = Lifecycle::Activating;
        self.core.state.clear();

        if let Err(e) = self.run_activation().await {
            error!(
                actor_type = %self.actor_type(),
                actor_id = %self.core.id,
                "activation failed: {e}"
            );

            self.core.state.clear();
            self.core.timers.clear();
            self.lifecycle = Lifecycle::Gone;

            return Err(ActorError::Activation {
                actor_id: self.core.id.clone(),
                source: Box::new(e),
            });
        }

        self.lifecycle = Lifecycle::Idle;

        info!(
            actor_type = %self.actor_type(),
            actor_id = %self.core.id,
            "Activated"
        );

        Ok(())
    }

    async fn run_activation(&mut self) -> Result<(), ActorError> {
        self.behavior
            .on_activate(Context::new(&mut self.core))
            .await
            .map_err(|source| ActorError::Hook {
                hook: "on_activate",
                source,
            })?;

        self.core.state.save().await?;

        Ok(())
    }

    /// Mark a call as started and run `on_pre_actor_method`.
    ///
    /// If the hook fails the call never starts: pending state is dropped and the instance
    /// is back to `Idle`.
    pub async fn begin_call(&mut self, method: &ActorMethodContext) -> Result<(), ActorError> {
        match self.lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::InCall => return Err(self.violation("a call is already in flight")),
            other => return Err(self.violation(format!("cannot begin a call while {other:?}"))),
        }

        if self
            .call_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.violation("a call is already in flight"));
        }

        self.lifecycle = Lifecycle::InCall;

        debug!(
            actor_id = %self.core.id,
            "begin {:?} {}",
            method.call_type(),
            method.method_name()
        );

        if let Err(source) = self
            .behavior
            .on_pre_actor_method(Context::new(&mut self.core), method)
            .await
        {
            self.core.state.clear();
            self.release_call();

            return Err(ActorError::Hook {
                hook: "on_pre_actor_method",
                source,
            });
        }

        Ok(())
    }

    /// Run `on_post_actor_method`, commit pending state and release the call.
    ///
    /// The call is released whatever happens. A failed commit leaves the changes pending
    /// in the cache; a failed hook drops them.
    pub async fn end_call(&mut self, method: &ActorMethodContext) -> Result<(), ActorError> {
        if self.lifecycle != Lifecycle::InCall {
            return Err(self.violation("cannot end a call that was not started"));
        }

        if let Err(source) = self
            .behavior
            .on_post_actor_method(Context::new(&mut self.core), method)
            .await
        {
            self.core.state.clear();
            self.release_call();

            return Err(ActorError::Hook {
                hook: "on_post_actor_method",
                source,
            });
        }

        let saved = self.core.state.save().await;
        self.release_call();

        if let Err(e) = saved {
            warn!(
                actor_id = %self.core.id,
                "commit after {} failed: {e}",
                method.method_name()
            );
            return Err(e.into());
        }

        debug!(actor_id = %self.core.id, "end {}", method.method_name());

        Ok(())
    }

    /// Abandon the call in flight, dropping every uncommitted change.
    ///
    /// `on_post_actor_method` does not run.
    pub fn rollback(&mut self) -> Result<(), ActorError> {
        if self
            .call_in_flight
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.violation("cannot reset state before starting call"));
        }

        self.core.state.clear();
        self.lifecycle = Lifecycle::Idle;

        debug!(actor_id = %self.core.id, "rolled back");

        Ok(())
    }

    /// Run one actor method end to end.
    pub async fn invoke(
        &mut self,
        method: &ActorMethodContext,
        payload: Bytes,
    ) -> Result<Bytes, ActorError> {
        self.begin_call(method).await?;

        let result = self
            .behavior
            .invoke(Context::new(&mut self.core), method.method_name(), payload)
            .await
            .map_err(|e| ActorError::from_method(method.method_name(), e));

        self.finish_call(method, result).await
    }

    /// Fire a registered timer, invoking its callback with the state it was registered with.
    pub async fn fire_timer(&mut self, name: &str) -> Result<Bytes, ActorError> {
        let Some(timer) = self.core.timers.get(name) else {
            return Err(ActorError::TimerNotFound(name.to_owned()));
        };

        let method = ActorMethodContext::timer(timer.callback());
        let state = timer.state().clone();

        self.invoke(&method, state).await
    }

    /// Deliver a reminder trigger, `payload` being the document the runtime stored.
    pub async fn receive_reminder(&mut self, name: &str, payload: &[u8]) -> Result<(), ActorError> {
        let params = ActorReminderParams::decode(payload)?;
        let method = ActorMethodContext::reminder(name);

        self.begin_call(&method).await?;

        let result = self
            .behavior
            .receive_reminder(Context::new(&mut self.core), name, &params)
            .await
            .map_err(|e| ActorError::from_method(name, e));

        self.finish_call(&method, result).await
    }

    /// Take the instance out of memory.
    ///
    /// Uncommitted state and timers are dropped without a save or remote
    /// unregistration. If `on_deactivate` fails the instance stays `Deactivating` and the
    /// call may be retried.
    pub async fn deactivate(&mut self) -> Result<(), ActorError> {
        if self.lifecycle == Lifecycle::Gone {
            return Err(self.violation("already deactivated"));
        }

        info!(
            actor_type = %self.actor_type(),
            actor_id = %self.core.id,
            "Deactivating ..."
        );

        self.lifecycle = Lifecycle::Deactivating;
        self.call_in_flight.store(false, Ordering::Release);
        self.core.state.clear();
        self.core.timers.clear();

        self.behavior
            .on_deactivate(Context::new(&mut self.core))
            .await
            .map_err(|source| ActorError::Hook {
                hook: "on_deactivate",
                source,
            })?;

        self.lifecycle = Lifecycle::Gone;

        info!(
            actor_type = %self.actor_type(),
            actor_id = %self.core.id,
            "Deactivated"
        );

        Ok(())
    }

    async fn finish_call<T>(
        &mut self,
        method: &ActorMethodContext,
        result: Result<T, ActorError>,
    ) -> Result<T, ActorError> {
        match (result, self.core.runtime.config().commit_policy) {
            (Ok(value), _) => {
                self.end_call(method).await?;
                Ok(value)
            }
            (Err(e), CommitPolicy::Always) => match self.end_call(method).await {
                Ok(()) => Err(e),
                Err(end) => {
                    warn!(
                        actor_id = %self.core.id,
                        "ending failed call {} also failed: {end}",
                        method.method_name()
                    );

                    Err(ActorError::Unfinished {
                        method: method.method_name().to_owned(),
                        body: Box::new(e),
                        source: Box::new(end),
                    })
                }
            },
            (Err(e), CommitPolicy::OnSuccess) => {
                self.rollback()?;
                Err(e)
            }
        }
    }

    fn release_call(&mut self) {
        self.call_in_flight.store(false, Ordering::Release);
        self.lifecycle = Lifecycle::Idle;
    }

    fn violation(&self, reason: impl Into<String>) -> ActorError {
        let reason = reason.into();
        warn!(actor_id = %self.core.id, "protocol violation: {reason}");

        ActorError::ProtocolViolation {
            actor_id: self.core.id.clone(),
            reason,
        }
    }
}

impl<B: ActorBehavior> fmt::Debug for ActorInstance<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInstance")
            .field("actor_type", &self.actor_type())
            .field("id", &self.core.id)
            .field("lifecycle", &self.lifecycle)
            .field("call_in_flight", &self.is_call_in_flight())
            .finish_non_exhaustive()
    }
}
