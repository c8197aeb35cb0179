//! In-process [`ActorClient`] that records what it is asked to do.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::{
    actor::ActorId,
    base::lock,
    errors::{ClientError, FormatError},
    remote::client::ActorClient,
    timer::{ActorReminderParams, ActorTimer},
    trace,
};

type Registration = (String, ActorId, String);

/// A call as it reached the client, failed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    RegisterTimer {
        actor_type: String,
        actor_id: ActorId,
        name: String,
        payload: Bytes,
    },
    UnregisterTimer {
        actor_type: String,
        actor_id: ActorId,
        name: String,
    },
    RegisterReminder {
        actor_type: String,
        actor_id: ActorId,
        name: String,
        payload: Bytes,
    },
    UnregisterReminder {
        actor_type: String,
        actor_id: ActorId,
        name: String,
    },
}

/// Client standing in for the runtime's actor-operations endpoint.
///
/// Registrations are kept in memory so they can be inspected, and failures can be
/// injected with [`fail_next_calls`](Self::fail_next_calls).
#[derive(Debug, Default)]
pub struct LoopbackActorClient {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<ClientCall>,
    timers: FxHashMap<Registration, Bytes>,
    reminders: FxHashMap<Registration, Bytes>,
    failing_calls: usize,
}

// Implementations

impl LoopbackActorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in arrival order.
    pub fn calls(&self) -> Vec<ClientCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn timer_payload(&self, actor_type: &str, actor_id: &ActorId, name: &str) -> Option<Bytes> {
        lock(&self.inner)
            .timers
            .get(&registration(actor_type, actor_id, name))
            .cloned()
    }

    /// Decoded registration of a timer, if currently registered.
    pub fn timer(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Option<Result<ActorTimer, FormatError>> {
        self.timer_payload(actor_type, actor_id, name)
            .map(|payload| ActorTimer::decode(name, &payload))
    }

    pub fn reminder(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Option<Result<ActorReminderParams, FormatError>> {
        lock(&self.inner)
            .reminders
            .get(&registration(actor_type, actor_id, name))
            .map(|payload| ActorReminderParams::decode(payload))
    }

    /// Sorted names of the timers registered for one actor.
    pub fn timer_names(&self, actor_type: &str, actor_id: &ActorId) -> Vec<String> {
        let inner = lock(&self.inner);
        let mut names: Vec<_> = inner
            .timers
            .keys()
            .filter(|(t, id, _)| t == actor_type && id == actor_id)
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn reminder_count(&self) -> usize {
        lock(&self.inner).reminders.len()
    }

    pub fn fail_next_calls(&self, count: usize) {
        lock(&self.inner).failing_calls = count;
    }

    fn record(&self, call: ClientCall) -> Result<(), ClientError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(call.clone());

        if inner.failing_calls > 0 {
            inner.failing_calls -= 1;
            return Err(ClientError::new(format!("injected failure for {call:?}")));
        }

        match call {
            ClientCall::RegisterTimer {
                actor_type,
                actor_id,
                name,
                payload,
            } => {
                inner.timers.insert((actor_type, actor_id, name), payload);
            }
            ClientCall::UnregisterTimer {
                actor_type,
                actor_id,
                name,
            } => {
                inner.timers.remove(&(actor_type, actor_id, name));
            }
            ClientCall::RegisterReminder {
                actor_type,
                actor_id,
                name,
                payload,
            } => {
                inner.reminders.insert((actor_type, actor_id, name), payload);
            }
            ClientCall::UnregisterReminder {
                actor_type,
                actor_id,
                name,
            } => {
                inner.reminders.remove(&(actor_type, actor_id, name));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ActorClient for LoopbackActorClient {
    async fn register_timer(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
        payload: Bytes,
    ) -> Result<(), ClientError> {
        trace!("register timer {name} for {actor_type}/{actor_id}");
        self.record(ClientCall::RegisterTimer {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.clone(),
            name: name.to_owned(),
            payload,
        })
    }

    async fn unregister_timer(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Result<(), ClientError> {
        trace!("unregister timer {name} for {actor_type}/{actor_id}");
        self.record(ClientCall::UnregisterTimer {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.clone(),
            name: name.to_owned(),
        })
    }

    async fn register_reminder(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
        payload: Bytes,
    ) -> Result<(), ClientError> {
        trace!("register reminder {name} for {actor_type}/{actor_id}");
        self.record(ClientCall::RegisterReminder {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.clone(),
            name: name.to_owned(),
            payload,
        })
    }

    async fn unregister_reminder(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Result<(), ClientError> {
        trace!("unregister reminder {name} for {actor_type}/{actor_id}");
        self.record(ClientCall::UnregisterReminder {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.clone(),
            name: name.to_owned(),
        })
    }
}

fn registration(actor_type: &str, actor_id: &ActorId, name: &str) -> Registration {
    (actor_type.to_owned(), actor_id.clone(), name.to_owned())
}
