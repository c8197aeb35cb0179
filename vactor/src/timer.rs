//! Timers and reminders of a single actor instance.
//!
//! Timers live in the instance's [`TimerTable`] and die with it. Reminders are durable on
//! the runtime side, so nothing about them is kept here past registration.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::{
    actor::ActorId,
    duration::Interval,
    errors::{FormatError, SerializerError},
    remote::wire,
};

/// An in-memory scheduled self-invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorTimer {
    name: String,
    callback: String,
    state: Bytes,
    due_time: Interval,
    period: Interval,
}

/// Parameters of a durable reminder, as registered with and delivered by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorReminderParams {
    data: Option<Bytes>,
    due_time: Interval,
    period: Interval,
}

/// Registered timers of one instance, keyed by name.
#[derive(Debug)]
pub struct TimerTable {
    owner: ActorId,
    timers: FxHashMap<String, ActorTimer>,
    sequence: AtomicU64,
}

// Implementations

impl ActorTimer {
    pub fn new(
        name: impl Into<String>,
        callback: impl Into<String>,
        state: Bytes,
        due_time: Interval,
        period: Interval,
    ) -> Self {
        Self {
            name: name.into(),
            callback: callback.into(),
            state,
            due_time,
            period,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method invoked when the timer fires.
    pub fn callback(&self) -> &str {
        &self.callback
    }

    /// Serialized state handed to the callback.
    pub fn state(&self) -> &Bytes {
        &self.state
    }

    pub fn due_time(&self) -> Interval {
        self.due_time
    }

    pub fn period(&self) -> Interval {
        self.period
    }

    /// Wire payload sent to the runtime on registration.
    pub fn encode(&self) -> Result<Bytes, SerializerError> {
        wire::encode_timer(self)
    }

    /// Rebuild a timer from its registration payload.
    pub fn decode(name: impl Into<String>, payload: &[u8]) -> Result<Self, FormatError> {
        wire::decode_timer(name.into(), payload)
    }
}

impl ActorReminderParams {
    pub fn new(data: Option<Bytes>, due_time: Interval, period: Interval) -> Self {
        Self {
            data,
            due_time,
            period,
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn due_time(&self) -> Interval {
        self.due_time
    }

    pub fn period(&self) -> Interval {
        self.period
    }

    pub fn encode(&self) -> Result<Bytes, SerializerError> {
        wire::encode_reminder(self)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, FormatError> {
        wire::decode_reminder(payload)
    }
}

impl TimerTable {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            timers: FxHashMap::default(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Next generated name, `<actorId>_Timer_<n>`.
    ///
    /// The sequence only moves forward, so unregistering a timer never makes a later
    /// generated name collide with a live one. Names already taken explicitly are skipped.
    pub fn next_name(&self) -> String {
        loop {
            let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            let name = format!("{}_Timer_{n}", self.owner);

            if !self.timers.contains_key(&name) {
                return name;
            }
        }
    }

    /// Insert or overwrite a timer, returning the one it replaced.
    pub fn insert(&mut self, timer: ActorTimer) -> Option<ActorTimer> {
        self.timers.insert(timer.name.clone(), timer)
    }

    pub fn get(&self, name: &str) -> Option<&ActorTimer> {
        self.timers.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ActorTimer> {
        self.timers.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Sorted timer names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.timers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every timer without unregistering it remotely.
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
