//! Metadata describing the call an actor instance is about to process.

use serde::{Deserialize, Serialize};

/// What triggered an actor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorCallType {
    /// A method invoked by a client through the actor's interface.
    ActorInterfaceMethod,
    /// A timer callback.
    TimerMethod,
    /// A reminder trigger.
    ReminderMethod,
}

/// Passed to the pre/post method hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMethodContext {
    method_name: String,
    interface_name: Option<String>,
    call_type: ActorCallType,
}

// Implementations

impl ActorMethodContext {
    pub fn method(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            interface_name: None,
            call_type: ActorCallType::ActorInterfaceMethod,
        }
    }

    pub fn timer(callback: impl Into<String>) -> Self {
        Self {
            method_name: callback.into(),
            interface_name: None,
            call_type: ActorCallType::TimerMethod,
        }
    }

    pub fn reminder(reminder_name: impl Into<String>) -> Self {
        Self {
            method_name: reminder_name.into(),
            interface_name: None,
            call_type: ActorCallType::ReminderMethod,
        }
    }

    pub fn with_interface(mut self, interface_name: impl Into<String>) -> Self {
        self.interface_name = Some(interface_name.into());
        self
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn interface_name(&self) -> Option<&str> {
        self.interface_name.as_deref()
    }

    pub fn call_type(&self) -> ActorCallType {
        self.call_type
    }
}
