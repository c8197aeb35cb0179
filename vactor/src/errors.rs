//! Error taxonomy of the actor runtime.
//!
//! Every fallible operation returns one of the typed errors below. Nothing is retried or
//! swallowed internally; retry policy belongs to the transport behind the collaborators.

use thiserror::Error;

use crate::actor::ActorId;

/// Failure reported by a durable state provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// Failure reported by the remote actor-operations client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ClientError(pub String);

/// Failure while turning values into bytes or back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SerializerError(pub String);

/// A wire string or payload that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed input {input:?}: {reason}")]
pub struct FormatError {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state key not found: {0}")]
    NotFound(String),

    #[error("state key already exists: {0}")]
    AlreadyExists(String),

    #[error("state provider lookup failed: {0}")]
    Provider(#[source] ProviderError),

    /// The durable store rejected the transaction. Pending changes are kept.
    #[error("state commit failed: {0}")]
    Commit(#[source] ProviderError),

    #[error(transparent)]
    Serializer(#[from] SerializerError),
}

#[derive(Debug, Error)]
pub enum ActorError {
    /// The dispatch layer broke the lifecycle protocol, e.g. overlapping calls.
    #[error("protocol violation on actor {actor_id}: {reason}")]
    ProtocolViolation { actor_id: ActorId, reason: String },

    #[error("activation of actor {actor_id} failed")]
    Activation {
        actor_id: ActorId,
        #[source]
        source: Box<ActorError>,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("registration of {name:?} failed")]
    Registration {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Serializer(#[from] SerializerError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("timer not found: {0}")]
    TimerNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("{hook} failed")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("method {method} failed")]
    Method {
        method: String,
        #[source]
        source: anyhow::Error,
    },

    /// The call body failed and ending the call failed too.
    ///
    /// `source` is the `end_call` error; when it is a commit failure the call's writes are
    /// still pending in the cache.
    #[error("call {method} failed ({body}) and could not be ended")]
    Unfinished {
        method: String,
        body: Box<ActorError>,
        #[source]
        source: Box<ActorError>,
    },
}

// Implementations

impl ProviderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl ClientError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl SerializerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<erased_serde::Error> for SerializerError {
    fn from(e: erased_serde::Error) -> Self {
        Self(e.to_string())
    }
}

impl FormatError {
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl ActorError {
    /// Whether this error is a durable-store commit failure, wherever it surfaced.
    pub fn is_commit(&self) -> bool {
        match self {
            ActorError::State(StateError::Commit(_)) => true,
            ActorError::Activation { source, .. } | ActorError::Unfinished { source, .. } => {
                source.is_commit()
            }
            _ => false,
        }
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ActorError::ProtocolViolation { .. })
    }

    /// Wrap an error coming out of user method code.
    ///
    /// Errors that already are [`ActorError`]s (e.g. `MethodNotFound` from the default
    /// dispatcher) are surfaced unchanged.
    pub(crate) fn from_method(method: &str, err: anyhow::Error) -> Self {
        match err.downcast::<ActorError>() {
            Ok(e) => e,
            Err(source) => ActorError::Method {
                method: method.to_owned(),
                source,
            },
        }
    }
}
