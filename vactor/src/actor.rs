use std::{fmt, future::Future};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    context::Context, errors::ActorError, message::ActorMethodContext,
    timer::ActorReminderParams,
};

/// Identity of a virtual actor within its type.
///
/// Opaque and immutable; two ids are equal when their strings are equal. The id is the
/// partition key of the actor's state, timers and reminders.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

/// User-supplied behavior of one actor type.
///
/// Every hook has a no-op default. Hooks run to completion before the lifecycle engine
/// moves on; an error aborts the current transition and is surfaced to the caller
/// without retry.
///
/// # Example
///
/// ```
/// use vactor::prelude::*;
///
/// struct Counter;
///
/// impl ActorBehavior for Counter {
///     async fn on_activate(&mut self, mut ctx: Context<'_>) -> anyhow::Result<()> {
///         if !ctx.state().contains("count").await? {
///             ctx.state().set("count", &0i64)?;
///         }
///         Ok(())
///     }
///
///     async fn invoke(
///         &mut self,
///         mut ctx: Context<'_>,
///         method: &str,
///         _payload: Bytes,
///     ) -> anyhow::Result<Bytes> {
///         match method {
///             "increment" => {
///                 let count: i64 = ctx.state().get("count").await?;
///                 ctx.state().set("count", &(count + 1))?;
///                 Ok(ctx.serializer().serialize_value(&(count + 1))?)
///             }
///             _ => Err(ActorError::MethodNotFound(method.to_owned()).into()),
///         }
///     }
/// }
/// ```
pub trait ActorBehavior: Sized + Send + 'static {
    /// Called once the instance has been created, before any method is accepted.
    ///
    /// State written here is committed as part of activation.
    #[allow(unused_variables)]
    fn on_activate(&mut self, ctx: Context<'_>) -> impl Future<Output = anyhow::Result<()>> + Send {
        __default_on_activate(self, ctx)
    }

    /// Called when the instance leaves memory. Uncommitted state is already dropped.
    #[allow(unused_variables)]
    fn on_deactivate(
        &mut self,
        ctx: Context<'_>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        __default_on_deactivate(self, ctx)
    }

    #[allow(unused_variables)]
    fn on_pre_actor_method(
        &mut self,
        ctx: Context<'_>,
        method: &ActorMethodContext,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        __default_on_pre_actor_method(self, ctx, method)
    }

    /// Called after the method body, right before state is committed.
    #[allow(unused_variables)]
    fn on_post_actor_method(
        &mut self,
        ctx: Context<'_>,
        method: &ActorMethodContext,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        __default_on_post_actor_method(self, ctx, method)
    }

    /// Execute an actor method, or a timer callback, by name.
    ///
    /// The default knows no methods and fails with [`ActorError::MethodNotFound`].
    #[allow(unused_variables)]
    fn invoke(
        &mut self,
        ctx: Context<'_>,
        method: &str,
        payload: Bytes,
    ) -> impl Future<Output = anyhow::Result<Bytes>> + Send {
        __default_invoke(self, ctx, method, payload)
    }

    /// Handle a reminder trigger delivered by the runtime.
    #[allow(unused_variables)]
    fn receive_reminder(
        &mut self,
        ctx: Context<'_>,
        name: &str,
        params: &ActorReminderParams,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        __default_receive_reminder(self, ctx, name, params)
    }
}

// Delegated default implementations

pub async fn __default_on_activate<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
) -> anyhow::Result<()> {
    Ok(())
}

pub async fn __default_on_deactivate<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
) -> anyhow::Result<()> {
    Ok(())
}

pub async fn __default_on_pre_actor_method<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
    _method: &ActorMethodContext,
) -> anyhow::Result<()> {
    Ok(())
}

pub async fn __default_on_post_actor_method<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
    _method: &ActorMethodContext,
) -> anyhow::Result<()> {
    Ok(())
}

pub async fn __default_invoke<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
    method: &str,
    _payload: Bytes,
) -> anyhow::Result<Bytes> {
    Err(ActorError::MethodNotFound(method.to_owned()).into())
}

pub async fn __default_receive_reminder<B: ActorBehavior>(
    _behavior: &mut B,
    _ctx: Context<'_>,
    _name: &str,
    _params: &ActorReminderParams,
) -> anyhow::Result<()> {
    Ok(())
}

// Implementations

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh id backed by a random v4 UUID.
    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({:?})", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
