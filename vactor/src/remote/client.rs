use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{actor::ActorId, errors::ClientError};

/// Remote actor-operations endpoint of the hosting runtime.
///
/// Timer and reminder payloads are the JSON documents produced by
/// [`ActorTimer::encode`](crate::timer::ActorTimer::encode) and
/// [`ActorReminderParams::encode`](crate::timer::ActorReminderParams::encode).
/// Retries, if any, belong to the implementation.
#[async_trait]
pub trait ActorClient: Debug + Send + Sync {
    async fn register_timer(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
        payload: Bytes,
    ) -> Result<(), ClientError>;

    async fn unregister_timer(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Result<(), ClientError>;

    async fn register_reminder(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
        payload: Bytes,
    ) -> Result<(), ClientError>;

    async fn unregister_reminder(
        &self,
        actor_type: &str,
        actor_id: &ActorId,
        name: &str,
    ) -> Result<(), ClientError>;
}
