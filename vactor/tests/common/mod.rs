#![allow(dead_code)]

use std::sync::{Arc, Once};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use vactor::prelude::*;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,vactor=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub const ACTOR_TYPE: &str = "DemoActor";

pub struct Harness {
    pub provider: Arc<MemoryStateProvider>,
    pub client: Arc<LoopbackActorClient>,
    pub runtime: Arc<ActorRuntimeContext>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(CommitPolicy::Always)
    }

    pub fn with_policy(policy: CommitPolicy) -> Self {
        init_tracing();

        let provider = Arc::new(MemoryStateProvider::new());
        let client = Arc::new(LoopbackActorClient::new());
        let runtime = ActorRuntimeContext::builder(ACTOR_TYPE)
            .state_provider(provider.clone())
            .client(client.clone())
            .commit_policy(policy)
            .build()
            .unwrap();

        Self {
            provider,
            client,
            runtime,
        }
    }

    pub fn instance(&self, id: &str) -> ActorInstance<DemoActor> {
        ActorInstance::new(self.runtime.clone(), id, DemoActor::default())
    }

    pub async fn active(&self, id: &str) -> ActorInstance<DemoActor> {
        let mut inst = self.instance(id);
        inst.activate().await.unwrap();
        inst
    }

    /// Committed value of a key, decoded as JSON.
    pub fn stored<T: for<'de> Deserialize<'de>>(&self, id: &str, key: &str) -> Option<T> {
        self.provider
            .value(ACTOR_TYPE, &ActorId::new(id), key)
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}

/// Hooks to fail on purpose.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailPoints {
    pub activate: bool,
    pub pre: bool,
    pub post: bool,
    pub deactivate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub step: i64,
}

#[derive(Debug, Default)]
pub struct DemoActor {
    pub events: Vec<String>,
    pub fail: FailPoints,
}

impl ActorBehavior for DemoActor {
    async fn on_activate(&mut self, mut ctx: Context<'_>) -> anyhow::Result<()> {
        self.events.push("activate".into());

        if self.fail.activate {
            return Err(anyhow!("activation refused"));
        }

        if !ctx.state().contains("created").await? {
            ctx.state().set("created", &true)?;
        }

        Ok(())
    }

    async fn on_deactivate(&mut self, _ctx: Context<'_>) -> anyhow::Result<()> {
        self.events.push("deactivate".into());

        if self.fail.deactivate {
            return Err(anyhow!("deactivation refused"));
        }

        Ok(())
    }

    async fn on_pre_actor_method(
        &mut self,
        _ctx: Context<'_>,
        method: &ActorMethodContext,
    ) -> anyhow::Result<()> {
        self.events.push(format!("pre:{}", method.method_name()));

        if self.fail.pre {
            return Err(anyhow!("pre hook refused"));
        }

        Ok(())
    }

    async fn on_post_actor_method(
        &mut self,
        _ctx: Context<'_>,
        method: &ActorMethodContext,
    ) -> anyhow::Result<()> {
        self.events.push(format!("post:{}", method.method_name()));

        if self.fail.post {
            return Err(anyhow!("post hook refused"));
        }

        Ok(())
    }

    async fn invoke(
        &mut self,
        mut ctx: Context<'_>,
        method: &str,
        payload: Bytes,
    ) -> anyhow::Result<Bytes> {
        match method {
            "doWork" => {
                let counter: i64 = ctx.state().try_get("counter").await?.unwrap_or(0);
                ctx.state().set("counter", &(counter + 1))?;

                Ok(ctx.serializer().serialize_value(&(counter + 1))?)
            }
            "failAfterWrite" => {
                ctx.state().set("counter", &99i64)?;

                Err(anyhow!("failed after write"))
            }
            "startTimer" => {
                let tick: Tick = if payload.is_empty() {
                    Tick { step: 1 }
                } else {
                    ctx.serializer().deserialize_value(&payload)?
                };

                let name = ctx
                    .register_timer(
                        None,
                        "onTick",
                        &tick,
                        Interval::IMMEDIATE,
                        Interval::from_secs(10),
                    )
                    .await?;

                Ok(ctx.serializer().serialize_value(&name)?)
            }
            "onTick" => {
                let tick: Tick = ctx.serializer().deserialize_value(&payload)?;
                let ticks: i64 = ctx.state().try_get("ticks").await?.unwrap_or(0);
                ctx.state().set("ticks", &(ticks + tick.step))?;

                Ok(Bytes::new())
            }
            "remind" => {
                ctx.register_reminder(
                    "wake",
                    &Tick { step: 1 },
                    Interval::from_secs(5),
                    Interval::Disabled,
                )
                .await?;

                Ok(Bytes::new())
            }
            _ => Err(ActorError::MethodNotFound(method.to_owned()).into()),
        }
    }

    async fn receive_reminder(
        &mut self,
        mut ctx: Context<'_>,
        name: &str,
        params: &ActorReminderParams,
    ) -> anyhow::Result<()> {
        ctx.state().set("lastReminder", &name)?;

        if let Some(data) = params.data() {
            let tick: Tick = ctx.serializer().deserialize_value(data)?;
            ctx.state().set("reminderStep", &tick.step)?;
        }

        Ok(())
    }
}
