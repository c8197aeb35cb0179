use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use vactor::prelude::*;

#[derive(Debug, Default)]
struct Counter;

#[derive(Debug, Serialize, Deserialize)]
struct Step {
    by: i64,
}

impl ActorBehavior for Counter {
    async fn on_activate(&mut self, mut ctx: Context<'_>) -> anyhow::Result<()> {
        if !ctx.state().contains("count").await? {
            ctx.state().set("count", &0i64)?;
        }

        ctx.register_timer(
            Some("autoIncrement"),
            "increment",
            &Step { by: 10 },
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .await?;

        Ok(())
    }

    async fn invoke(
        &mut self,
        mut ctx: Context<'_>,
        method: &str,
        payload: Bytes,
    ) -> anyhow::Result<Bytes> {
        match method {
            "increment" => {
                let step: Step = ctx.serializer().deserialize_value(&payload)?;
                let count: i64 = ctx.state().get("count").await?;
                ctx.state().set("count", &(count + step.by))?;

                Ok(ctx.serializer().serialize_value(&(count + step.by))?)
            }
            "get" => {
                let count: i64 = ctx.state().get("count").await?;
                Ok(ctx.serializer().serialize_value(&count)?)
            }
            _ => Err(ActorError::MethodNotFound(method.to_owned()).into()),
        }
    }
}

/// Minimal dispatch layer: one instance per id, calls serialized by a mutex.
struct Host {
    runtime: Arc<ActorRuntimeContext>,
    instances: Mutex<HashMap<ActorId, Arc<Mutex<ActorInstance<Counter>>>>>,
}

impl Host {
    async fn instance(&self, id: &ActorId) -> Result<Arc<Mutex<ActorInstance<Counter>>>, ActorError> {
        let mut instances = self.instances.lock().await;

        if let Some(inst) = instances.get(id) {
            return Ok(inst.clone());
        }

        let mut inst = ActorInstance::new(self.runtime.clone(), id.clone(), Counter);
        inst.activate().await?;

        let inst = Arc::new(Mutex::new(inst));
        instances.insert(id.clone(), inst.clone());

        Ok(inst)
    }

    async fn call(&self, id: &ActorId, method: &str, payload: Bytes) -> Result<Bytes, ActorError> {
        let inst = self.instance(id).await?;
        let mut inst = inst.lock().await;

        inst.invoke(&ActorMethodContext::method(method), payload).await
    }

    async fn fire(&self, id: &ActorId, timer: &str) -> Result<Bytes, ActorError> {
        let inst = self.instance(id).await?;
        let mut inst = inst.lock().await;

        inst.fire_timer(timer).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,vactor=debug")
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f %Z".into()))
        .init();

    let provider = Arc::new(MemoryStateProvider::new());
    let client = Arc::new(LoopbackActorClient::new());

    let runtime = ActorRuntimeContext::builder("Counter")
        .state_provider(provider.clone())
        .client(client.clone())
        .build()?;

    let host = Host {
        runtime,
        instances: Mutex::new(HashMap::new()),
    };

    let id = ActorId::new("counter-1");
    let step = serde_json::to_vec(&Step { by: 1 })?;

    info!("Sending 5 concurrent increments to {id}...");
    try_join_all((0..5).map(|_| host.call(&id, "increment", Bytes::from(step.clone())))).await?;

    info!("Firing the auto-increment timer...");
    host.fire(&id, "autoIncrement").await?;

    let count: i64 = serde_json::from_slice(&host.call(&id, "get", Bytes::new()).await?)?;
    info!("Count is {count}");

    info!(
        "Provider saw {} committed transactions, runtime holds timers {:?}",
        provider.committed_transactions().len(),
        client.timer_names("Counter", &id)
    );

    Ok(())
}
