use crate::actor::{Actor, ActorHandle, Addr, Reserved, spawn_actor_reserved, spawn_actor_with_shutdown};
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use std::any::Any;
use std::collections::HashMap;

/// Wires actors together, tracks their tasks and owns shutdown.
pub struct Builder {
    sys: ActorSystem,
    // typed addresses by name, for late wiring
    addrs: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            sys: ActorSystem::new(),
            addrs: HashMap::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Reserve an actor's mailbox and publish its `Addr` under `name`.
    ///
    /// Reserving first lets two actors hold each other's addresses before
    /// either starts.
    pub fn reserve<A: Actor>(&mut self, name: &str, mailbox: usize) -> Reserved<A> {
        let r = spawn_actor_reserved::<A>(name, mailbox);
        self.addrs.insert(name.to_string(), Box::new(r.addr()));
        r
    }

    /// Start a previously reserved actor and track its task.
    pub fn start_reserved<A: Actor>(&mut self, r: Reserved<A>, actor: A) -> &mut Self {
        let h = r.start_with_shutdown(actor, Some(self.sys.shutdown_notifier()));
        self.track_actor(h);
        self
    }

    /// Spawn an actor and publish its `Addr` under `name`.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use parlor_actors::actor::{Actor, Context};
    /// # use parlor_actors::builder::Builder;
    /// # struct Sink;
    /// # #[async_trait]
    /// # impl Actor for Sink {
    /// #     type Msg = ();
    /// #     async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> {
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let mut builder = Builder::new();
    ///     builder.spawn("sink", 4, Sink);
    ///     let addr = builder.addr::<Sink>("sink").unwrap();
    ///     addr.send(()).await.unwrap();
    ///     builder.graceful_shutdown().await.unwrap();
    /// });
    /// ```
    pub fn spawn<A: Actor>(&mut self, name: &str, mailbox: usize, actor: A) -> &mut Self {
        let h: ActorHandle<A> =
            spawn_actor_with_shutdown(actor, mailbox, Some(self.sys.shutdown_notifier()));
        self.addrs.insert(name.to_string(), Box::new(h.addr.clone()));
        self.track_actor(h);
        self
    }

    /// Track a non-actor task (input feeders, tickers) so shutdown waits for it.
    pub fn track(
        &mut self,
        fut: impl std::future::Future<Output = Result<()>> + Send + 'static,
    ) -> &mut Self {
        self.sys.track(fut);
        self
    }

    /// Get a typed address by name.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>> {
        self.addrs
            .get(name)
            .and_then(|b| b.downcast_ref::<Addr<A>>().cloned())
    }

    fn track_actor<A: Actor>(&mut self, h: ActorHandle<A>) {
        self.sys.track(async move {
            h.task.await??;
            Ok(())
        });
    }

    pub async fn graceful_shutdown(mut self) -> Result<()> {
        self.addrs.clear();
        self.sys.graceful_shutdown().await
    }

    /// Block until CTRL-C or an internal shutdown signal, then shut everything down.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let mut shutdown_rx = self.sys.shutdown_notifier();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target = "parlor-actors", "ctrl-c received");
            }
            _ = shutdown_rx.recv() => {}
        }
        self.graceful_shutdown().await
    }
}
