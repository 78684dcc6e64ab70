use anyhow::Result;
use std::time::Duration;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// A unit of sequential state driven by its mailbox.
///
/// Handlers run one at a time; an `Err` ends the actor.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Per-actor state handed to every [`Actor::handle`] call.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stopping: bool,
}

impl<A: Actor> Context<A> {
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Leave the loop once the current message is handled.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use parlor_actors::actor::{self, Actor, Context};
    /// struct Inbox(Vec<String>);
    ///
    /// #[async_trait]
    /// impl Actor for Inbox {
    ///     type Msg = String;
    ///     async fn handle(&mut self, line: String, ctx: &mut Context<Self>) -> Result<()> {
    ///         if line == "/quit" {
    ///             ctx.stop();
    ///         } else {
    ///             self.0.push(line);
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let handle = actor::spawn_actor(Inbox(Vec::new()), 4);
    ///     handle.addr.send("hello".into()).await.unwrap();
    ///     handle.addr.send("/quit".into()).await.unwrap();
    ///     handle.task.await.unwrap().unwrap();
    /// });
    /// ```
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    /// Post `msg` back to this actor once `delay` has elapsed.
    ///
    /// The handler returns immediately; a zero delay still goes through the mailbox.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use std::time::Duration;
    /// # use parlor_actors::actor::{self, Actor, Context};
    /// struct Blink {
    ///     left: u8,
    /// }
    ///
    /// #[async_trait]
    /// impl Actor for Blink {
    ///     type Msg = ();
    ///     async fn handle(&mut self, _: (), ctx: &mut Context<Self>) -> Result<()> {
    ///         match self.left.checked_sub(1) {
    ///             Some(left) => {
    ///                 self.left = left;
    ///                 ctx.notify_later((), Duration::from_millis(1));
    ///             }
    ///             None => ctx.stop(),
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let handle = actor::spawn_actor(Blink { left: 3 }, 1);
    ///     handle.addr.send(()).await.unwrap();
    ///     drop(handle.addr);
    ///     handle.task.await.unwrap().unwrap();
    /// });
    /// ```
    pub fn notify_later(&self, msg: A::Msg, delay: Duration) {
        let addr = self.addr();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if addr.send(msg).await.is_err() {
                tracing::debug!(target = "parlor-actors", "mailbox closed before delayed message");
            }
        });
    }
}

/// Sending half of an actor's bounded mailbox.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

// Derive would demand `A: Clone`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Waits for mailbox space. A closed mailbox hands the message back.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Non-blocking send; a full or closed mailbox hands the message back.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use parlor_actors::actor::{self, Actor, Context};
    /// # struct Sink;
    /// # #[async_trait]
    /// # impl Actor for Sink {
    /// #     type Msg = u64;
    /// #     async fn handle(&mut self, _seq: u64, ctx: &mut Context<Self>) -> Result<()> {
    /// #         ctx.stop();
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let handle = actor::spawn_actor(Sink, 1);
    ///     assert!(handle.addr.try_send(0).is_ok());
    ///     handle.task.await.unwrap().unwrap();
    ///     assert_eq!(handle.addr.try_send(1), Err(1));
    ///     assert!(handle.addr.is_closed());
    /// });
    /// ```
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<Result<()>>,
}

/// Start `actor` on its own task with a mailbox of `capacity`.
///
/// The loop ends when a handler fails, when the actor calls [`Context::stop`],
/// or when every [`Addr`] has been dropped.
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but also ends on the first broadcast from `shutdown`.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    spawn_actor_reserved::<A>(std::any::type_name::<A>(), capacity)
        .start_with_shutdown(actor, shutdown)
}

async fn run<A: Actor>(
    mut actor: A,
    mut inbox: mpsc::Receiver<A::Msg>,
    addr: Addr<A>,
    name: String,
    mut shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    let mut ctx = Context {
        addr,
        stopping: false,
    };
    while !ctx.stopping {
        let next = match shutdown.as_mut() {
            Some(signal) => tokio::select! {
                _ = signal.recv() => None,
                msg = inbox.recv() => msg,
            },
            None => inbox.recv().await,
        };
        let Some(msg) = next else { break };
        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(target = "parlor-actors", actor = %name, error = ?e, "handler failed; actor stopping");
            return Err(e);
        }
    }
    tracing::debug!(target = "parlor-actors", actor = %name, "actor stopped");
    Ok(())
}

/// A mailbox whose actor has not been started yet.
///
/// Lets actors that reference each other exchange addresses before any of them runs.
pub struct Reserved<A: Actor> {
    name: String,
    addr: Addr<A>,
    inbox: mpsc::Receiver<A::Msg>,
}

impl<A: Actor> Reserved<A> {
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    pub fn start(self, actor: A) -> ActorHandle<A> {
        self.start_with_shutdown(actor, None)
    }

    pub fn start_with_shutdown(
        self,
        actor: A,
        shutdown: Option<broadcast::Receiver<()>>,
    ) -> ActorHandle<A> {
        let Reserved { name, addr, inbox } = self;
        let task = tokio::spawn(run(actor, inbox, addr.clone(), name, shutdown));
        ActorHandle { addr, task }
    }
}

/// Open a named mailbox now and start its actor later.
///
/// Messages sent in between are buffered, up to `capacity`.
///
/// ```
/// # use anyhow::Result;
/// # use async_trait::async_trait;
/// # use parlor_actors::actor::{self, Actor, Context};
/// struct Greeter(Vec<String>);
///
/// #[async_trait]
/// impl Actor for Greeter {
///     type Msg = String;
///     async fn handle(&mut self, name: String, ctx: &mut Context<Self>) -> Result<()> {
///         self.0.push(format!("hello {name}"));
///         ctx.stop();
///         Ok(())
///     }
/// }
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let reserved = actor::spawn_actor_reserved::<Greeter>("greeter", 2);
///     reserved.addr().send("early".into()).await.unwrap();
///     let handle = reserved.start(Greeter(Vec::new()));
///     handle.task.await.unwrap().unwrap();
/// });
/// ```
pub fn spawn_actor_reserved<A: Actor>(name: impl Into<String>, capacity: usize) -> Reserved<A> {
    let (tx, inbox) = mpsc::channel::<A::Msg>(capacity);
    Reserved {
        name: name.into(),
        addr: Addr(tx),
        inbox,
    }
}
