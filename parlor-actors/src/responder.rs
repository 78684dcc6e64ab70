use crate::actor::{Actor, Addr, Context};
use crate::reply_queue::ReplyQueueActor;
use crate::{FetchCmd, QueueEntry, ReplyQueueMsg};
use anyhow::Result;
use parlor_http::reply::ReplyFetcher;
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches replies off the actor loop and hands them to the reply queue.
///
/// Each command runs in its own task, so a slow endpoint never blocks later
/// commands; ordering between replies is the queue's concern.
pub struct ResponderActor {
    fetcher: Arc<dyn ReplyFetcher>,
    queue: Addr<ReplyQueueActor>,
}

impl ResponderActor {
    pub fn new(fetcher: Arc<dyn ReplyFetcher>, queue: Addr<ReplyQueueActor>) -> Self {
        Self { fetcher, queue }
    }
}

#[async_trait::async_trait]
impl Actor for ResponderActor {
    type Msg = FetchCmd;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let FetchCmd {
            user_text,
            target,
            seq,
            done,
        } = msg;
        let fetcher = Arc::clone(&self.fetcher);
        let queue = self.queue.clone();

        tokio::spawn(async move {
            let reply = fetcher.fetch(&user_text).await;
            info!(seq, reply_chars = reply.chars().count(), "reply received");
            let entry = QueueEntry::new(&target, reply, seq);
            drop(target);
            if queue.send(ReplyQueueMsg::Enqueue(entry)).await.is_err() {
                warn!(seq, "reply queue mailbox closed; reply dropped");
            }
            if let Some(done) = done {
                let _ = done.send(());
            }
        });
        Ok(())
    }
}
