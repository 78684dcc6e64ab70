pub mod actor;
pub mod builder;
pub mod reply_queue;
pub mod responder;
pub mod system;

use parlor_markup::{ContentHandle, WeakContentHandle};
use tokio::sync::oneshot;
use uuid::Uuid;

/// A fetched reply waiting to be typed into its target.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub target: WeakContentHandle,
    pub raw_reply: String,
    /// Send-time sequence number of the user message this answers.
    pub seq: u64,
}

impl QueueEntry {
    pub fn new(target: &ContentHandle, raw_reply: impl Into<String>, seq: u64) -> Self {
        Self {
            target: target.downgrade(),
            raw_reply: raw_reply.into(),
            seq,
        }
    }

    pub fn target_id(&self) -> Uuid {
        self.target.id()
    }
}

#[derive(Debug)]
pub enum ReplyQueueMsg {
    Enqueue(QueueEntry),
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Started { target: Uuid, seq: u64 },
    Completed { target: Uuid, seq: u64, chars: usize },
    /// The reply `seq` was superseded by a newer one for the same target.
    Replaced { target: Uuid, seq: u64 },
    /// The target was dropped before the reply `seq` could finish.
    Detached { target: Uuid, seq: u64 },
}

impl QueueEvent {
    pub fn seq(&self) -> u64 {
        match self {
            QueueEvent::Started { seq, .. }
            | QueueEvent::Completed { seq, .. }
            | QueueEvent::Replaced { seq, .. }
            | QueueEvent::Detached { seq, .. } => *seq,
        }
    }
}

/// Ask the responder for a reply to `user_text`, to be typed into `target`.
#[derive(Debug)]
pub struct FetchCmd {
    pub user_text: String,
    pub target: ContentHandle,
    pub seq: u64,
    /// Fires once the reply has been handed to the queue.
    pub done: Option<oneshot::Sender<()>>,
}
