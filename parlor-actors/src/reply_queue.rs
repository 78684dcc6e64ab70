//! Serialises bot replies so exactly one is typed at a time.
//!
//! [`ReplyQueue`] is the synchronous state machine: entries wait in a deque,
//! at most one is active, and each [`ReplyQueue::tick`] reveals one more
//! character of the active entry. [`ReplyQueueActor`] drives it with
//! self-scheduled ticks and broadcasts a [`QueueEvent`] for every transition.

use crate::actor::{Actor, Context};
use crate::{QueueEntry, QueueEvent, ReplyQueueMsg};
use anyhow::Result;
use parlor_common::{ReplyOrdering, SameTargetPolicy};
use parlor_markup::{format_reply, Content, MarkupTree, Step, Typewriter, WeakContentHandle};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, trace};

struct Active {
    seq: u64,
    target: WeakContentHandle,
    writer: Typewriter,
}

pub struct ReplyQueue {
    waiting: VecDeque<QueueEntry>,
    active: Option<Active>,
    same_target: SameTargetPolicy,
    ordering: ReplyOrdering,
}

impl Default for ReplyQueue {
    fn default() -> Self {
        Self::new(SameTargetPolicy::default(), ReplyOrdering::default())
    }
}

impl ReplyQueue {
    pub fn new(same_target: SameTargetPolicy, ordering: ReplyOrdering) -> Self {
        Self {
            waiting: VecDeque::new(),
            active: None,
            same_target,
            ordering,
        }
    }

    /// Nothing active and nothing waiting.
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.waiting.is_empty()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn active_seq(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.seq)
    }

    /// Add an entry. Under [`SameTargetPolicy::Replace`] a reply for a target
    /// that already has one active or waiting supersedes it; with
    /// [`ReplyOrdering::Send`] a reply older than the one it would replace is
    /// dropped instead.
    pub fn enqueue(&mut self, entry: QueueEntry) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        let target = entry.target_id();

        if self.same_target == SameTargetPolicy::Replace {
            let active_seq = self
                .active
                .as_ref()
                .filter(|a| a.target.id() == target)
                .map(|a| a.seq);
            if let Some(old) = active_seq {
                if self.is_stale(entry.seq, old) {
                    events.push(QueueEvent::Replaced { target, seq: entry.seq });
                    return events;
                }
                debug!(%target, old, new = entry.seq, "replacing active reply");
                self.active = None;
                events.push(QueueEvent::Replaced { target, seq: old });
                self.waiting.push_front(entry);
                return events;
            }

            if let Some(pos) = self.waiting.iter().position(|e| e.target_id() == target) {
                let old = self.waiting[pos].seq;
                if self.is_stale(entry.seq, old) {
                    events.push(QueueEvent::Replaced { target, seq: entry.seq });
                    return events;
                }
                events.push(QueueEvent::Replaced { target, seq: old });
                match self.ordering {
                    ReplyOrdering::Arrival => {
                        self.waiting[pos] = entry;
                        return events;
                    }
                    ReplyOrdering::Send => {
                        self.waiting.remove(pos);
                    }
                }
            }
        }

        match self.ordering {
            ReplyOrdering::Arrival => self.waiting.push_back(entry),
            ReplyOrdering::Send => {
                let at = self.waiting.partition_point(|e| e.seq <= entry.seq);
                self.waiting.insert(at, entry);
            }
        }
        events
    }

    fn is_stale(&self, incoming: u64, existing: u64) -> bool {
        self.ordering == ReplyOrdering::Send && incoming < existing
    }

    /// Reveal one character, starting the next waiting entry if none is active.
    ///
    /// Entries whose target has been dropped are discarded here, both before
    /// they start and mid-animation.
    pub fn tick(&mut self) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        loop {
            if self.active.is_none() {
                let Some(entry) = self.waiting.pop_front() else {
                    return events;
                };
                let target = entry.target_id();
                let Some(handle) = entry.target.upgrade() else {
                    debug!(%target, seq = entry.seq, "discarding reply for detached target");
                    events.push(QueueEvent::Detached { target, seq: entry.seq });
                    continue;
                };
                let tree = format_reply(&entry.raw_reply);
                handle.set(Content::Markup(MarkupTree::default()));
                events.push(QueueEvent::Started { target, seq: entry.seq });
                self.active = Some(Active {
                    seq: entry.seq,
                    target: entry.target,
                    writer: Typewriter::new(tree),
                });
            }

            let Some(active) = self.active.as_mut() else {
                return events;
            };
            let target = active.target.id();
            let Some(handle) = active.target.upgrade() else {
                debug!(%target, seq = active.seq, "target dropped mid-animation");
                events.push(QueueEvent::Detached { target, seq: active.seq });
                self.active = None;
                continue;
            };
            match handle.with_markup(|out| active.writer.step(out)) {
                Step::Revealed(ch) => {
                    trace!(%target, ?ch, "revealed");
                    return events;
                }
                Step::Done => {
                    events.push(QueueEvent::Completed {
                        target,
                        seq: active.seq,
                        chars: active.writer.revealed(),
                    });
                    self.active = None;
                }
            }
        }
    }
}

/// Actor wrapper that paces [`ReplyQueue::tick`] at `interval` per character.
pub struct ReplyQueueActor {
    queue: ReplyQueue,
    interval: Duration,
    events: broadcast::Sender<QueueEvent>,
    tick_pending: bool,
}

impl ReplyQueueActor {
    pub fn new(queue: ReplyQueue, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            queue,
            interval,
            events,
            tick_pending: false,
        }
    }

    /// Event sender; call `subscribe()` on it before the actor starts.
    pub fn events(&self) -> broadcast::Sender<QueueEvent> {
        self.events.clone()
    }

    fn publish(&self, events: Vec<QueueEvent>) {
        for event in events {
            let _ = self.events.send(event);
        }
    }

    fn schedule(&mut self, ctx: &Context<Self>, delay: Duration) {
        if self.tick_pending {
            return;
        }
        self.tick_pending = true;
        ctx.notify_later(ReplyQueueMsg::Tick, delay);
    }
}

#[async_trait::async_trait]
impl Actor for ReplyQueueActor {
    type Msg = ReplyQueueMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            ReplyQueueMsg::Enqueue(entry) => {
                debug!(target_id = %entry.target_id(), seq = entry.seq, "reply enqueued");
                let events = self.queue.enqueue(entry);
                self.publish(events);
                self.schedule(ctx, Duration::ZERO);
            }
            ReplyQueueMsg::Tick => {
                self.tick_pending = false;
                let events = self.queue.tick();
                self.publish(events);
                if !self.queue.is_idle() {
                    self.schedule(ctx, self.interval);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_markup::ContentHandle;

    fn drain(queue: &mut ReplyQueue) -> Vec<QueueEvent> {
        let mut all = Vec::new();
        while !queue.is_idle() {
            all.extend(queue.tick());
        }
        all
    }

    fn completions(events: &[QueueEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                QueueEvent::Completed { seq, .. } => Some(*seq),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn entries_complete_in_arrival_order_one_at_a_time() {
        let mut queue = ReplyQueue::default();
        let handles: Vec<_> = (0..3).map(|_| ContentHandle::text("Thinking...")).collect();
        queue.enqueue(QueueEntry::new(&handles[0], "first", 0));
        queue.enqueue(QueueEntry::new(&handles[1], "**second**", 1));
        queue.enqueue(QueueEntry::new(&handles[2], "- third", 2));

        let mut events = Vec::new();
        while !queue.is_idle() {
            events.extend(queue.tick());
            let started = events.iter().filter(|e| matches!(e, QueueEvent::Started { .. })).count();
            let done = completions(&events).len();
            assert!(started - done <= 1, "more than one active entry");
        }
        assert_eq!(completions(&events), vec![0, 1, 2]);
        assert_eq!(handles[0].plain_text(), "first");
        assert_eq!(handles[1].plain_text(), "second");
        assert_eq!(handles[2].plain_text(), "third");
    }

    #[test]
    fn second_target_is_untouched_until_first_completes() {
        let mut queue = ReplyQueue::default();
        let a = ContentHandle::text("Thinking...");
        let b = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "abc", 0));
        queue.enqueue(QueueEntry::new(&b, "xyz", 1));
        for _ in 0..3 {
            queue.tick();
            assert_eq!(b.snapshot(), Content::Text("Thinking...".into()));
        }
        assert_eq!(a.plain_text(), "abc");
    }

    #[test]
    fn replace_restarts_active_target() {
        let mut queue = ReplyQueue::default();
        let a = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "old reply", 0));
        queue.tick();
        queue.tick();
        let events = queue.enqueue(QueueEntry::new(&a, "new", 1));
        assert_eq!(events, vec![QueueEvent::Replaced { target: a.id(), seq: 0 }]);
        let rest = drain(&mut queue);
        assert_eq!(completions(&rest), vec![1]);
        assert_eq!(a.plain_text(), "new");
    }

    #[test]
    fn replace_swaps_waiting_entry_in_place() {
        let mut queue = ReplyQueue::default();
        let a = ContentHandle::text("Thinking...");
        let b = ContentHandle::text("Thinking...");
        let c = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "a", 0));
        queue.enqueue(QueueEntry::new(&b, "b-old", 1));
        queue.enqueue(QueueEntry::new(&c, "c", 2));
        queue.enqueue(QueueEntry::new(&b, "b-new", 3));
        assert_eq!(queue.waiting(), 3);
        let events = drain(&mut queue);
        assert_eq!(completions(&events), vec![0, 3, 2]);
        assert_eq!(b.plain_text(), "b-new");
    }

    #[test]
    fn queue_policy_animates_both_replies() {
        let mut queue = ReplyQueue::new(SameTargetPolicy::Queue, ReplyOrdering::Arrival);
        let a = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "one", 0));
        queue.tick();
        assert!(queue.enqueue(QueueEntry::new(&a, "two", 1)).is_empty());
        let events = drain(&mut queue);
        assert_eq!(completions(&events), vec![0, 1]);
        assert_eq!(a.plain_text(), "two");
    }

    #[test]
    fn send_ordering_sorts_waiting_but_never_preempts() {
        let mut queue = ReplyQueue::new(SameTargetPolicy::Replace, ReplyOrdering::Send);
        let handles: Vec<_> = (0..4).map(|_| ContentHandle::text("Thinking...")).collect();
        queue.enqueue(QueueEntry::new(&handles[3], "three", 3));
        queue.tick();
        queue.enqueue(QueueEntry::new(&handles[2], "two", 2));
        queue.enqueue(QueueEntry::new(&handles[0], "zero", 0));
        queue.enqueue(QueueEntry::new(&handles[1], "one", 1));
        assert_eq!(queue.active_seq(), Some(3));
        let events = drain(&mut queue);
        assert_eq!(completions(&events), vec![3, 0, 1, 2]);
    }

    #[test]
    fn send_ordering_drops_stale_reply_for_same_target() {
        let mut queue = ReplyQueue::new(SameTargetPolicy::Replace, ReplyOrdering::Send);
        let a = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "newer", 5));
        let events = queue.enqueue(QueueEntry::new(&a, "older", 4));
        assert_eq!(events, vec![QueueEvent::Replaced { target: a.id(), seq: 4 }]);
        drain(&mut queue);
        assert_eq!(a.plain_text(), "newer");
    }

    #[test]
    fn detached_targets_are_discarded() {
        let mut queue = ReplyQueue::default();
        let a = ContentHandle::text("Thinking...");
        let b = ContentHandle::text("Thinking...");
        let a_id = a.id();
        let b_id = b.id();
        queue.enqueue(QueueEntry::new(&a, "abc", 0));
        queue.enqueue(QueueEntry::new(&b, "xyz", 1));
        queue.tick();
        drop(a);
        drop(b);
        let events = drain(&mut queue);
        assert_eq!(
            events,
            vec![
                QueueEvent::Detached { target: a_id, seq: 0 },
                QueueEvent::Detached { target: b_id, seq: 1 },
            ]
        );
    }

    #[test]
    fn empty_reply_completes_without_characters() {
        let mut queue = ReplyQueue::default();
        let a = ContentHandle::text("Thinking...");
        queue.enqueue(QueueEntry::new(&a, "", 0));
        let events = queue.tick();
        assert_eq!(
            events,
            vec![
                QueueEvent::Started { target: a.id(), seq: 0 },
                QueueEvent::Completed { target: a.id(), seq: 0, chars: 0 },
            ]
        );
        assert!(queue.is_idle());
        assert_eq!(a.plain_text(), "");
    }
}
