//! Character-by-character reveal of a markup tree.
//!
//! [`Typewriter`] walks the source tree depth first with an explicit frame
//! stack. Each call to [`Typewriter::step`] creates any elements and empty
//! text spans it passes, then appends exactly one character to the output.
//! Callers decide how long to wait between steps; [`animate`] is the simple
//! sleep-driven loop.

use crate::surface::{Content, ContentHandle};
use crate::tree::{MarkupNode, MarkupTree};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_CHAR_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Revealed(char),
    Done,
}

/// Cursor over a source tree.
///
/// `frames[d]` is the index of the next child to visit at depth `d`. The
/// element being filled at depth `d` is therefore `frames[..d]` with each
/// entry minus one. Output nodes are created in source order, so the same
/// index path addresses the mirrored node in the output tree.
#[derive(Debug, Clone)]
pub struct Typewriter {
    source: MarkupTree,
    frames: Vec<usize>,
    // byte offset into the text node under the cursor
    text_offset: Option<usize>,
    revealed: usize,
}

impl Typewriter {
    pub fn new(source: MarkupTree) -> Self {
        Self {
            source,
            frames: vec![0],
            text_offset: None,
            revealed: 0,
        }
    }

    pub fn source(&self) -> &MarkupTree {
        &self.source
    }

    /// Characters revealed so far.
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty() && self.text_offset.is_none()
    }

    /// Reveal the next character into `out`, which must start empty and
    /// must only be written by this typewriter.
    ///
    /// ```
    /// use parlor_markup::{format_reply, MarkupTree, Step, Typewriter};
    ///
    /// let source = format_reply("**hi**");
    /// let mut writer = Typewriter::new(source.clone());
    /// let mut out = MarkupTree::default();
    /// assert_eq!(writer.step(&mut out), Step::Revealed('h'));
    /// assert_eq!(out.text_content(), "h");
    /// assert_eq!(writer.step(&mut out), Step::Revealed('i'));
    /// assert_eq!(writer.step(&mut out), Step::Done);
    /// assert_eq!(out, source);
    /// ```
    pub fn step(&mut self, out: &mut MarkupTree) -> Step {
        loop {
            if let Some(offset) = self.text_offset {
                let path = self.cursor_path();
                let next = match node_at(&self.source.nodes, &path) {
                    Some(MarkupNode::Text(text)) => text[offset..].chars().next(),
                    _ => None,
                };
                match next {
                    Some(ch) => {
                        if let Some(MarkupNode::Text(span)) = node_at_mut(&mut out.nodes, &path) {
                            span.push(ch);
                        }
                        self.text_offset = Some(offset + ch.len_utf8());
                        self.revealed += 1;
                        return Step::Revealed(ch);
                    }
                    None => {
                        self.text_offset = None;
                        continue;
                    }
                }
            }

            let Some(&next) = self.frames.last() else {
                return Step::Done;
            };
            let depth = self.frames.len() - 1;
            let parent: Vec<usize> = self.frames[..depth].iter().map(|n| n - 1).collect();
            let siblings = children_at(&self.source.nodes, &parent);
            let Some(node) = siblings.get(next) else {
                self.frames.pop();
                continue;
            };

            if let Some(last) = self.frames.last_mut() {
                *last += 1;
            }
            if let Some(target) = children_at_mut(&mut out.nodes, &parent) {
                target.push(node.hollow());
            }
            match node {
                MarkupNode::Text(_) => self.text_offset = Some(0),
                MarkupNode::Element { .. } => self.frames.push(0),
            }
        }
    }

    /// Reveal everything that is left without pausing.
    pub fn finish(&mut self, out: &mut MarkupTree) {
        while self.step(out) != Step::Done {}
    }

    fn cursor_path(&self) -> Vec<usize> {
        self.frames.iter().map(|n| n - 1).collect()
    }
}

fn children_at<'a>(mut nodes: &'a [MarkupNode], path: &[usize]) -> &'a [MarkupNode] {
    for &i in path {
        nodes = match nodes.get(i) {
            Some(node) => node.children(),
            None => &[],
        };
    }
    nodes
}

fn children_at_mut<'a>(
    mut nodes: &'a mut Vec<MarkupNode>,
    path: &[usize],
) -> Option<&'a mut Vec<MarkupNode>> {
    for &i in path {
        match nodes.get_mut(i) {
            Some(MarkupNode::Element { children, .. }) => nodes = children,
            _ => return None,
        }
    }
    Some(nodes)
}

fn node_at<'a>(nodes: &'a [MarkupNode], path: &[usize]) -> Option<&'a MarkupNode> {
    let (last, parent) = path.split_last()?;
    children_at(nodes, parent).get(*last)
}

fn node_at_mut<'a>(nodes: &'a mut Vec<MarkupNode>, path: &[usize]) -> Option<&'a mut MarkupNode> {
    let (last, parent) = path.split_last()?;
    children_at_mut(nodes, parent)?.get_mut(*last)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Completed { chars: usize },
    Cancelled { chars: usize },
}

/// Clear `target` and type `tree` into it, sleeping `interval` between characters.
pub async fn animate(
    target: &ContentHandle,
    tree: MarkupTree,
    interval: Duration,
    cancel: &CancellationToken,
) -> Animation {
    let mut writer = Typewriter::new(tree);
    target.set(Content::Markup(MarkupTree::default()));

    loop {
        if target.with_markup(|out| writer.step(out)) == Step::Done {
            return Animation::Completed {
                chars: writer.revealed(),
            };
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(message_id = %target.id(), chars = writer.revealed(), "animation cancelled");
                return Animation::Cancelled { chars: writer.revealed() };
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format_reply;
    use crate::tree::Tag;

    fn reveal_all(source: &MarkupTree) -> (MarkupTree, String) {
        let mut writer = Typewriter::new(source.clone());
        let mut out = MarkupTree::default();
        let mut order = String::new();
        while let Step::Revealed(ch) = writer.step(&mut out) {
            order.push(ch);
        }
        (out, order)
    }

    #[test]
    fn reveal_matches_static_rendering() {
        let sources = [
            "plain text",
            "**bold** then\n1. one\n2. **two** deep\n\ntail",
            "- a\n- b",
            "ünïcödé **✓**\n- 日本",
            "",
        ];
        for raw in sources {
            let source = format_reply(raw);
            let (out, order) = reveal_all(&source);
            assert_eq!(out, source, "tree mismatch for {raw:?}");
            assert_eq!(out.to_html(), source.to_html());
            assert_eq!(order, source.text_content(), "order mismatch for {raw:?}");
        }
    }

    #[test]
    fn one_character_per_step() {
        let source = format_reply("ab\ncd");
        let mut writer = Typewriter::new(source.clone());
        let mut out = MarkupTree::default();
        for expected in 1..=4 {
            assert!(matches!(writer.step(&mut out), Step::Revealed(_)));
            assert_eq!(out.char_count(), expected);
        }
        assert_eq!(writer.step(&mut out), Step::Done);
        assert!(writer.is_done());
        assert_eq!(writer.step(&mut out), Step::Done);
    }

    #[test]
    fn elements_appear_before_their_text() {
        let source = format_reply("- a");
        let mut writer = Typewriter::new(source);
        let mut out = MarkupTree::default();
        writer.step(&mut out);
        let div = &out.nodes[0];
        let ul = &div.children()[0];
        let li = &ul.children()[0];
        assert!(matches!(li, MarkupNode::Element { tag: Tag::Li, .. }));
        assert_eq!(li.children(), &[MarkupNode::text("a")]);
    }

    #[test]
    fn trailing_empty_elements_are_created_on_done() {
        let source = MarkupTree::new(vec![
            MarkupNode::text("x"),
            MarkupNode::element(Tag::Br, vec![]),
        ]);
        let mut writer = Typewriter::new(source.clone());
        let mut out = MarkupTree::default();
        assert_eq!(writer.step(&mut out), Step::Revealed('x'));
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(writer.step(&mut out), Step::Done);
        assert_eq!(out, source);
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut node = MarkupNode::text("z");
        for _ in 0..2_000 {
            node = MarkupNode::element(Tag::Strong, vec![node]);
        }
        let source = MarkupTree::new(vec![node]);
        let mut writer = Typewriter::new(source);
        let mut out = MarkupTree::default();
        assert_eq!(writer.step(&mut out), Step::Revealed('z'));
        assert_eq!(writer.step(&mut out), Step::Done);
        assert_eq!(out.char_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn animate_fills_target_and_completes() {
        let handle = ContentHandle::text("Thinking...");
        let tree = format_reply("- a\n- b");
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        let result = animate(&handle, tree.clone(), DEFAULT_CHAR_INTERVAL, &cancel).await;
        assert_eq!(result, Animation::Completed { chars: 2 });
        assert_eq!(handle.snapshot(), Content::Markup(tree));
        assert!(started.elapsed() >= DEFAULT_CHAR_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn animate_stops_when_cancelled() {
        let handle = ContentHandle::text("Thinking...");
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let target = handle.clone();
        let task = tokio::spawn(async move {
            animate(
                &target,
                MarkupTree::plain("abcdefgh"),
                Duration::from_millis(10),
                &child,
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(25)).await;
        cancel.cancel();
        let result = task.await.unwrap();
        let Animation::Cancelled { chars } = result else {
            panic!("expected cancellation, got {result:?}");
        };
        assert!(chars < 8);
        assert_eq!(handle.plain_text().chars().count(), chars);
    }
}
