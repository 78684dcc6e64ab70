//! Shared, in-place mutable message bodies.
//!
//! A [`ContentHandle`] is what the transcript keeps for each message and what
//! the animator writes into. The reply queue only holds a
//! [`WeakContentHandle`], so dropping a message from the transcript detaches
//! any reply still waiting for it.

use crate::tree::MarkupTree;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Markup(MarkupTree),
}

impl Content {
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text(t) => t.clone(),
            Content::Markup(tree) => tree.text_content(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentHandle {
    id: Uuid,
    inner: Arc<Mutex<Content>>,
}

impl ContentHandle {
    pub fn new(content: Content) -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(content)),
        }
    }

    /// A handle showing literal text.
    ///
    /// ```
    /// use parlor_markup::{Content, ContentHandle};
    ///
    /// let handle = ContentHandle::text("Thinking...");
    /// assert_eq!(handle.snapshot(), Content::Text("Thinking...".into()));
    /// let weak = handle.downgrade();
    /// assert!(weak.upgrade().is_some());
    /// drop(handle);
    /// assert!(weak.upgrade().is_none());
    /// ```
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::Text(text.into()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Content> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Content {
        self.lock().clone()
    }

    pub fn plain_text(&self) -> String {
        self.lock().plain_text()
    }

    pub fn set(&self, content: Content) {
        *self.lock() = content;
    }

    /// Run `f` against the markup body, replacing a text body with an empty tree first.
    pub fn with_markup<R>(&self, f: impl FnOnce(&mut MarkupTree) -> R) -> R {
        let mut guard = self.lock();
        if let Content::Markup(tree) = &mut *guard {
            return f(tree);
        }
        let mut tree = MarkupTree::default();
        let out = f(&mut tree);
        *guard = Content::Markup(tree);
        out
    }

    pub fn downgrade(&self) -> WeakContentHandle {
        WeakContentHandle {
            id: self.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning reference to a message body.
#[derive(Debug, Clone)]
pub struct WeakContentHandle {
    id: Uuid,
    inner: Weak<Mutex<Content>>,
}

impl WeakContentHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn upgrade(&self) -> Option<ContentHandle> {
        self.inner.upgrade().map(|inner| ContentHandle { id: self.id, inner })
    }

    pub fn is_detached(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MarkupNode;

    #[test]
    fn with_markup_replaces_text_body() {
        let handle = ContentHandle::text("Thinking...");
        handle.with_markup(|tree| tree.nodes.push(MarkupNode::text("x")));
        assert_eq!(handle.snapshot(), Content::Markup(MarkupTree::plain("x")));
    }

    #[test]
    fn clones_share_the_body() {
        let a = ContentHandle::text("one");
        let b = a.clone();
        b.set(Content::Text("two".into()));
        assert_eq!(a.plain_text(), "two");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn weak_handle_detaches_when_all_owners_drop() {
        let a = ContentHandle::text("one");
        let weak = a.downgrade();
        let b = a.clone();
        drop(a);
        assert!(!weak.is_detached());
        drop(b);
        assert!(weak.is_detached());
    }
}
