//! Reply formatting and the typewriter that reveals it.
//!
//! Raw reply text goes through [`format_reply`] to become a [`MarkupTree`].
//! The tree is then typed into a [`ContentHandle`] one character at a time,
//! either with [`animate`] or by driving a [`Typewriter`] directly.

pub mod formatter;
pub mod html;
pub mod surface;
pub mod tree;
pub mod typewriter;

pub use formatter::{escape_html, format_reply, format_reply_html};
pub use html::parse_fragment;
pub use surface::{Content, ContentHandle, WeakContentHandle};
pub use tree::{MarkupNode, MarkupTree, Tag};
pub use typewriter::{Animation, DEFAULT_CHAR_INTERVAL, Step, Typewriter, animate};
