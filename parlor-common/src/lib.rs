//! Common types and utilities shared across Parlor crates.
//!
//! This crate holds the few things every other crate needs: the message
//! [`Role`], the shared error type and the tracing initialiser. It stays
//! small so that the UI, HTTP and actor crates can all depend on it.
//!
//! # Overview
//!
//! - [`Role`]: who authored a transcript entry
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`ParlorError`] and [`Result`]: Shared error handling
//! - [`FALLBACK_REPLY`]: the text shown when a reply cannot be fetched
//!
//! # Examples
//!
//! ```rust
//! use parlor_common::Role;
//!
//! assert_eq!(Role::User.label(), "You");
//! assert_eq!(Role::Bot.placeholder("hi"), "Thinking...");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Text substituted for any failed reply fetch.
pub const FALLBACK_REPLY: &str = "Error: Could not get a response. Please try again later.";

/// Placeholder shown in a bot message until its reply is animated in.
pub const THINKING_PLACEHOLDER: &str = "Thinking...";

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Header label used by the transcript.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "Parlor",
        }
    }

    /// Initial body of a freshly rendered message.
    ///
    /// User messages show their literal text; bot messages wait behind the
    /// thinking placeholder.
    pub fn placeholder(&self, text: &str) -> String {
        match self {
            Role::User => text.to_string(),
            Role::Bot => THINKING_PLACEHOLDER.to_string(),
        }
    }
}

/// One entry of the in-memory chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// What the reply queue does when a reply targets a message that already
/// has a reply waiting or animating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameTargetPolicy {
    /// Cancel the older reply and animate the newer one in its place.
    #[default]
    Replace,
    /// Animate both, oldest first.
    Queue,
}

/// Order in which waiting replies are animated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOrdering {
    /// The order fetches resolved in.
    #[default]
    Arrival,
    /// The order the user messages were sent in.
    Send,
}

/// Error types used across the Parlor workspace.
#[derive(thiserror::Error, Debug)]
pub enum ParlorError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An actor mailbox was closed before the message could be delivered.
    #[error("Mailbox closed: {0}")]
    MailboxClosed(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`ParlorError`].
pub type Result<T> = std::result::Result<T, ParlorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_placeholder_ignores_text() {
        assert_eq!(Role::Bot.placeholder("whatever"), THINKING_PLACEHOLDER);
        assert_eq!(Role::User.placeholder("Hello"), "Hello");
    }

    #[test]
    fn role_serializes_lowercase() {
        let entry = HistoryEntry {
            role: Role::User,
            content: "hi".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
