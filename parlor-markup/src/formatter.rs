//! Raw reply text → markup.
//!
//! Rules run in order over the whole string:
//! 1. escape `<` / `>`
//! 2. `**text**` → `<strong>`
//! 3. `N. text` / `- text` lines → `<li>` (the newline before the item is consumed)
//! 4. contiguous `<li>` runs → one `<ul class='chat-list'>`
//! 5. every run of newlines → `<br><br>`
//!
//! The result is wrapped in `<div class="chat-text">` and parsed into a
//! [`MarkupTree`]. Nothing here can fail: text that matches no rule passes
//! through unchanged.

use crate::html::parse_fragment;
use crate::tree::MarkupTree;
use regex::Regex;
use std::sync::LazyLock;

pub const CHAT_TEXT_CLASS: &str = "chat-text";
pub const CHAT_LIST_CLASS: &str = "chat-list";

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern compiles"));
static LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|-)\s(.*)$").expect("list pattern compiles"));
static LIST_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:<li>.*?</li>)+").expect("run pattern compiles"));
static NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("newline pattern compiles"));

/// Escape the two characters that would otherwise start markup.
pub fn escape_html(raw: &str) -> String {
    raw.replace('<', "&lt;").replace('>', "&gt;")
}

/// Apply every formatting rule and return the HTML string.
///
/// ```
/// use parlor_markup::format_reply_html;
///
/// assert_eq!(
///     format_reply_html("**Hi**\n- a\n- b"),
///     "<div class=\"chat-text\"><strong>Hi</strong><ul class='chat-list'><li>a</li><li>b</li></ul></div>"
/// );
/// ```
pub fn format_reply_html(raw: &str) -> String {
    let escaped = escape_html(raw);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    let listed = convert_list_items(&bolded);
    let wrapped = LIST_RUN.replace_all(&listed, format!("<ul class='{CHAT_LIST_CLASS}'>$0</ul>").as_str());
    let broken = NEWLINES.replace_all(&wrapped, "<br><br>");
    format!("<div class=\"{CHAT_TEXT_CLASS}\">{broken}</div>")
}

/// Format a raw reply into a markup tree.
pub fn format_reply(raw: &str) -> MarkupTree {
    parse_fragment(&format_reply_html(raw))
}

fn convert_list_items(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (i, line) in text.split('\n').enumerate() {
        match LIST_LINE.captures(line) {
            Some(caps) => {
                out.push_str("<li>");
                out.push_str(&caps[1]);
                out.push_str("</li>");
            }
            None => {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(line);
            }
        }
    }
    out
}
