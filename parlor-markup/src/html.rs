//! Parser for the small tag vocabulary the formatter emits.
//!
//! Input is trusted formatter output: user text has already had `<` and `>`
//! escaped, so every `<` starts one of our tags. Unknown or unterminated tags
//! degrade to literal text, and stray closing tags are ignored.

use crate::tree::{MarkupNode, MarkupTree, Tag};

struct Open {
    tag: Tag,
    class: Option<String>,
    children: Vec<MarkupNode>,
}

/// Parse an HTML fragment into a [`MarkupTree`].
///
/// ```
/// use parlor_markup::{parse_fragment, MarkupNode, Tag};
///
/// let tree = parse_fragment("a<strong>b</strong>&lt;c&gt;");
/// assert_eq!(tree.nodes.len(), 3);
/// assert_eq!(tree.text_content(), "ab<c>");
/// assert!(matches!(tree.nodes[1], MarkupNode::Element { tag: Tag::Strong, .. }));
/// ```
pub fn parse_fragment(html: &str) -> MarkupTree {
    let mut root: Vec<MarkupNode> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(current(&mut root, &mut stack), rest);
            break;
        };
        if lt > 0 {
            push_text(current(&mut root, &mut stack), &rest[..lt]);
        }
        let after = &rest[lt..];
        let Some(gt) = after.find('>') else {
            push_text(current(&mut root, &mut stack), after);
            break;
        };
        let raw = &after[..=gt];
        let inner = after[1..gt].trim();
        rest = &after[gt + 1..];

        if let Some(name) = inner.strip_prefix('/') {
            match Tag::from_name(name.trim()) {
                Some(tag) if stack.iter().any(|o| o.tag == tag) => close(&mut root, &mut stack, tag),
                Some(_) => {}
                None => push_text(current(&mut root, &mut stack), raw),
            }
            continue;
        }

        let inner = inner.trim_end_matches('/').trim_end();
        let (name, attrs) = match inner.find(char::is_whitespace) {
            Some(i) => (&inner[..i], &inner[i..]),
            None => (inner, ""),
        };
        match Tag::from_name(name) {
            Some(tag) if tag.is_void() => {
                current(&mut root, &mut stack).push(MarkupNode::Element {
                    tag,
                    class: class_attr(attrs),
                    children: Vec::new(),
                });
            }
            Some(tag) => stack.push(Open {
                tag,
                class: class_attr(attrs),
                children: Vec::new(),
            }),
            None => push_text(current(&mut root, &mut stack), raw),
        }
    }

    while let Some(open) = stack.pop() {
        fold(&mut root, &mut stack, open);
    }
    MarkupTree::new(root)
}

fn current<'a>(root: &'a mut Vec<MarkupNode>, stack: &'a mut [Open]) -> &'a mut Vec<MarkupNode> {
    match stack.last_mut() {
        Some(open) => &mut open.children,
        None => root,
    }
}

fn close(root: &mut Vec<MarkupNode>, stack: &mut Vec<Open>, tag: Tag) {
    while let Some(open) = stack.pop() {
        let done = open.tag == tag;
        fold(root, stack, open);
        if done {
            break;
        }
    }
}

fn fold(root: &mut Vec<MarkupNode>, stack: &mut [Open], open: Open) {
    current(root, stack).push(MarkupNode::Element {
        tag: open.tag,
        class: open.class,
        children: open.children,
    });
}

/// Append decoded text, merging with a preceding text node.
fn push_text(into: &mut Vec<MarkupNode>, raw: &str) {
    let decoded = decode_entities(raw);
    if decoded.is_empty() {
        return;
    }
    if let Some(MarkupNode::Text(prev)) = into.last_mut() {
        prev.push_str(&decoded);
    } else {
        into.push(MarkupNode::Text(decoded));
    }
}

fn class_attr(attrs: &str) -> Option<String> {
    let start = attrs.find("class=")? + "class=".len();
    let value = &attrs[start..];
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &value[1..];
    let end = body.find(quote)?;
    Some(body[..end].to_string())
}

pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
