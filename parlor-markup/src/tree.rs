use std::fmt;

/// Element kinds a formatted reply can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    Strong,
    Ul,
    Li,
    Br,
}

impl Tag {
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Div => "div",
            Tag::Strong => "strong",
            Tag::Ul => "ul",
            Tag::Li => "li",
            Tag::Br => "br",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "div" => Some(Tag::Div),
            "strong" | "b" => Some(Tag::Strong),
            "ul" => Some(Tag::Ul),
            "li" => Some(Tag::Li),
            "br" => Some(Tag::Br),
            _ => None,
        }
    }

    /// Void elements never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Br)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: Tag,
        class: Option<String>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

impl MarkupNode {
    pub fn element(tag: Tag, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag,
            class: None,
            children,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        MarkupNode::Text(s.into())
    }

    /// Same node with no children and no text.
    pub fn hollow(&self) -> Self {
        match self {
            MarkupNode::Element { tag, class, .. } => MarkupNode::Element {
                tag: *tag,
                class: class.clone(),
                children: Vec::new(),
            },
            MarkupNode::Text(_) => MarkupNode::Text(String::new()),
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }
}

/// A root fragment: the top-level nodes of a formatted reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupTree {
    pub nodes: Vec<MarkupNode>,
}

impl MarkupTree {
    pub fn new(nodes: Vec<MarkupNode>) -> Self {
        Self { nodes }
    }

    /// A fragment holding one text node.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![MarkupNode::text(text)])
    }

    /// All text in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        walk(&self.nodes, &mut |node| {
            if let MarkupNode::Text(t) = node {
                out.push_str(t);
            }
        });
        out
    }

    /// Number of characters the typewriter will reveal.
    pub fn char_count(&self) -> usize {
        let mut n = 0;
        walk(&self.nodes, &mut |node| {
            if let MarkupNode::Text(t) = node {
                n += t.chars().count();
            }
        });
        n
    }

    /// Static HTML rendering with text re-escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_html(node, &mut out);
        }
        out
    }
}

impl fmt::Display for MarkupTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Pre-order walk with an explicit stack.
fn walk<'a>(nodes: &'a [MarkupNode], visit: &mut impl FnMut(&'a MarkupNode)) {
    let mut stack: Vec<&'a MarkupNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        visit(node);
        stack.extend(node.children().iter().rev());
    }
}

fn write_html(node: &MarkupNode, out: &mut String) {
    match node {
        MarkupNode::Text(t) => push_escaped(t, out),
        MarkupNode::Element {
            tag,
            class,
            children,
        } => {
            out.push('<');
            out.push_str(tag.name());
            if let Some(class) = class {
                out.push_str(" class=\"");
                out.push_str(class);
                out.push('"');
            }
            out.push('>');
            if tag.is_void() {
                return;
            }
            for child in children {
                write_html(child, out);
            }
            out.push_str("</");
            out.push_str(tag.name());
            out.push('>');
        }
    }
}

fn push_escaped(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MarkupTree {
        MarkupTree::new(vec![MarkupNode::element(
            Tag::Div,
            vec![
                MarkupNode::text("a "),
                MarkupNode::element(Tag::Strong, vec![MarkupNode::text("b")]),
                MarkupNode::element(Tag::Br, vec![]),
                MarkupNode::text("c<"),
            ],
        )])
    }

    #[test]
    fn text_content_is_document_order() {
        assert_eq!(sample().text_content(), "a bc<");
        assert_eq!(sample().char_count(), 5);
    }

    #[test]
    fn html_escapes_text_and_skips_void_close() {
        assert_eq!(
            sample().to_html(),
            "<div>a <strong>b</strong><br>c&lt;</div>"
        );
    }

    #[test]
    fn hollow_drops_children() {
        let tree = sample();
        assert!(tree.nodes[0].hollow().children().is_empty());
        assert_eq!(tree.nodes[0].children().len(), 4);
    }
}
