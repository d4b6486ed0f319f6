use core::fmt;

use super::{DOMNode, Dom, NodeKind};
use indextree::{Node, NodeId};

/// Elements that never have an end tag.
const VOID_ELEMENTS: [&str; 18] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: [&str; 8] = [
    "style",
    "script",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
    "noscript",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn escape_into(out: &mut String, text: &str, attribute_mode: bool) {
    for character in text.chars() {
        match character {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute_mode => out.push_str("&quot;"),
            '<' if !attribute_mode => out.push_str("&lt;"),
            '>' if !attribute_mode => out.push_str("&gt;"),
            _ => out.push(character),
        }
    }
}

impl Dom {
    /// Serialize the children of the document node as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.write_node(&mut out, child);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let Some(DOMNode { kind, attrs }) = self.node(id) else {
            return;
        };
        match kind {
            NodeKind::Document => self.write_children(out, id),
            NodeKind::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(out, value, true);
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                if matches!(tag.as_str(), "pre" | "textarea" | "listing")
                    && self.first_text_starts_with_newline(id)
                {
                    out.push('\n');
                }
                self.write_children(out, id);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text { text } => {
                let raw = self
                    .dom
                    .get(id)
                    .and_then(Node::parent)
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                if raw {
                    out.push_str(text);
                } else {
                    escape_into(out, text, false);
                }
            }
            NodeKind::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::ProcessingInstruction { target, data } => {
                out.push_str("<?");
                out.push_str(target);
                out.push(' ');
                out.push_str(data);
                out.push('>');
            }
        }
    }

    fn write_children(&self, out: &mut String, id: NodeId) {
        for child in self.children(id) {
            self.write_node(out, child);
        }
    }

    fn first_text_starts_with_newline(&self, id: NodeId) -> bool {
        self.children(id)
            .next()
            .and_then(|child| self.node(child))
            .is_some_and(|node| matches!(&node.kind, NodeKind::Text { text } if text.starts_with('\n')))
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                formatter.write_str("  ")?;
            }
            Ok(())
        }

        fn fmt_node(
            dom: &Dom,
            id: NodeId,
            formatter: &mut fmt::Formatter<'_>,
            depth: usize,
        ) -> fmt::Result {
            let Some(DOMNode { kind, attrs }) = dom.node(id) else {
                return Ok(());
            };
            write_indent(formatter, depth)?;
            match kind {
                NodeKind::Document => writeln!(formatter, "#document")?,
                NodeKind::Doctype { name } => writeln!(formatter, "<!DOCTYPE {name}>")?,
                NodeKind::Element { tag } => {
                    write!(formatter, "<{tag}")?;
                    for (name, value) in attrs {
                        write!(formatter, " {name}={value:?}")?;
                    }
                    writeln!(formatter, ">")?;
                }
                NodeKind::Text { text } => writeln!(formatter, "{text:?}")?,
                NodeKind::Comment { text } => writeln!(formatter, "<!--{text}-->")?,
                NodeKind::ProcessingInstruction { target, data } => {
                    writeln!(formatter, "<?{target} {data}>")?;
                }
            }
            for child in dom.children(id) {
                fmt_node(dom, child, formatter, depth.saturating_add(1))?;
            }
            Ok(())
        }

        fmt_node(self, self.root, formatter, 0)
    }
}
