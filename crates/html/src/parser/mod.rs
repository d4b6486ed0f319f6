//! HTML5 parsing using html5ever.
//!
//! html5ever builds a reference-counted tree which is then copied into the
//! arena-backed [`Dom`].

use crate::dom::{DOMNode, Dom, NodeKind};
use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, QualName, local_name, ns};
use indextree::NodeId;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use smallvec::SmallVec;
use std::io;
use thiserror::Error;

/// Failure while reading markup.
#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("failed to read HTML input: {0}")]
    Read(#[from] io::Error),
}

/// Parse a complete document. Missing `html`, `head` and `body` elements are
/// synthesized by the HTML tree builder.
///
/// # Errors
/// Returns [`HtmlError::Read`] if the input cannot be decoded.
pub fn parse_document(html: &str, capacity: usize) -> Result<Dom, HtmlError> {
    let rc_dom = html5ever::parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    let mut dom = Dom::with_capacity(capacity);
    let root = dom.root();
    convert_children(&mut dom, &rc_dom.document, root);
    Ok(dom)
}

/// Parse a fragment as if it were the contents of a `<body>` element. No
/// wrapper elements end up in the returned tree.
///
/// # Errors
/// Returns [`HtmlError::Read`] if the input cannot be decoded.
pub fn parse_fragment(html: &str, capacity: usize) -> Result<Dom, HtmlError> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let rc_dom = html5ever::parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        context,
        Vec::new(),
        false,
    )
    .from_utf8()
    .read_from(&mut html.as_bytes())?;
    let mut dom = Dom::with_capacity(capacity);
    let root = dom.root();
    // The fragment algorithm hangs the parsed nodes off a synthetic <html> element.
    for child in rc_dom.document.children.borrow().iter() {
        match &child.data {
            RcNodeData::Element { name, .. } if name.local == local_name!("html") => {
                convert_children(&mut dom, child, root);
            }
            _ => convert_node(&mut dom, child, root),
        }
    }
    Ok(dom)
}

fn convert_children(dom: &mut Dom, rc_node: &Handle, parent: NodeId) {
    for child in rc_node.children.borrow().iter() {
        convert_node(dom, child, parent);
    }
}

/// Copy an html5ever node and its subtree under `parent`.
fn convert_node(dom: &mut Dom, rc_node: &Handle, parent: NodeId) {
    let kind = match &rc_node.data {
        RcNodeData::Document => {
            convert_children(dom, rc_node, parent);
            return;
        }
        RcNodeData::Doctype { name, .. } => NodeKind::Doctype {
            name: name.to_string(),
        },
        RcNodeData::Text { contents } => NodeKind::Text {
            text: contents.borrow().to_string(),
        },
        RcNodeData::Comment { contents } => NodeKind::Comment {
            text: contents.to_string(),
        },
        RcNodeData::ProcessingInstruction { target, contents } => {
            NodeKind::ProcessingInstruction {
                target: target.to_string(),
                data: contents.to_string(),
            }
        }
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attributes: SmallVec<(String, String), 4> = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let local = attr.name.local.to_string();
                    let qualified = match &attr.name.prefix {
                        Some(prefix) => format!("{prefix}:{local}"),
                        None => local,
                    };
                    (qualified, attr.value.to_string())
                })
                .collect();
            let node = dom.append(parent, DOMNode::element(name.local.to_string(), attributes));
            convert_children(dom, rc_node, node);
            // <template> contents live in a separate document fragment.
            if let Some(contents) = template_contents.borrow().as_ref() {
                convert_children(dom, contents, node);
            }
            return;
        }
    };
    dom.append(
        parent,
        DOMNode {
            kind,
            attrs: SmallVec::new(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::error::Error;

    #[test]
    fn document_round_trip_keeps_structure() -> Result<(), Box<dyn Error>> {
        let dom = parse_document(
            "<!DOCTYPE html><html><head><title>T</title></head><body>\n<p class=\"x\">a &amp; b</p><br></body></html>",
            16,
        )?;
        assert_eq!(
            dom.to_html(),
            "<!DOCTYPE html><html><head><title>T</title></head><body>\n<p class=\"x\">a &amp; b</p><br></body></html>"
        );
        Ok(())
    }

    #[test]
    fn document_gets_implied_wrappers() -> Result<(), Box<dyn Error>> {
        let dom = parse_document("<p>hi</p>", 4)?;
        assert_eq!(
            dom.to_html(),
            "<html><head></head><body><p>hi</p></body></html>"
        );
        Ok(())
    }

    #[test]
    fn fragment_has_no_wrappers() -> Result<(), Box<dyn Error>> {
        let dom = parse_fragment("<div><h1>Hello</h1></div>\n<p>x</p>", 8)?;
        assert_eq!(dom.to_html(), "<div><h1>Hello</h1></div>\n<p>x</p>");
        assert!(parse_fragment("", 1)?.to_html().is_empty());
        Ok(())
    }

    #[test]
    fn style_text_is_not_escaped() -> Result<(), Box<dyn Error>> {
        let dom = parse_fragment("<style>a > b { content: \"&\" }</style>", 4)?;
        assert_eq!(dom.to_html(), "<style>a > b { content: \"&\" }</style>");
        Ok(())
    }
}
