use indextree::{Arena, NodeId};
use smallvec::SmallVec;

mod printing;

/// What a node in the tree represents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Doctype {
        name: String,
    },
    /// Tag names are ASCII lowercase for HTML elements.
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

/// Payload stored in each arena slot.
#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub kind: NodeKind,
    /// Attributes in source order. Empty for non-elements.
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    /// Build an element payload.
    pub fn element(tag: impl Into<String>, attrs: SmallVec<(String, String), 4>) -> Self {
        Self {
            kind: NodeKind::Element { tag: tag.into() },
            attrs,
        }
    }

    /// Build a text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text { text: text.into() },
            attrs: SmallVec::new(),
        }
    }
}

/// A parsed document or fragment.
///
/// Children own their place in the arena; the parent link of each node is only
/// used to walk upwards.
pub struct Dom {
    dom: Arena<DOMNode>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl Dom {
    /// Create an empty tree holding only the document node, with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut dom = Arena::with_capacity(capacity);
        Self {
            root: dom.new_node(DOMNode::default()),
            dom,
        }
    }

    /// The document node.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&DOMNode> {
        self.dom.get(id).map(|node_ref| node_ref.get())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DOMNode> {
        self.dom.get_mut(id).map(|node_ref| node_ref.get_mut())
    }

    /// Create `node` and make it the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, node: DOMNode) -> NodeId {
        let id = self.dom.new_node(node);
        parent.append(id, &mut self.dom);
        id
    }

    /// Create `node` and make it the first child of `parent`.
    pub fn prepend(&mut self, parent: NodeId, node: DOMNode) -> NodeId {
        let id = self.dom.new_node(node);
        parent.prepend(id, &mut self.dom);
        id
    }

    /// Detach `id` and its subtree from the tree.
    pub fn remove(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.dom);
    }

    /// Direct children of `id`, in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.dom)
    }

    /// Element nodes below the document node, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.root
            .descendants(&self.dom)
            .filter(|id| self.tag_name(*id).is_some())
            .collect()
    }

    /// First element with the given tag, in document order.
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.root
            .descendants(&self.dom)
            .find(|id| self.tag_name(*id) == Some(tag))
    }

    /// Tag name if `id` is an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Value of attribute `name` on `id`. Names compare ASCII case-insensitively,
    /// so `viewbox` finds the case-preserved SVG `viewBox`.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?
            .attrs
            .iter()
            .find(|pair| pair.0.eq_ignore_ascii_case(name))
            .map(|pair| pair.1.as_str())
    }

    /// Set attribute `name`, keeping its position if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: String) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if let Some(slot) = node
            .attrs
            .iter_mut()
            .find(|pair| pair.0.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            node.attrs.push((name.to_owned(), value));
        }
    }

    /// True if `id` carries `class` in its whitespace separated `class` attribute.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|item| item == class))
    }

    /// Parent element of `id`, skipping the document node.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.dom.get(id)?.parent()?;
        self.tag_name(parent).map(|_| parent)
    }

    /// Closest preceding sibling that is an element.
    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.dom.get(id)?.previous_sibling();
        while let Some(sibling) = current {
            if self.tag_name(sibling).is_some() {
                return Some(sibling);
            }
            current = self.dom.get(sibling)?.previous_sibling();
        }
        None
    }

    /// Closest following sibling that is an element.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.dom.get(id)?.next_sibling();
        while let Some(sibling) = current {
            if self.tag_name(sibling).is_some() {
                return Some(sibling);
            }
            current = self.dom.get(sibling)?.next_sibling();
        }
        None
    }

    /// True if `id` has no element children and no non-empty text.
    pub fn is_empty_element(&self, id: NodeId) -> bool {
        self.children(id).all(|child| {
            self.node(child).is_none_or(|node| match &node.kind {
                NodeKind::Element { .. } => false,
                NodeKind::Text { text } => text.is_empty(),
                _ => true,
            })
        })
    }

    /// Concatenated text of the direct text children of `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.children(id)
            .filter_map(|child| match &self.node(child)?.kind {
                NodeKind::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: String) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.remove(child);
        }
        self.append(id, DOMNode::text(text));
    }
}
