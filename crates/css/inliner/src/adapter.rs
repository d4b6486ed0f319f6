use css_selectors::ElementAdapter;
use html::{Dom, NodeId};

/// Selector matching view over a parsed [`Dom`].
#[derive(Clone, Copy)]
pub struct DomAdapter<'dom> {
    dom: &'dom Dom,
}

impl<'dom> DomAdapter<'dom> {
    pub const fn new(dom: &'dom Dom) -> Self {
        Self { dom }
    }
}

impl ElementAdapter for DomAdapter<'_> {
    type Handle = NodeId;

    fn parent(&self, element: NodeId) -> Option<NodeId> {
        self.dom.parent_element(element)
    }

    fn previous_sibling_element(&self, element: NodeId) -> Option<NodeId> {
        self.dom.previous_element_sibling(element)
    }

    fn next_sibling_element(&self, element: NodeId) -> Option<NodeId> {
        self.dom.next_element_sibling(element)
    }

    fn tag_name(&self, element: NodeId) -> &str {
        self.dom.tag_name(element).unwrap_or_default()
    }

    fn element_id(&self, element: NodeId) -> Option<&str> {
        self.dom.attr(element, "id")
    }

    fn has_class(&self, element: NodeId, class: &str) -> bool {
        self.dom.has_class(element, class)
    }

    fn attr(&self, element: NodeId, name: &str) -> Option<&str> {
        self.dom.attr(element, name)
    }

    fn is_empty(&self, element: NodeId) -> bool {
        self.dom.is_empty_element(element)
    }
}
