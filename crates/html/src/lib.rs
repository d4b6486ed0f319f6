//! Arena-backed HTML document model.
//!
//! Documents and fragments are parsed with html5ever, converted into an
//! [`indextree`] arena and serialized back to markup after mutation.

pub mod dom;
pub mod parser;

pub use dom::{DOMNode, Dom, NodeKind};
pub use indextree::NodeId;
pub use parser::{HtmlError, parse_document, parse_fragment};
