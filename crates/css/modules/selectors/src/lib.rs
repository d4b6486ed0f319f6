//! Selectors Level 3: Element matching and specificity.
//! Reference: <https://www.w3.org/TR/selectors-3/>
//!
//! This module implements the statically decidable part of Selectors Level 3:
//! - Type, universal, class, id and attribute selectors (all operators)
//! - Structural pseudo-classes and `:not()`
//! - Combinators: descendant, child, adjacent sibling, general sibling
//! - Specificity calculation
//!
//! Dynamic pseudo-classes and pseudo-elements are parsed but never match.

use core::iter;

mod matcher;
mod parser;
mod specificity;

// Re-export public API
pub use matcher::{matches_complex, matches_compound};
pub use parser::{SelectorParseError, parse_complex_selector, split_selector_list};
pub use specificity::{Specificity, specificity_of_complex, specificity_of_compound};

/// An adapter that abstracts DOM access for selector matching.
/// Implement this for your DOM layer.
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element if any. Returns `None` for the root element.
    /// Used by combinators (section 11)
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Previous sibling element (skip non-elements if your DOM has mixed nodes).
    /// Used by sibling combinators (section 11)
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Next sibling element (skip non-elements).
    /// Used by structural pseudo-classes (section 6.6.5)
    fn next_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase (per HTML parsing conventions).
    /// Type selectors (section 5)
    fn tag_name(&self, element: Self::Handle) -> &str;

    /// Returns Some(id) if the element has an id attribute, else None.
    /// ID selectors (section 7)
    fn element_id(&self, element: Self::Handle) -> Option<&str>;

    /// True if the element has the given class token.
    /// Class selectors (section 6)
    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    /// Returns the attribute value if present.
    /// Attribute selectors (section 8)
    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;

    /// True if the element has no element or text children.
    /// `:empty` (section 6.6.5.10)
    fn is_empty(&self, element: Self::Handle) -> bool;
}

/// Attribute selector operators.
/// Section 6.3.1, 6.3.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrOperator {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr~=value]`
    Includes,
    /// `[attr|=value]`
    DashMatch,
    /// `[attr^=value]`
    Prefix,
    /// `[attr$=value]`
    Suffix,
    /// `[attr*=value]`
    Substring,
}

/// An attribute predicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    /// Attribute name in ASCII lowercase.
    pub name: String,
    pub operator: AttrOperator,
    /// Expected value; empty for [`AttrOperator::Exists`].
    pub value: String,
    /// Set by the ` i` flag.
    pub case_insensitive: bool,
}

/// The `an+b` argument of `:nth-*()` pseudo-classes.
/// Section 6.6.5.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NthIndex {
    pub step: i32,
    pub offset: i32,
}

impl NthIndex {
    /// True if the 1-based `position` is selected by `an+b` for some n >= 0.
    ///
    /// Computed in `i64` so extreme `a` and `b` values cannot overflow.
    pub fn matches(self, position: i32) -> bool {
        let step = i64::from(self.step);
        let distance = i64::from(position) - i64::from(self.offset);
        if step == 0 {
            return distance == 0;
        }
        distance % step == 0 && distance / step >= 0
    }
}

/// Pseudo-classes.
/// Section 6.6.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthIndex),
    NthLastChild(NthIndex),
    NthOfType(NthIndex),
    NthLastOfType(NthIndex),
    /// Dynamic or unknown pseudo-class, kept by name. Never matches.
    Unsupported(String),
}

/// Simple selectors.
/// Section 5, 6, 7, 8.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    /// Type selectors (section 5)
    Type(String),
    /// Class selectors (section 6)
    Class(String),
    /// ID selectors (section 7)
    IdSelector(String),
    /// Attribute selectors (section 8)
    Attribute(AttributeSelector),
    /// Universal selector `*` (section 5)
    Universal,
    /// Section 6.6.
    PseudoClass(PseudoClass),
    /// Pseudo-elements. Never matches an element. (section 7)
    PseudoElement(String),
    /// `:not(<compound>)` (section 6.6.7)
    Negation(CompoundSelector),
}

/// A compound selector is a sequence of simple selectors (no combinators).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// False if this compound contains a pseudo-element or an unsupported pseudo-class.
    pub fn is_static(&self) -> bool {
        !self.simples.iter().any(|simple| {
            matches!(
                simple,
                SimpleSelector::PseudoElement(_)
                    | SimpleSelector::PseudoClass(PseudoClass::Unsupported(_))
            )
        })
    }
}

/// Combinators between compounds (section 11).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A complex selector is one or more compounds separated by combinators.
/// Each entry of `rest` holds the combinator linking the previous compound to it.
/// Section 3, 11.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

impl ComplexSelector {
    /// Compounds from left to right.
    pub fn compounds(&self) -> impl Iterator<Item = &CompoundSelector> {
        iter::once(&self.first).chain(self.rest.iter().map(|pair| &pair.1))
    }

    /// True if the selector can ever match an element without a live document,
    /// i.e. it uses no dynamic pseudo-classes and no pseudo-elements.
    pub fn can_match_statically(&self) -> bool {
        self.compounds().all(CompoundSelector::is_static)
    }
}
