//! CSS selector matching engine.
//! Reference: <https://www.w3.org/TR/selectors-3/>

use crate::{
    AttrOperator, AttributeSelector, Combinator, ComplexSelector, CompoundSelector,
    ElementAdapter, NthIndex, PseudoClass, SimpleSelector,
};

/// Match a complex selector against an element.
/// Right-to-left matching strategy (section 3, 11)
pub fn matches_complex<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
) -> bool {
    matches_from(adapter, element, sel, sel.rest.len())
}

/// Compound at `position`, counting `sel.first` as 0.
fn compound_at(sel: &ComplexSelector, position: usize) -> Option<&CompoundSelector> {
    match position.checked_sub(1) {
        None => Some(&sel.first),
        Some(rest_index) => sel.rest.get(rest_index).map(|pair| &pair.1),
    }
}

/// Match compounds `0..=position` with the compound at `position` anchored on `element`.
/// Backtracks over every candidate for descendant and general-sibling combinators.
fn matches_from<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
    position: usize,
) -> bool {
    let Some(compound) = compound_at(sel, position) else {
        return false;
    };
    if !matches_compound(adapter, element, compound) {
        return false;
    }
    let Some(left_position) = position.checked_sub(1) else {
        return true;
    };
    let Some(&(combinator, _)) = sel.rest.get(left_position) else {
        return false;
    };
    match combinator {
        Combinator::Descendant => {
            let mut current_parent = adapter.parent(element);
            while let Some(ancestor_element) = current_parent {
                if matches_from(adapter, ancestor_element, sel, left_position) {
                    return true;
                }
                current_parent = adapter.parent(ancestor_element);
            }
            false
        }
        Combinator::Child => adapter
            .parent(element)
            .is_some_and(|parent_el| matches_from(adapter, parent_el, sel, left_position)),
        Combinator::AdjacentSibling => adapter
            .previous_sibling_element(element)
            .is_some_and(|prev_el| matches_from(adapter, prev_el, sel, left_position)),
        Combinator::GeneralSibling => {
            let mut current_sibling = adapter.previous_sibling_element(element);
            while let Some(sibling_element) = current_sibling {
                if matches_from(adapter, sibling_element, sel, left_position) {
                    return true;
                }
                current_sibling = adapter.previous_sibling_element(sibling_element);
            }
            false
        }
    }
}

/// Match a compound selector against a single element.
/// Section 5-8.
pub fn matches_compound<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compound: &CompoundSelector,
) -> bool {
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(adapter, element, simple))
}

fn matches_simple<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    simple: &SimpleSelector,
) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => adapter.tag_name(element).eq_ignore_ascii_case(type_name),
        SimpleSelector::Class(class_name) => adapter.has_class(element, class_name),
        SimpleSelector::IdSelector(id_value) => adapter
            .element_id(element)
            .is_some_and(|value| value == id_value),
        SimpleSelector::Attribute(attribute) => adapter
            .attr(element, &attribute.name)
            .is_some_and(|attr_value| matches_attribute(attribute, attr_value)),
        SimpleSelector::PseudoClass(pseudo) => matches_pseudo_class(adapter, element, pseudo),
        SimpleSelector::PseudoElement(_) => false,
        SimpleSelector::Negation(inner) => !matches_compound(adapter, element, inner),
    }
}

/// Attribute selectors (section 6.3)
fn matches_attribute(attribute: &AttributeSelector, actual: &str) -> bool {
    let (actual, expected) = if attribute.case_insensitive {
        (actual.to_ascii_lowercase(), attribute.value.to_ascii_lowercase())
    } else {
        (actual.to_owned(), attribute.value.clone())
    };
    match attribute.operator {
        AttrOperator::Exists => true,
        AttrOperator::Equals => actual == expected,
        AttrOperator::Includes => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_ascii_whitespace().any(|token| token == expected)
        }
        AttrOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected.as_str())
                    .is_some_and(|tail| tail.starts_with('-'))
        }
        AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
        AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
        AttrOperator::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
    }
}

/// Structural pseudo-classes (section 6.6.5)
fn matches_pseudo_class<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    pseudo: &PseudoClass,
) -> bool {
    let before = |same_type: bool| count_siblings(adapter, element, same_type, true);
    let after = |same_type: bool| count_siblings(adapter, element, same_type, false);
    match pseudo {
        PseudoClass::Root => adapter.parent(element).is_none(),
        PseudoClass::Empty => adapter.is_empty(element),
        PseudoClass::FirstChild => before(false) == 0,
        PseudoClass::LastChild => after(false) == 0,
        PseudoClass::OnlyChild => before(false) == 0 && after(false) == 0,
        PseudoClass::FirstOfType => before(true) == 0,
        PseudoClass::LastOfType => after(true) == 0,
        PseudoClass::OnlyOfType => before(true) == 0 && after(true) == 0,
        PseudoClass::NthChild(nth) => nth_position_matches(*nth, before(false)),
        PseudoClass::NthLastChild(nth) => nth_position_matches(*nth, after(false)),
        PseudoClass::NthOfType(nth) => nth_position_matches(*nth, before(true)),
        PseudoClass::NthLastOfType(nth) => nth_position_matches(*nth, after(true)),
        PseudoClass::Unsupported(_) => false,
    }
}

fn nth_position_matches(nth: NthIndex, siblings: usize) -> bool {
    i32::try_from(siblings)
        .ok()
        .and_then(|count| count.checked_add(1))
        .is_some_and(|position| nth.matches(position))
}

/// Count element siblings before (or after) `element`, optionally only those sharing its tag.
fn count_siblings<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    same_type: bool,
    preceding: bool,
) -> usize {
    let step = |handle| {
        if preceding {
            adapter.previous_sibling_element(handle)
        } else {
            adapter.next_sibling_element(handle)
        }
    };
    let tag = adapter.tag_name(element);
    let mut count = 0_usize;
    let mut current = step(element);
    while let Some(sibling) = current {
        if !same_type || adapter.tag_name(sibling).eq_ignore_ascii_case(tag) {
            count = count.saturating_add(1);
        }
        current = step(sibling);
    }
    count
}
