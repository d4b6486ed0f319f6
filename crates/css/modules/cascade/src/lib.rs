//! CSS Cascading and Inheritance Level 4: Cascade sorting.
//! Reference: <https://www.w3.org/TR/css-cascade-4/>
//!
//! Inlining never computes inherited or initial values, so only the sorting
//! half of the cascade lives here: priorities, their ordering, and a per-element
//! table that keeps the winning declaration for each property.

#![forbid(unsafe_code)]

use core::cmp::Ordering;
use css_selectors::Specificity;
use std::collections::HashMap;

/// Coarse precedence bucket of a declaration, lowest first.
/// Cascading origins (section 6.2)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Built-in default rules.
    UserAgent,
    /// `<style>` and `<link>` stylesheets, or the CSS given for a fragment.
    Author,
    /// Caller-supplied extra CSS.
    Extra,
    /// Declarations already present in an element's `style` attribute.
    Inline,
}

/// Rank origins: UA < Author < Extra < Inline.
const fn origin_rank(origin: Origin) -> u8 {
    match origin {
        Origin::UserAgent => 0,
        Origin::Author => 1,
        Origin::Extra => 2,
        Origin::Inline => 3,
    }
}

/// Priority tuple used to order declarations in the cascade.
/// Cascade sorting order (section 6)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CascadePriority {
    /// Importance (section 6.4)
    pub important: bool,
    /// Origins (section 6.2)
    pub origin: Origin,
    /// Specificity (section 6.4)
    pub specificity: Specificity,
    /// Source order index, increasing with ingestion order across all stylesheets.
    /// Order of appearance (section 6.4)
    pub source_order: u32,
}

impl CascadePriority {
    /// Construct a priority value from inputs.
    #[inline]
    pub const fn new(
        origin: Origin,
        important: bool,
        specificity: Specificity,
        source_order: u32,
    ) -> Self {
        Self {
            important,
            origin,
            specificity,
            source_order,
        }
    }
}

impl Ord for CascadePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_priority(self, other)
    }
}

impl PartialOrd for CascadePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two `CascadePriority` values according to the cascade rules.
/// Lower comes first; return `Ordering::Greater` if `left` should win over `right`.
///
/// Keys, most significant first: importance, origin, specificity, source order.
pub fn compare_priority(left: &CascadePriority, right: &CascadePriority) -> Ordering {
    // Importance first (important wins)
    left.important
        .cmp(&right.important)
        .then_with(|| origin_rank(left.origin).cmp(&origin_rank(right.origin)))
        .then_with(|| left.specificity.cmp(&right.specificity))
        // Source order: later wins
        .then_with(|| left.source_order.cmp(&right.source_order))
}

/// A declared value with the priority it was cascaded at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CascadedValue<T> {
    pub value: T,
    pub priority: CascadePriority,
}

/// Winning declaration per property for one element.
///
/// Properties keep the order in which they were first declared, which makes
/// iteration deterministic for identical inputs.
#[derive(Clone, Debug)]
pub struct CascadedDeclarations<T> {
    /// Property name and its current winner.
    entries: Vec<(String, CascadedValue<T>)>,
    /// Property name to index into `entries`.
    index_by_name: HashMap<String, usize>,
}

impl<T> Default for CascadedDeclarations<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index_by_name: HashMap::new(),
        }
    }
}

impl<T> CascadedDeclarations<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a declaration for `name`. It is kept only if it outranks the current
    /// winner. Returns whether it was kept; lower-ranked candidates are dropped.
    pub fn cascade_put(&mut self, name: &str, value: T, priority: CascadePriority) -> bool {
        if let Some(&slot) = self.index_by_name.get(name) {
            let Some(entry) = self.entries.get_mut(slot) else {
                return false;
            };
            if compare_priority(&priority, &entry.1.priority) != Ordering::Greater {
                return false;
            }
            entry.1 = CascadedValue { value, priority };
            return true;
        }
        self.index_by_name
            .insert(name.to_owned(), self.entries.len());
        self.entries
            .push((name.to_owned(), CascadedValue { value, priority }));
        true
    }

    /// Current winner for `name`.
    pub fn get(&self, name: &str) -> Option<&CascadedValue<T>> {
        self.index_by_name
            .get(name)
            .and_then(|&slot| self.entries.get(slot))
            .map(|entry| &entry.1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the table, returning winners sorted by ascending cascade priority.
    pub fn into_sorted(self) -> Vec<(String, CascadedValue<T>)> {
        let mut entries = self.entries;
        entries.sort_by(|left, right| compare_priority(&left.1.priority, &right.1.priority));
        entries
    }
}
