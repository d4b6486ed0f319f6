//! Cascade resolution: which declaration wins for each property of each element.
//!
//! Every style rule of every aggregated sheet is matched against every element.
//! A rule applies with the specificity of its most specific matching selector.
//! Declarations already present in an element's `style` attribute join the
//! cascade in the `Inline` origin.

use crate::adapter::DomAdapter;
use crate::aggregate::{Directive, SourcedSheet, directive};
use crate::error::Result;
use css_cascade::{CascadePriority, CascadedDeclarations, Origin};
use css_selectors::{
    ComplexSelector, Specificity, matches_complex, parse_complex_selector, specificity_of_complex,
    split_selector_list,
};
use css_style_attr::{Declaration, normalize_style_attribute};
use html::{Dom, NodeId};
use std::collections::{HashMap, HashSet};

/// Identifies one selector of one style rule of one aggregated sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SelectorRef {
    /// Index into the aggregated sheet list.
    pub sheet: usize,
    /// Index into that sheet's `rules`.
    pub rule: usize,
    /// Position within the rule's comma separated selector list.
    pub selector: usize,
}

/// A style rule ready for matching.
struct CompiledRule<'sheet> {
    origin: Origin,
    sheet: usize,
    rule: usize,
    selectors: Vec<(usize, ComplexSelector, Specificity)>,
    declarations: &'sheet [Declaration],
    /// Source order of the first declaration; later ones follow consecutively.
    first_order: u32,
}

#[derive(Clone, Debug)]
struct Candidate {
    value: String,
    /// `None` for declarations taken from the element's own `style` attribute.
    selector: Option<SelectorRef>,
}

/// Final declarations for every element that received stylesheet declarations.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Elements in document order with their declarations in output order.
    pub styles: Vec<(NodeId, Vec<Declaration>)>,
    /// Selectors that supplied at least one winning declaration.
    pub inlined_selectors: HashSet<SelectorRef>,
}

fn compile<'sheet>(sheets: &'sheet [SourcedSheet]) -> Vec<CompiledRule<'sheet>> {
    let mut rules = Vec::new();
    let mut order = 0_u32;
    for (sheet_index, sourced) in sheets.iter().enumerate() {
        for (rule_index, rule) in sourced.sheet.style_rules() {
            if rule.declarations.is_empty() {
                continue;
            }
            let parsed: Result<Vec<_>, _> = split_selector_list(&rule.prelude)
                .into_iter()
                .enumerate()
                .map(|(position, text)| {
                    parse_complex_selector(text).map(|selector| {
                        let specificity = specificity_of_complex(&selector);
                        (position, selector, specificity)
                    })
                })
                .collect();
            let selectors = match parsed {
                Ok(selectors) => selectors,
                Err(err) => {
                    log::debug!("skipping rule: {err}");
                    continue;
                }
            };
            let selectors: Vec<_> = selectors
                .into_iter()
                .filter(|(_, selector, _)| {
                    let usable = selector.can_match_statically();
                    if !usable {
                        log::debug!("selector in `{}` cannot be inlined", rule.prelude);
                    }
                    usable
                })
                .collect();
            if selectors.is_empty() {
                continue;
            }
            let count = u32::try_from(rule.declarations.len()).unwrap_or(u32::MAX);
            rules.push(CompiledRule {
                origin: sourced.origin,
                sheet: sheet_index,
                rule: rule_index,
                selectors,
                declarations: &rule.declarations,
                first_order: order,
            });
            order = order.saturating_add(count);
        }
    }
    rules
}

/// Most specific selector of `rule` matching `element`.
fn best_match(
    adapter: &DomAdapter<'_>,
    element: NodeId,
    rule: &CompiledRule<'_>,
) -> Option<(usize, Specificity)> {
    rule.selectors
        .iter()
        .filter(|(_, selector, _)| matches_complex(adapter, element, selector))
        .map(|(position, _, specificity)| (*position, *specificity))
        .max_by(|left, right| left.1.cmp(&right.1).then(right.0.cmp(&left.0)))
}

/// Resolve the cascade for every element of `dom` against `sheets`.
///
/// # Errors
/// Fails with [`InlineError::MalformedCss`](crate::InlineError::MalformedCss)
/// if a styled element's existing `style` attribute contains an at-rule.
pub fn resolve(dom: &Dom, sheets: &[SourcedSheet]) -> Result<Resolution> {
    let rules = compile(sheets);
    let mut resolution = Resolution::default();
    if rules.is_empty() {
        return Ok(resolution);
    }
    let adapter = DomAdapter::new(dom);
    let mut tables: HashMap<NodeId, CascadedDeclarations<Candidate>> = HashMap::new();

    for element in dom.elements() {
        if directive(dom, element) == Directive::Ignore {
            continue;
        }
        for rule in &rules {
            let Some((position, specificity)) = best_match(&adapter, element, rule) else {
                continue;
            };
            let selector = SelectorRef {
                sheet: rule.sheet,
                rule: rule.rule,
                selector: position,
            };
            let table = tables.entry(element).or_default();
            let mut order = rule.first_order;
            for declaration in rule.declarations {
                let priority =
                    CascadePriority::new(rule.origin, declaration.important, specificity, order);
                table.cascade_put(
                    &declaration.name,
                    Candidate {
                        value: declaration.value.clone(),
                        selector: Some(selector),
                    },
                    priority,
                );
                order = order.saturating_add(1);
            }
        }
    }

    for element in dom.elements() {
        let Some(table) = tables.remove(&element) else {
            continue;
        };
        let declarations =
            merge_with_existing(dom, element, table, &mut resolution.inlined_selectors)?;
        resolution.styles.push((element, declarations));
    }
    log::debug!("resolved styles for {} elements", resolution.styles.len());
    Ok(resolution)
}

/// Fold the element's own `style` declarations into `table` and lay out the
/// result: existing properties keep their slots, new ones follow in ascending
/// cascade priority.
fn merge_with_existing(
    dom: &Dom,
    element: NodeId,
    mut table: CascadedDeclarations<Candidate>,
    inlined: &mut HashSet<SelectorRef>,
) -> Result<Vec<Declaration>> {
    let existing = match dom.attr(element, "style") {
        Some(text) => normalize_style_attribute(text)?,
        None => Vec::new(),
    };
    for (index, declaration) in existing.iter().enumerate() {
        let order = u32::try_from(index).unwrap_or(u32::MAX);
        table.cascade_put(
            &declaration.name,
            Candidate {
                value: declaration.value.clone(),
                selector: None,
            },
            CascadePriority::new(
                Origin::Inline,
                declaration.important,
                Specificity::default(),
                order,
            ),
        );
    }

    let mut out = Vec::with_capacity(table.len());
    let existing_names: HashSet<String> = existing
        .iter()
        .map(|declaration| declaration.name.clone())
        .collect();
    for declaration in existing {
        match table.get(&declaration.name) {
            Some(winner) if winner.priority.origin != Origin::Inline => {
                inlined.extend(winner.value.selector);
                out.push(Declaration {
                    name: declaration.name,
                    value: winner.value.value.clone(),
                    important: winner.priority.important,
                });
            }
            _ => out.push(declaration),
        }
    }
    for (name, winner) in table.into_sorted() {
        if existing_names.contains(&name) {
            continue;
        }
        inlined.extend(winner.value.selector);
        out.push(Declaration {
            name,
            value: winner.value.value,
            important: winner.priority.important,
        });
    }
    Ok(out)
}
