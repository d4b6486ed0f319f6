//! Writes resolved styles back into the tree and decides which stylesheet
//! tags and at-rules survive.

use crate::aggregate::{
    Directive, SheetSource, SourcedSheet, directive, style_elements, stylesheet_links,
};
use crate::config::Settings;
use crate::resolve::{Resolution, SelectorRef};
use crate::serialize::serialize_declarations;
use css_selectors::split_selector_list;
use css_syntax::{AtRule, CssRule, Stylesheet};
use html::{DOMNode, Dom, NodeId};
use smallvec::SmallVec;
use std::collections::HashSet;

/// What kind of tree is being assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Document,
    Fragment,
}

/// Apply `resolution` to `dom` and prune stylesheet tags according to `settings`.
pub fn assemble(
    dom: &mut Dom,
    sheets: &[SourcedSheet],
    resolution: Resolution,
    settings: &Settings,
    mode: Mode,
) {
    let Resolution {
        styles,
        inlined_selectors,
    } = resolution;
    for (element, declarations) in &styles {
        dom.set_attr(
            *element,
            "style",
            serialize_declarations(declarations, settings.minify_css),
        );
    }

    let mut removed_styles = HashSet::new();
    for style in style_elements(dom) {
        let keep = match directive(dom, style) {
            Directive::Ignore | Directive::Keep => true,
            Directive::Default => settings.keep_style_tags,
        };
        if !keep {
            dom.remove(style);
            removed_styles.insert(style);
            continue;
        }
        if settings.remove_inlined_selectors
            && let Some((index, sourced)) = sheets
                .iter()
                .enumerate()
                .find(|(_, sourced)| sourced.source == SheetSource::StyleTag(style))
            && let Some(text) = without_inlined(index, &sourced.sheet, &inlined_selectors)
        {
            dom.set_text_content(style, text);
        }
    }

    for link in stylesheet_links(dom) {
        if settings.keep_link_tags || directive(dom, link) == Directive::Ignore {
            continue;
        }
        dom.remove(link);
    }

    if settings.keep_at_rules {
        let at_rules = dropped_at_rules(sheets, &removed_styles, settings.keep_link_tags);
        if !at_rules.is_empty() {
            insert_style(dom, at_rules, mode);
        }
    }
    log::debug!("inlined styles into {} elements", styles.len());
}

/// At-rules from sheets whose own tag is gone from the output.
fn dropped_at_rules(
    sheets: &[SourcedSheet],
    removed_styles: &HashSet<NodeId>,
    links_kept: bool,
) -> String {
    sheets
        .iter()
        .filter(|sourced| match &sourced.source {
            SheetSource::UserAgent => false,
            SheetSource::StyleTag(style) => removed_styles.contains(style),
            SheetSource::Link(_) => !links_kept,
            SheetSource::Extra | SheetSource::FragmentCss => true,
        })
        .flat_map(|sourced| sourced.sheet.at_rules())
        .map(AtRule::to_css)
        .collect::<Vec<_>>()
        .join(" ")
}

fn insert_style(dom: &mut Dom, text: String, mode: Mode) {
    let node = DOMNode::element("style", SmallVec::new());
    let style = match mode {
        Mode::Document => {
            let parent = dom.find_element("head").unwrap_or_else(|| dom.root());
            dom.append(parent, node)
        }
        Mode::Fragment => {
            let root = dom.root();
            dom.prepend(root, node)
        }
    };
    dom.set_text_content(style, text);
}

/// Regenerate `sheet` without the selectors that were inlined. Returns `None`
/// when nothing was removed so the original text can be kept as written.
fn without_inlined(
    sheet_index: usize,
    sheet: &Stylesheet,
    inlined: &HashSet<SelectorRef>,
) -> Option<String> {
    let mut changed = false;
    let mut parts = Vec::with_capacity(sheet.rules.len());
    for (rule_index, rule) in sheet.rules.iter().enumerate() {
        match rule {
            CssRule::Style(style_rule) => {
                let selectors = split_selector_list(&style_rule.prelude);
                let remaining: Vec<&str> = selectors
                    .iter()
                    .enumerate()
                    .filter(|(position, _)| {
                        !inlined.contains(&SelectorRef {
                            sheet: sheet_index,
                            rule: rule_index,
                            selector: *position,
                        })
                    })
                    .map(|(_, text)| *text)
                    .collect();
                if remaining.len() != selectors.len() {
                    changed = true;
                }
                if !remaining.is_empty() {
                    parts.push(style_rule.to_css_with_prelude(&remaining.join(", ")));
                }
            }
            CssRule::At(at_rule) => parts.push(at_rule.to_css()),
        }
    }
    changed.then(|| parts.join("\n"))
}
