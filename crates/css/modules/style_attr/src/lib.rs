//! CSS Style Attributes: style="..." attribute processing.
//! Reference: <https://www.w3.org/TR/css-style-attr/>

#![forbid(unsafe_code)]

use std::collections::HashMap;

pub use css_syntax::{Declaration, SyntaxError};

/// Parse the value of a `style` attribute into a list of declarations.
///
/// The attribute value is parsed as the contents of a declaration block:
/// - Property names are lowercased and values are trimmed.
/// - A trailing `!important` is recognized case-insensitively.
/// - Invalid items (missing colon, empty value) are skipped.
///
/// Reference: <https://www.w3.org/TR/css-style-attr/#interpreting>
///
/// # Errors
/// Returns [`SyntaxError::InvalidAtRule`] if the attribute contains an at-rule.
pub fn parse_style_attribute(input: &str) -> Result<Vec<Declaration>, SyntaxError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    css_syntax::parse_declaration_list(input)
}

/// Parse and normalize a raw attribute string, keeping only the winning occurrence
/// of each property at its own position.
///
/// A later duplicate wins unless the earlier one is `!important` and the later one is not.
///
/// Reference: <https://www.w3.org/TR/css-style-attr/#interpreting>
///
/// # Errors
/// Propagates errors from [`parse_style_attribute`].
pub fn normalize_style_attribute(input: &str) -> Result<Vec<Declaration>, SyntaxError> {
    let declarations = parse_style_attribute(input)?;
    let mut winner_for_property: HashMap<&str, usize> = HashMap::new();
    for (index, decl_item) in declarations.iter().enumerate() {
        let replaces = winner_for_property
            .get(decl_item.name.as_str())
            .and_then(|&previous| declarations.get(previous))
            .is_none_or(|previous| decl_item.important || !previous.important);
        if replaces {
            winner_for_property.insert(decl_item.name.as_str(), index);
        }
    }
    let keep: Vec<bool> = declarations
        .iter()
        .enumerate()
        .map(|(index, decl_item)| winner_for_property.get(decl_item.name.as_str()) == Some(&index))
        .collect();
    Ok(declarations
        .into_iter()
        .zip(keep)
        .filter_map(|(decl_item, kept)| kept.then_some(decl_item))
        .collect())
}
