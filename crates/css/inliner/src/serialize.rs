//! Rendering resolved declarations into a `style` attribute value.

use css_style_attr::Declaration;

/// Render `declarations` in order.
///
/// The default form writes `name: value;` for each declaration with no
/// separator in between. The minified form writes `name:value` joined by `;`.
/// Double quotes become single quotes so the result fits a double-quoted
/// attribute.
pub fn serialize_declarations(declarations: &[Declaration], minify: bool) -> String {
    let mut out = String::with_capacity(declarations.len().saturating_mul(24));
    for (index, declaration) in declarations.iter().enumerate() {
        if minify && index > 0 {
            out.push(';');
        }
        out.push_str(&declaration.name);
        out.push(':');
        if !minify {
            out.push(' ');
        }
        push_value(&mut out, &declaration.value);
        if declaration.important {
            out.push_str(" !important");
        }
        if !minify {
            out.push(';');
        }
    }
    out
}

fn push_value(out: &mut String, value: &str) {
    for character in value.chars() {
        out.push(if character == '"' { '\'' } else { character });
    }
}
