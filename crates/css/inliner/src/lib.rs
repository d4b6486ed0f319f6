//! Inline CSS into HTML `style` attributes.
//!
//! Stylesheets from `<style>` blocks, `<link rel="stylesheet">` references and
//! caller supplied CSS are cascaded onto every element they match. The result
//! carries its styling in `style` attributes only, which is what HTML email
//! clients expect.
//!
//! ```no_run
//! use css_inliner::{InlineConfig, Settings, inline};
//!
//! # fn run() -> Result<(), css_inliner::InlineError> {
//! let config = InlineConfig::new(Settings::default())?;
//! let html = inline(
//!     "<html><head><style>h1 { color: blue }</style></head><body><h1>Hi</h1></body></html>",
//!     &config,
//! )?;
//! assert!(html.contains("<h1 style=\"color: blue;\">"));
//! # Ok(())
//! # }
//! ```

mod adapter;
mod aggregate;
mod assemble;
mod cache;
mod config;
mod error;
mod fetch;
mod resolve;
mod serialize;

use assemble::Mode;
use std::io::Write;

pub use cache::StylesheetCache;
pub use config::{InlineConfig, Settings};
pub use error::{BoxError, InlineError, Result};
pub use fetch::{DefaultFetcher, StylesheetFetcher};
pub use serialize::serialize_declarations;

/// Inline every applicable stylesheet of a full HTML document.
///
/// The document structure (doctype, `html`, `head` and `body`) is preserved;
/// missing wrappers are added by the HTML parser.
///
/// # Errors
/// - [`InlineError::InvalidUrl`] for a relative `<link>` href without a base URL.
/// - [`InlineError::Network`] or [`InlineError::MissingStylesheet`] when a
///   linked stylesheet cannot be loaded.
/// - [`InlineError::MalformedCss`] when a styled element's `style` attribute
///   contains an at-rule.
/// - [`InlineError::MalformedHtml`] when the markup cannot be read.
pub fn inline(html: &str, config: &InlineConfig) -> Result<String> {
    let mut dom = html::parse_document(html, config.preallocate())?;
    let sheets = aggregate::document_sheets(&dom, config)?;
    let resolution = resolve::resolve(&dom, &sheets)?;
    assemble::assemble(
        &mut dom,
        &sheets,
        resolution,
        config.settings(),
        Mode::Document,
    );
    Ok(dom.to_html())
}

/// Like [`inline`], but writes the result into `target`.
///
/// Nothing is written if inlining fails.
///
/// # Errors
/// Everything [`inline`] reports, plus [`InlineError::Io`] when writing fails.
pub fn inline_to<W: Write>(html: &str, config: &InlineConfig, target: &mut W) -> Result<()> {
    let output = inline(html, config)?;
    target.write_all(output.as_bytes())?;
    Ok(())
}

/// Inline `css` into an HTML fragment.
///
/// `<style>` and `<link>` tags inside the fragment are not applied. Only the
/// fragment's own nodes are serialized; no `html`, `head` or `body` wrappers
/// are added.
///
/// # Errors
/// - [`InlineError::MalformedCss`] when a styled element's `style` attribute
///   contains an at-rule.
/// - [`InlineError::MalformedHtml`] when the markup cannot be read.
pub fn inline_fragment(html: &str, css: &str, config: &InlineConfig) -> Result<String> {
    let mut dom = html::parse_fragment(html, config.preallocate())?;
    let sheets = aggregate::fragment_sheets(css, config);
    let resolution = resolve::resolve(&dom, &sheets)?;
    assemble::assemble(
        &mut dom,
        &sheets,
        resolution,
        config.settings(),
        Mode::Fragment,
    );
    Ok(dom.to_html())
}

/// Like [`inline_fragment`], but writes the result into `target`.
///
/// # Errors
/// Everything [`inline_fragment`] reports, plus [`InlineError::Io`] when
/// writing fails.
pub fn inline_fragment_to<W: Write>(
    html: &str,
    css: &str,
    config: &InlineConfig,
    target: &mut W,
) -> Result<()> {
    let output = inline_fragment(html, css, config)?;
    target.write_all(output.as_bytes())?;
    Ok(())
}
