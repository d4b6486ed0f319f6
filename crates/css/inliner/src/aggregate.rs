//! Stylesheet discovery and ordering.
//!
//! Sheets are returned lowest precedence first: user-agent rules, `<style>`
//! blocks in document order, linked sheets in document order, then the
//! configured extra CSS.

use crate::config::InlineConfig;
use crate::error::{InlineError, Result};
use css_cascade::Origin;
use css_syntax::{Stylesheet, parse_stylesheet};
use html::{Dom, NodeId};
use std::collections::HashSet;
use std::sync::Arc;
use url::{ParseError, Url};

const DIRECTIVE_ATTRIBUTE: &str = "data-css-inline";

/// Per-element opt-out read from `data-css-inline`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    Default,
    /// Leave the element alone: nothing is inlined into it, and a `<style>` or
    /// `<link>` carrying it is neither applied nor removed.
    Ignore,
    /// Apply a `<style>` block but keep it in the output.
    Keep,
}

pub fn directive(dom: &Dom, element: NodeId) -> Directive {
    match dom.attr(element, DIRECTIVE_ATTRIBUTE) {
        Some(value) if value.trim().eq_ignore_ascii_case("ignore") => Directive::Ignore,
        Some(value) if value.trim().eq_ignore_ascii_case("keep") => Directive::Keep,
        _ => Directive::Default,
    }
}

/// `<style>` elements in document order.
pub fn style_elements(dom: &Dom) -> Vec<NodeId> {
    dom.elements()
        .into_iter()
        .filter(|&id| dom.tag_name(id) == Some("style"))
        .collect()
}

/// `<link>` elements whose `rel` list contains `stylesheet`, in document order.
pub fn stylesheet_links(dom: &Dom) -> Vec<NodeId> {
    dom.elements()
        .into_iter()
        .filter(|&id| {
            dom.tag_name(id) == Some("link")
                && dom.attr(id, "rel").is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                })
        })
        .collect()
}

/// Where an aggregated sheet came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetSource {
    UserAgent,
    StyleTag(NodeId),
    Link(Url),
    Extra,
    /// CSS passed alongside a fragment.
    FragmentCss,
}

/// A stylesheet tagged with its origin bucket and source.
#[derive(Clone, Debug)]
pub struct SourcedSheet {
    pub origin: Origin,
    pub source: SheetSource,
    pub sheet: Arc<Stylesheet>,
}

impl SourcedSheet {
    fn new(origin: Origin, source: SheetSource, sheet: Arc<Stylesheet>) -> Self {
        Self {
            origin,
            source,
            sheet,
        }
    }
}

/// Resolve a `<link>` href against the configured base URL.
///
/// # Errors
/// [`InlineError::InvalidUrl`] when `href` is relative and there is no base,
/// or when it cannot be parsed at all.
pub fn resolve_href(href: &str, base: Option<&Url>) -> Result<Url> {
    let invalid = |source| InlineError::InvalidUrl {
        location: href.to_owned(),
        source,
    };
    match Url::parse(href) {
        Ok(url) => Ok(url),
        // `//host/path` and plain relative paths both end up here; `join`
        // gives the former the base's scheme.
        Err(ParseError::RelativeUrlWithoutBase) => match base {
            Some(base_url) => base_url.join(href).map_err(invalid),
            None => Err(invalid(ParseError::RelativeUrlWithoutBase)),
        },
        Err(source) => Err(invalid(source)),
    }
}

/// Collect every sheet that applies to a full document.
///
/// # Errors
/// Link resolution and fetch failures abort aggregation.
pub fn document_sheets(dom: &Dom, config: &InlineConfig) -> Result<Vec<SourcedSheet>> {
    let settings = config.settings();
    let mut sheets = Vec::new();
    if let Some(sheet) = config.user_agent_sheet() {
        sheets.push(SourcedSheet::new(
            Origin::UserAgent,
            SheetSource::UserAgent,
            Arc::clone(sheet),
        ));
    }

    let mut style_count = 0_usize;
    if settings.inline_style_tags {
        for style in style_elements(dom) {
            if directive(dom, style) == Directive::Ignore {
                continue;
            }
            let sheet = parse_stylesheet(&dom.text_content(style));
            sheets.push(SourcedSheet::new(
                Origin::Author,
                SheetSource::StyleTag(style),
                Arc::new(sheet),
            ));
            style_count = style_count.saturating_add(1);
        }
    }

    let mut link_count = 0_usize;
    if settings.load_remote_stylesheets {
        let mut seen = HashSet::new();
        for link in stylesheet_links(dom) {
            if directive(dom, link) == Directive::Ignore {
                continue;
            }
            let Some(href) = dom
                .attr(link, "href")
                .map(str::trim)
                .filter(|href| !href.is_empty())
            else {
                continue;
            };
            let url = resolve_href(href, config.base_url())?;
            if !seen.insert(url.clone()) {
                log::trace!("skipping duplicate stylesheet link {url}");
                continue;
            }
            let sheet = config.cache().get_or_fetch(&url)?;
            sheets.push(SourcedSheet::new(
                Origin::Author,
                SheetSource::Link(url),
                sheet,
            ));
            link_count = link_count.saturating_add(1);
        }
    }

    if let Some(sheet) = config.extra_sheet() {
        sheets.push(SourcedSheet::new(
            Origin::Extra,
            SheetSource::Extra,
            Arc::clone(sheet),
        ));
    }
    log::debug!(
        "aggregated {} stylesheets ({style_count} style tags, {link_count} links)",
        sheets.len()
    );
    Ok(sheets)
}

/// Sheets for fragment mode: no discovery, only the given CSS around the
/// configured user-agent and extra CSS.
pub fn fragment_sheets(css: &str, config: &InlineConfig) -> Vec<SourcedSheet> {
    let mut sheets = Vec::with_capacity(3);
    if let Some(sheet) = config.user_agent_sheet() {
        sheets.push(SourcedSheet::new(
            Origin::UserAgent,
            SheetSource::UserAgent,
            Arc::clone(sheet),
        ));
    }
    sheets.push(SourcedSheet::new(
        Origin::Author,
        SheetSource::FragmentCss,
        Arc::new(parse_stylesheet(css)),
    ));
    if let Some(sheet) = config.extra_sheet() {
        sheets.push(SourcedSheet::new(
            Origin::Extra,
            SheetSource::Extra,
            Arc::clone(sheet),
        ));
    }
    sheets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::fetch::StylesheetFetcher;
    use core::error::Error;

    struct Fixed;

    impl StylesheetFetcher for Fixed {
        fn fetch(&self, url: &Url) -> Result<String> {
            Ok(format!("a {{ content: '{}' }}", url.path()))
        }
    }

    fn make_config(settings: Settings) -> Result<InlineConfig, Box<dyn Error>> {
        Ok(InlineConfig::with_fetcher(settings, Arc::new(Fixed))?)
    }

    fn sources(sheets: &[SourcedSheet]) -> Vec<(Origin, String)> {
        sheets
            .iter()
            .map(|sourced| {
                let label = match &sourced.source {
                    SheetSource::UserAgent => "ua".to_owned(),
                    SheetSource::StyleTag(_) => "style".to_owned(),
                    SheetSource::Link(url) => url.path().to_owned(),
                    SheetSource::Extra => "extra".to_owned(),
                    SheetSource::FragmentCss => "fragment".to_owned(),
                };
                (sourced.origin, label)
            })
            .collect()
    }

    #[test]
    fn resolves_hrefs() -> Result<(), Box<dyn Error>> {
        let base = Url::parse("https://example.com/mail/index.html")?;
        assert_eq!(
            resolve_href("css/a.css", Some(&base))?.as_str(),
            "https://example.com/mail/css/a.css"
        );
        assert_eq!(
            resolve_href("//cdn.example.org/b.css", Some(&base))?.as_str(),
            "https://cdn.example.org/b.css"
        );
        assert_eq!(
            resolve_href("http://other.org/c.css", Some(&base))?.as_str(),
            "http://other.org/c.css"
        );
        let error = resolve_href("a.css", None).err();
        assert!(matches!(
            error,
            Some(InlineError::InvalidUrl {
                source: ParseError::RelativeUrlWithoutBase,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn orders_sheets_by_precedence() -> Result<(), Box<dyn Error>> {
        let dom = html::parse_document(
            "<html><head>\
             <link rel=\"stylesheet\" href=\"https://example.com/one.css\">\
             <style>p { color: red }</style>\
             <link rel=\"Alternate Stylesheet\" href=\"https://example.com/two.css\">\
             <link rel=\"stylesheet\" href=\"https://example.com/one.css\">\
             <link rel=\"icon\" href=\"https://example.com/favicon.ico\">\
             <style data-css-inline=\"ignore\">p { color: green }</style>\
             </head><body></body></html>",
            32,
        )?;
        let config = make_config(Settings {
            user_agent_css: Some("p { margin: 0 }".to_owned()),
            extra_css: Some("p { color: blue }".to_owned()),
            ..Settings::default()
        })?;
        let sheets = document_sheets(&dom, &config)?;
        assert_eq!(
            sources(&sheets),
            vec![
                (Origin::UserAgent, "ua".to_owned()),
                (Origin::Author, "style".to_owned()),
                (Origin::Author, "/one.css".to_owned()),
                (Origin::Author, "/two.css".to_owned()),
                (Origin::Extra, "extra".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn respects_disabled_sources() -> Result<(), Box<dyn Error>> {
        let dom = html::parse_document(
            "<link rel=\"stylesheet\" href=\"relative.css\"><style>p { color: red }</style>",
            8,
        )?;
        let config = make_config(Settings {
            inline_style_tags: false,
            load_remote_stylesheets: false,
            ..Settings::default()
        })?;
        assert!(document_sheets(&dom, &config)?.is_empty());
        Ok(())
    }

    #[test]
    fn relative_link_without_base_fails() -> Result<(), Box<dyn Error>> {
        let dom = html::parse_document("<link rel=\"stylesheet\" href=\"relative.css\">", 8)?;
        let error = document_sheets(&dom, &make_config(Settings::default())?).err();
        assert!(
            error
                .as_ref()
                .map(ToString::to_string)
                .is_some_and(|message| message.contains("relative URL without a base"))
        );
        Ok(())
    }

    #[test]
    fn fragment_sheets_wrap_given_css() -> Result<(), Box<dyn Error>> {
        let config = make_config(Settings {
            extra_css: Some("p { color: blue }".to_owned()),
            ..Settings::default()
        })?;
        let sheets = fragment_sheets("p { color: red }", &config);
        assert_eq!(
            sources(&sheets),
            vec![
                (Origin::Author, "fragment".to_owned()),
                (Origin::Extra, "extra".to_owned()),
            ]
        );
        Ok(())
    }
}
