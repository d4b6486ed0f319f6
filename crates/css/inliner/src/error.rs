//! Errors surfaced by configuration and inlining.

use core::error::Error;
use core::result;
use css_syntax::SyntaxError;
use html::HtmlError;
use std::io;
use url::ParseError;

/// Boxed transport error carried by [`InlineError::Network`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Everything that can abort configuration or an inlining call.
#[derive(Debug, thiserror::Error)]
pub enum InlineError {
    /// A `<link>` href or the configured base URL could not be turned into an absolute URL.
    #[error("{source}: {location}")]
    InvalidUrl {
        location: String,
        source: ParseError,
    },
    /// Fetching a remote stylesheet failed or returned a non-success status.
    #[error("Failed to fetch stylesheet {location}: {source}")]
    Network { location: String, source: BoxError },
    /// A `file:` stylesheet does not exist.
    #[error("Missing stylesheet file: {path}")]
    MissingStylesheet { path: String },
    #[error("{0}")]
    MalformedCss(String),
    #[error("{0}")]
    MalformedHtml(String),
    /// Rejected while building an [`InlineConfig`](crate::InlineConfig).
    #[error("{0}")]
    InvalidConfiguration(String),
    /// Writing the output to a caller-supplied writer failed.
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl From<SyntaxError> for InlineError {
    fn from(error: SyntaxError) -> Self {
        Self::MalformedCss(error.to_string())
    }
}

impl From<HtmlError> for InlineError {
    fn from(error: HtmlError) -> Self {
        Self::MalformedHtml(error.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T, E = InlineError> = result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let relative = InlineError::InvalidUrl {
            location: "style.css".to_owned(),
            source: ParseError::RelativeUrlWithoutBase,
        };
        assert_eq!(relative.to_string(), "relative URL without a base: style.css");

        let at_rule = InlineError::from(SyntaxError::InvalidAtRule("media".to_owned()));
        assert_eq!(at_rule.to_string(), "Invalid @ rule: media");

        let network = InlineError::Network {
            location: "https://example.com/a.css".to_owned(),
            source: "404 Not Found".into(),
        };
        assert_eq!(
            network.to_string(),
            "Failed to fetch stylesheet https://example.com/a.css: 404 Not Found"
        );
    }
}
