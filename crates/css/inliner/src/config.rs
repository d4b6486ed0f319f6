//! Validated, immutable inlining configuration.

use crate::cache::StylesheetCache;
use crate::error::{InlineError, Result};
use crate::fetch::{DefaultFetcher, StylesheetFetcher};
use core::fmt;
use core::time::Duration;
use css_syntax::{Stylesheet, parse_stylesheet};
use std::sync::Arc;
use url::Url;

/// Upper bound for the arena preallocation hint. Larger documents still parse;
/// the arena grows past this on demand.
const MAX_PREALLOCATED_NODES: usize = 1 << 16;

/// Raw options as supplied by a caller. Nothing here is validated until it is
/// passed to [`InlineConfig::new`].
#[derive(Clone, Debug)]
pub struct Settings {
    /// Apply `<style>` blocks found in the document.
    pub inline_style_tags: bool,
    /// Leave `<style>` blocks in the output.
    pub keep_style_tags: bool,
    /// Leave `<link rel="stylesheet">` tags in the output.
    pub keep_link_tags: bool,
    /// Emit at-rules of removed sheets into a new `<style>` block.
    pub keep_at_rules: bool,
    pub minify_css: bool,
    /// Fetch stylesheets referenced by `<link>` tags.
    pub load_remote_stylesheets: bool,
    /// Base for relative `<link>` hrefs.
    pub base_url: Option<String>,
    /// CSS applied after every document sheet.
    pub extra_css: Option<String>,
    /// Number of fetched stylesheets kept between calls. Zero disables caching.
    pub cache_size: i64,
    /// Arena capacity hint for parsed documents.
    pub preallocate_node_capacity: i64,
    /// Drop selectors from retained `<style>` blocks once they have been inlined.
    pub remove_inlined_selectors: bool,
    /// Lowest-precedence default rules.
    pub user_agent_css: Option<String>,
    /// Timeout for HTTP stylesheet requests.
    pub fetch_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inline_style_tags: true,
            keep_style_tags: false,
            keep_link_tags: false,
            keep_at_rules: false,
            minify_css: false,
            load_remote_stylesheets: true,
            base_url: None,
            extra_css: None,
            cache_size: 0,
            preallocate_node_capacity: 32,
            remove_inlined_selectors: false,
            user_agent_css: None,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration shared by any number of inlining calls, possibly on several
/// threads at once. The remote stylesheet cache lives here.
pub struct InlineConfig {
    settings: Settings,
    base_url: Option<Url>,
    preallocate: usize,
    extra_sheet: Option<Arc<Stylesheet>>,
    user_agent_sheet: Option<Arc<Stylesheet>>,
    cache: StylesheetCache,
}

impl InlineConfig {
    /// Validate `settings` and build a configuration using the default fetcher.
    ///
    /// # Errors
    /// - [`InlineError::InvalidConfiguration`] for a negative cache size, a
    ///   non-positive preallocation hint or a zero fetch timeout.
    /// - [`InlineError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(settings: Settings) -> Result<Self> {
        let fetcher = Arc::new(DefaultFetcher::new(settings.fetch_timeout));
        Self::with_fetcher(settings, fetcher)
    }

    /// Same as [`InlineConfig::new`] but stylesheets are loaded through `fetcher`.
    ///
    /// # Errors
    /// See [`InlineConfig::new`].
    pub fn with_fetcher(settings: Settings, fetcher: Arc<dyn StylesheetFetcher>) -> Result<Self> {
        let capacity = usize::try_from(settings.cache_size).map_err(|_| {
            InlineError::InvalidConfiguration(format!(
                "Cache size must be non-negative, got: {}",
                settings.cache_size
            ))
        })?;
        let preallocate = usize::try_from(settings.preallocate_node_capacity)
            .ok()
            .filter(|&capacity_hint| capacity_hint > 0)
            .ok_or_else(|| {
                InlineError::InvalidConfiguration(format!(
                    "Preallocate node capacity must be positive, got: {}",
                    settings.preallocate_node_capacity
                ))
            })?;
        if settings.fetch_timeout.is_zero() {
            return Err(InlineError::InvalidConfiguration(
                "Fetch timeout must be greater than zero".to_owned(),
            ));
        }
        let base_url = settings
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|source| InlineError::InvalidUrl {
                    location: raw.to_owned(),
                    source,
                })
            })
            .transpose()?;
        let extra_sheet = settings
            .extra_css
            .as_deref()
            .map(|css| Arc::new(parse_stylesheet(css)));
        let user_agent_sheet = settings
            .user_agent_css
            .as_deref()
            .map(|css| Arc::new(parse_stylesheet(css)));
        log::debug!(
            "inline config: cache capacity {capacity}, node capacity {preallocate}, base url {:?}",
            base_url.as_ref().map(Url::as_str)
        );
        Ok(Self {
            settings,
            base_url,
            preallocate,
            extra_sheet,
            user_agent_sheet,
            cache: StylesheetCache::new(capacity, fetcher),
        })
    }

    /// The options this configuration was built from.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Node capacity reserved up front for each parsed document.
    pub(crate) fn preallocate(&self) -> usize {
        self.preallocate.min(MAX_PREALLOCATED_NODES)
    }

    pub(crate) fn extra_sheet(&self) -> Option<&Arc<Stylesheet>> {
        self.extra_sheet.as_ref()
    }

    pub(crate) fn user_agent_sheet(&self) -> Option<&Arc<Stylesheet>> {
        self.user_agent_sheet.as_ref()
    }

    /// The shared remote stylesheet cache.
    pub const fn cache(&self) -> &StylesheetCache {
        &self.cache
    }

    /// Forget every cached remote stylesheet.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for InlineConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InlineConfig")
            .field("settings", &self.settings)
            .field("cached_stylesheets", &self.cache.len())
            .finish_non_exhaustive()
    }
}
