use anyhow::{Result, anyhow};
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use css_inliner::{InlineConfig, InlineError, Settings, StylesheetFetcher, inline};
use std::fs;
use std::sync::Arc;
use std::thread;
use url::Url;

fn init_logging() {
    let _logger = env_logger::builder().is_test(true).try_init();
}

/// Serves `h1 { color: <last path segment without .css> }` and counts requests.
#[derive(Default)]
struct CountingFetcher {
    requests: AtomicUsize,
    delay: Duration,
}

impl CountingFetcher {
    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl StylesheetFetcher for CountingFetcher {
    fn fetch(&self, url: &Url) -> css_inliner::Result<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .trim_end_matches(".css");
        if name == "missing" {
            return Err(InlineError::Network {
                location: url.to_string(),
                source: "404 Not Found".into(),
            });
        }
        Ok(format!("h1 {{ color: {name} }}"))
    }
}

fn mock_config(settings: Settings, fetcher: &Arc<CountingFetcher>) -> Result<InlineConfig> {
    init_logging();
    Ok(InlineConfig::with_fetcher(
        settings,
        Arc::clone(fetcher) as Arc<dyn StylesheetFetcher>,
    )?)
}

fn linked(href: &str) -> String {
    format!(
        "<html><head><link rel=\"stylesheet\" href=\"{href}\"></head><body><h1>Hi</h1></body></html>"
    )
}

#[test]
fn applies_and_removes_linked_sheet() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(Settings::default(), &fetcher)?;
    let output = inline(&linked("https://example.com/red.css"), &config)?;
    assert_eq!(
        output,
        "<html><head></head><body><h1 style=\"color: red;\">Hi</h1></body></html>"
    );
    Ok(())
}

#[test]
fn keep_link_tags_retains_link() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(
        Settings {
            keep_link_tags: true,
            ..Settings::default()
        },
        &fetcher,
    )?;
    let output = inline(&linked("https://example.com/red.css"), &config)?;
    assert!(output.contains("<link rel=\"stylesheet\" href=\"https://example.com/red.css\">"));
    assert!(output.contains("<h1 style=\"color: red;\">"));
    Ok(())
}

#[test]
fn relative_links_use_base_url() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(
        Settings {
            base_url: Some("https://example.com/mail/".to_owned()),
            ..Settings::default()
        },
        &fetcher,
    )?;
    let output = inline(&linked("css/blue.css"), &config)?;
    assert!(output.contains("<h1 style=\"color: blue;\">"));
    let protocol_relative = inline(&linked("//cdn.example.com/green.css"), &config)?;
    assert!(protocol_relative.contains("<h1 style=\"color: green;\">"));
    Ok(())
}

#[test]
fn relative_link_without_base_is_invalid_url() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(Settings::default(), &fetcher)?;
    let error = inline(&linked("red.css"), &config)
        .err()
        .ok_or_else(|| anyhow!("relative link should fail"))?;
    assert!(matches!(error, InlineError::InvalidUrl { .. }));
    assert!(error.to_string().contains("relative URL without a base"));
    assert_eq!(fetcher.requests(), 0);
    Ok(())
}

#[test]
fn disabled_remote_loading_skips_links() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(
        Settings {
            load_remote_stylesheets: false,
            ..Settings::default()
        },
        &fetcher,
    )?;
    let output = inline(&linked("red.css"), &config)?;
    assert_eq!(
        output,
        "<html><head></head><body><h1>Hi</h1></body></html>"
    );
    assert_eq!(fetcher.requests(), 0);
    Ok(())
}

#[test]
fn fetch_failures_abort_inlining() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(Settings::default(), &fetcher)?;
    let error = inline(&linked("https://example.com/missing.css"), &config)
        .err()
        .ok_or_else(|| anyhow!("missing stylesheet should fail"))?;
    assert!(matches!(error, InlineError::Network { .. }));
    Ok(())
}

#[test]
fn duplicate_links_are_fetched_once() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(Settings::default(), &fetcher)?;
    let html = "<html><head>\
        <link rel=\"stylesheet\" href=\"https://example.com/red.css\">\
        <link rel=\"stylesheet\" href=\"https://example.com/red.css\">\
        </head><body><h1>Hi</h1></body></html>";
    inline(html, &config)?;
    assert_eq!(fetcher.requests(), 1);
    Ok(())
}

#[test]
fn cache_is_shared_between_calls() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(
        Settings {
            cache_size: 2,
            ..Settings::default()
        },
        &fetcher,
    )?;
    let html = linked("https://example.com/red.css");
    let first = inline(&html, &config)?;
    let second = inline(&html, &config)?;
    assert_eq!(first, second);
    assert_eq!(fetcher.requests(), 1);
    assert_eq!(config.cache().len(), 1);

    config.clear_cache();
    inline(&html, &config)?;
    assert_eq!(fetcher.requests(), 2);
    Ok(())
}

#[test]
fn disabled_cache_refetches() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(Settings::default(), &fetcher)?;
    let html = linked("https://example.com/red.css");
    inline(&html, &config)?;
    inline(&html, &config)?;
    assert_eq!(fetcher.requests(), 2);
    assert!(config.cache().is_empty());
    Ok(())
}

#[test]
fn cache_evicts_least_recently_used() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher::default());
    let config = mock_config(
        Settings {
            cache_size: 1,
            ..Settings::default()
        },
        &fetcher,
    )?;
    inline(&linked("https://example.com/red.css"), &config)?;
    inline(&linked("https://example.com/blue.css"), &config)?;
    inline(&linked("https://example.com/red.css"), &config)?;
    assert_eq!(fetcher.requests(), 3);
    assert!(config.cache().contains(&Url::parse("https://example.com/red.css")?));
    assert!(!config.cache().contains(&Url::parse("https://example.com/blue.css")?));
    Ok(())
}

#[test]
fn concurrent_calls_fetch_once() -> Result<()> {
    let fetcher = Arc::new(CountingFetcher {
        requests: AtomicUsize::new(0),
        delay: Duration::from_millis(50),
    });
    let config = mock_config(
        Settings {
            cache_size: 4,
            ..Settings::default()
        },
        &fetcher,
    )?;
    let html = linked("https://example.com/red.css");
    let outputs = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| inline(&html, &config)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("inlining thread panicked"))?
                    .map_err(anyhow::Error::from)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    assert_eq!(outputs.len(), 8);
    assert!(outputs.iter().all(|output| output.contains("color: red;")));
    assert_eq!(fetcher.requests(), 1);
    Ok(())
}

#[test]
fn reads_file_stylesheets() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("style.css"), "h1 { color: purple; margin: 0 }")?;
    let base = Url::from_directory_path(dir.path())
        .map_err(|()| anyhow!("temporary directory is not absolute"))?;
    let config = InlineConfig::new(Settings {
        base_url: Some(base.to_string()),
        ..Settings::default()
    })?;
    let output = inline(&linked("style.css"), &config)?;
    assert!(output.contains("<h1 style=\"color: purple;margin: 0;\">"));

    let error = inline(&linked("absent.css"), &config)
        .err()
        .ok_or_else(|| anyhow!("missing file should fail"))?;
    assert!(matches!(error, InlineError::MissingStylesheet { .. }));
    Ok(())
}
