//! Loading linked stylesheets.

use crate::error::{BoxError, InlineError, Result};
use core::time::Duration;
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use std::fs;
use std::io::ErrorKind;
use url::Url;

/// Source of stylesheet text for absolute URLs.
///
/// Implementations are shared between threads through [`InlineConfig`](crate::InlineConfig).
pub trait StylesheetFetcher: Send + Sync {
    /// Return the CSS text stored at `url`.
    ///
    /// # Errors
    /// Any transport, status or decoding failure.
    fn fetch(&self, url: &Url) -> Result<String>;
}

/// Fetches over HTTP(S) with a blocking `reqwest` client and reads `file:` URLs from disk.
pub struct DefaultFetcher {
    timeout: Duration,
    client: OnceCell<Client>,
}

impl DefaultFetcher {
    /// The HTTP client is built on first use.
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: OnceCell::new(),
        }
    }

    fn client(&self, url: &Url) -> Result<&Client> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|err| network_error(url, err))
        })
    }

    fn fetch_http(&self, url: &Url) -> Result<String> {
        log::debug!("fetching stylesheet {url}");
        let response = self
            .client(url)?
            .get(url.clone())
            .send()
            .map_err(|err| network_error(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(network_error(url, format!("server responded with {status}")));
        }
        let body = response.bytes().map_err(|err| network_error(url, err))?;
        String::from_utf8(body.to_vec())
            .map_err(|_| InlineError::MalformedCss(format!("Stylesheet {url} is not valid UTF-8")))
    }
}

impl StylesheetFetcher for DefaultFetcher {
    fn fetch(&self, url: &Url) -> Result<String> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "file" => read_file(url),
            other => Err(network_error(url, format!("unsupported URL scheme `{other}`"))),
        }
    }
}

fn read_file(url: &Url) -> Result<String> {
    let path = url
        .to_file_path()
        .map_err(|()| network_error(url, "not a local file path"))?;
    let bytes = fs::read(&path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => InlineError::MissingStylesheet {
            path: path.display().to_string(),
        },
        _ => network_error(url, err),
    })?;
    String::from_utf8(bytes).map_err(|_| {
        InlineError::MalformedCss(format!("Stylesheet {} is not valid UTF-8", path.display()))
    })
}

fn network_error(url: &Url, source: impl Into<BoxError>) -> InlineError {
    let error = InlineError::Network {
        location: url.to_string(),
        source: source.into(),
    };
    log::warn!("{error}");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::error::Error;
    use std::io::Write as _;

    #[test]
    fn reads_file_urls() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"p { color: red }")?;
        let url = Url::from_file_path(file.path()).map_err(|()| "temp path is not absolute")?;
        let fetcher = DefaultFetcher::new(Duration::from_secs(1));
        assert_eq!(fetcher.fetch(&url)?, "p { color: red }");
        Ok(())
    }

    #[test]
    fn missing_file_is_reported() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let url = Url::from_file_path(dir.path().join("absent.css"))
            .map_err(|()| "temp path is not absolute")?;
        let error = DefaultFetcher::new(Duration::from_secs(1)).fetch(&url).err();
        assert!(matches!(error, Some(InlineError::MissingStylesheet { .. })));
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_a_network_error() -> Result<(), Box<dyn Error>> {
        let url = Url::parse("ftp://example.com/style.css")?;
        let error = DefaultFetcher::new(Duration::from_secs(1)).fetch(&url).err();
        assert!(matches!(error, Some(InlineError::Network { .. })));
        Ok(())
    }
}
