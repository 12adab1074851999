//! Byte fetchers: where tile payloads come from.

use crate::{Result, TileError};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Reads the bytes behind a resolved tile URL.
///
/// Implementations block the calling thread. Retry policy, if any, belongs
/// here rather than in the tile set.
pub trait ByteFetcher: Send + Sync {
    /// Fetch the complete payload at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches `http://` and `https://` URLs with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reliefmap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ByteFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        trace!(url, "HTTP GET");
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(TileError::FetchFailure {
                key: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let bytes = response.bytes()?;
        debug!(url, bytes = bytes.len(), "Downloaded tile");
        Ok(bytes.to_vec())
    }
}

/// Reads `file://` URLs and plain paths from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl ByteFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        trace!(path, "Reading tile file");
        Ok(fs::read(Path::new(path))?)
    }
}

/// Dispatches on the URL scheme: HTTP(S) to an [`HttpFetcher`], `file://`
/// and scheme-less paths to a [`FileFetcher`].
#[derive(Debug, Clone)]
pub struct SchemeFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SchemeFetcher {
    /// Create a dispatcher with the given HTTP timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            file: FileFetcher,
        })
    }
}

impl ByteFetcher for SchemeFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match url.split_once("://").map(|(scheme, _)| scheme) {
            Some("http" | "https") => self.http.fetch(url),
            Some("file") | None => self.file.fetch(url),
            Some(_) => Err(TileError::UnsupportedScheme(url.to_string())),
        }
    }
}
