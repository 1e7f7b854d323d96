//! Audio payload fetching
//!
//! - [`FileFetcher`]: local paths and `file://` URLs
//! - [`HttpFetcher`]: `http://` and `https://` through `reqwest`
//! - [`DefaultFetcher`]: dispatches by scheme to one of the above

use crate::config::TransformConfig;
use crate::error::FetchError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retrieves the bytes behind an `audio.src` locator
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the full payload
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// Locator after scheme detection
#[derive(Debug, Clone, PartialEq, Eq)]
enum Locator<'a> {
    Http(&'a str),
    File(&'a str),
}

fn classify(locator: &str) -> Result<Locator<'_>, FetchError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidLocator(locator.to_string()));
    }
    if let Some(path) = trimmed.strip_prefix("file://") {
        return Ok(Locator::File(path));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(Locator::Http(trimmed));
    }
    match trimmed.split_once(':') {
        // Single letters are Windows drive prefixes.
        Some((scheme, _)) if scheme.len() > 1 && is_scheme(scheme) => {
            Err(FetchError::UnsupportedScheme(trimmed.to_string()))
        }
        _ => Ok(Locator::File(trimmed)),
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Reads payloads from the local filesystem
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base_dir: PathBuf,
}

impl FileFetcher {
    /// Create a fetcher resolving relative paths against `base_dir`
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory for relative paths
    #[inline]
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem path of a local locator
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    async fn read(&self, locator: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        let resolved = self.resolve(path);
        tracing::debug!("reading {}", resolved.display());
        tokio::fs::read(&resolved).await.map_err(|source| FetchError::Io {
            locator: locator.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for FileFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        match classify(locator)? {
            Locator::File(path) => self.read(locator, path).await,
            Locator::Http(url) => Err(FetchError::UnsupportedScheme(url.to_string())),
        }
    }
}

/// Downloads payloads over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create with a per-request timeout
    ///
    /// # Errors
    /// Returns `FetchError::Client` if the TLS backend cannot be initialised
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |e: reqwest::Error| FetchError::Request {
            locator: url.to_string(),
            message: e.to_string(),
        };

        tracing::debug!("downloading {}", url);
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                locator: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        match classify(locator)? {
            Locator::Http(url) => self.download(url).await,
            Locator::File(_) => Err(FetchError::UnsupportedScheme(locator.to_string())),
        }
    }
}

/// Files relative to the input document, plus HTTP(S)
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    file: FileFetcher,
    http: HttpFetcher,
}

impl DefaultFetcher {
    /// Create for a document located in `base_dir`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_dir: impl Into<PathBuf>, config: &TransformConfig) -> Result<Self, FetchError> {
        Ok(Self {
            file: FileFetcher::new(base_dir),
            http: HttpFetcher::new(config.http_timeout())?,
        })
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for DefaultFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        match classify(locator)? {
            Locator::File(path) => self.file.read(locator, path).await,
            Locator::Http(url) => self.http.download(url).await,
        }
    }
}
