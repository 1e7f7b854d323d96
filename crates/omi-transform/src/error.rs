//! Error types for the migration
//!
//! - [`FetchError`]: one payload could not be retrieved
//! - [`ConfigError`]: configuration could not be loaded
//! - [`TransformError`]: top-level failure of a run

use crate::report::{MigrationReport, NodeFailure};
use omi_document::EntityId;
use omi_property::PropertyError;
use std::path::PathBuf;

/// Payload retrieval errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Empty or unparseable locator
    #[error("invalid locator: '{0}'")]
    InvalidLocator(String),

    /// Scheme not handled by this fetcher
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Local file could not be read
    #[error("failed to read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// Server answered with a non-success status
    #[error("{locator} returned HTTP {status}")]
    Http { locator: String, status: u16 },

    /// Request failed before a status was received
    #[error("request to {locator} failed: {message}")]
    Request { locator: String, message: String },

    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or unknown value
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level migration errors
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A payload fetch failed; nothing was committed
    #[error("failed to fetch audio for {node} from {locator}: {source}")]
    ResourceFetch {
        node: EntityId,
        locator: String,
        #[source]
        source: FetchError,
    },

    /// Some nodes were committed, others failed to fetch
    #[error("{} nodes failed to migrate ({} migrated)", .failures.len(), .report.migrated.len())]
    PartialMigration {
        report: MigrationReport,
        failures: Vec<NodeFailure>,
    },

    /// Global emitters need a scene and the document has none
    #[error("document has no default scene for global audio emitters")]
    MissingDefaultScene,

    /// Property graph integrity failure
    #[error("property error: {0}")]
    Property(#[from] PropertyError),

    /// Configuration failure
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for migration runs
pub type TransformResult<T> = Result<T, TransformError>;
