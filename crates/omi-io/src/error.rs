//! Error types for the read/write pipeline

use omi_document::DocumentError;
use omi_property::{PropertyError, PropertyId};

/// Read/write pipeline error
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Host document failure (container, JSON, buffer views)
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Property graph integrity failure
    #[error("property error: {0}")]
    Property(#[from] PropertyError),

    /// JSON (de)serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Extension block does not match its wire format
    #[error("invalid {extension} block: {message}")]
    InvalidExtension {
        /// Extension name
        extension: &'static str,
        /// What was wrong
        message: String,
    },

    /// External resource referenced by URI was not provided
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// Payload chunk was not given a bufferView by the layout pass
    #[error("no buffer view assigned for {0}")]
    UnassignedChunk(PropertyId),
}

impl IoError {
    /// Create invalid-extension error
    pub fn invalid(extension: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidExtension {
            extension,
            message: message.into(),
        }
    }
}

/// Result alias for the pipeline
pub type IoResult<T> = Result<T, IoError>;
