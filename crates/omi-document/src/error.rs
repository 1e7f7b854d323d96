//! Error types for the host document

use crate::entity::EntityId;

/// Errors raised while loading, inspecting or laying out a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// GLB container framing is broken
    #[error("invalid GLB container: {0}")]
    InvalidGlb(String),

    /// GLB container version other than 2
    #[error("unsupported GLB version: {0}")]
    UnsupportedVersion(u32),

    /// JSON chunk could not be parsed or serialized
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document root is not a JSON object
    #[error("document root must be a JSON object")]
    NotAnObject,

    /// Entity definition is not a JSON object
    #[error("definition of {0} is not a JSON object")]
    InvalidEntity(EntityId),

    /// Entity index does not exist in the document
    #[error("no such entity: {0}")]
    MissingEntity(EntityId),

    /// External resource referenced by URI was not provided
    #[error("missing external resource: {0}")]
    MissingResource(String),

    /// `data:` URI that is not base64 or does not decode
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Buffer bytes unavailable
    #[error("buffer {0} has no data")]
    MissingBuffer(usize),

    /// Buffer view definition is missing or malformed
    #[error("invalid bufferView {0}")]
    InvalidBufferView(usize),

    /// Buffer view range falls outside its buffer
    #[error("bufferView {view} range {offset}..{end} exceeds buffer length {len}")]
    BufferViewOutOfRange {
        view: usize,
        offset: usize,
        end: usize,
        len: usize,
    },
}

impl DocumentError {
    /// Create GLB framing error
    pub fn invalid_glb(message: impl Into<String>) -> Self {
        Self::InvalidGlb(message.into())
    }
}

/// Result alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
