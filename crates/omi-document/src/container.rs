//! GLB binary container
//!
//! Framing (header, chunk headers, padding) is done by
//! [`gltf::binary::Glb`]. This module hands the JSON chunk to `serde_json`
//! and the BIN chunk to the document.

use crate::error::{DocumentError, DocumentResult};
use gltf::binary::{Glb, Header};
use serde_json::Value;
use std::borrow::Cow;

/// Decoded GLB chunks
#[derive(Debug, Clone, PartialEq)]
pub struct GlbChunks {
    /// Parsed JSON chunk
    pub json: Value,
    /// BIN chunk payload, padding included
    pub bin: Option<Vec<u8>>,
}

fn framing_error(err: gltf::Error) -> DocumentError {
    match err {
        gltf::Error::Binary(gltf::binary::Error::Version(version)) => {
            DocumentError::UnsupportedVersion(version)
        }
        other => DocumentError::invalid_glb(other.to_string()),
    }
}

/// Parse a GLB container
///
/// # Errors
/// - `InvalidGlb` on bad magic, truncated data or a missing JSON chunk
/// - `UnsupportedVersion` for containers other than version 2
/// - `Json` if the JSON chunk does not parse
pub fn decode(bytes: &[u8]) -> DocumentResult<GlbChunks> {
    let glb = Glb::from_slice(bytes).map_err(framing_error)?;
    let json = serde_json::from_slice(&glb.json)?;
    Ok(GlbChunks {
        json,
        bin: glb.bin.map(Cow::into_owned),
    })
}

/// Build a GLB container
///
/// # Errors
/// Returns error if JSON serialization fails or the result exceeds 4 GiB
pub fn encode(json: &Value, bin: Option<&[u8]>) -> DocumentResult<Vec<u8>> {
    let json = serde_json::to_vec(json)?;
    let glb = Glb {
        header: Header {
            magic: *b"glTF",
            version: 2,
            length: container_length(json.len(), bin.map(<[u8]>::len))?,
        },
        json: Cow::Owned(json),
        bin: bin.map(Cow::Borrowed),
    };
    glb.to_vec()
        .map_err(|err| DocumentError::invalid_glb(err.to_string()))
}

/// Total container length: header plus padded chunks
fn container_length(json: usize, bin: Option<usize>) -> DocumentResult<u32> {
    let chunk = |len: usize| 8 + len.next_multiple_of(4);
    let total = 12 + chunk(json) + bin.map_or(0, chunk);
    u32::try_from(total).map_err(|_| DocumentError::invalid_glb("container exceeds 4 GiB"))
}
