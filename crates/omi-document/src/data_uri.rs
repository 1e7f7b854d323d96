//! Embedded `data:` URIs

use crate::error::{DocumentError, DocumentResult};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Whether `uri` carries its payload inline
#[inline]
#[must_use]
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Payload of a `data:<mime>;base64,<payload>` URI
///
/// Returns `None` for any other URI, so callers can fall back to external
/// resolution.
#[must_use]
pub fn decode(uri: &str) -> Option<DocumentResult<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(DocumentError::InvalidDataUri(
            "missing ',' separator".to_string(),
        )));
    };
    if !header.ends_with(";base64") {
        return Some(Err(DocumentError::InvalidDataUri(format!(
            "unsupported encoding in '{header}'"
        ))));
    }
    Some(
        STANDARD
            .decode(payload)
            .map_err(|e| DocumentError::InvalidDataUri(e.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_payload() {
        let bytes = decode("data:audio/mpeg;base64,SUQz").unwrap().unwrap();
        assert_eq!(bytes, b"ID3");
    }

    #[test]
    fn other_uris_are_not_data() {
        assert!(decode("scene.bin").is_none());
        assert!(!is_data_uri("https://example.com/a.mp3"));
        assert!(is_data_uri("data:,"));
    }

    #[test]
    fn percent_encoded_payload_rejected() {
        assert!(matches!(
            decode("data:text/plain,hello"),
            Some(Err(DocumentError::InvalidDataUri(_)))
        ));
        assert!(matches!(
            decode("data:application/octet-stream;base64"),
            Some(Err(DocumentError::InvalidDataUri(_)))
        ));
    }
}
