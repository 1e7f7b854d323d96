//! Output layout and chunk registration
//!
//! Writers register extra binary chunks before the buffer layout is computed,
//! then look up the bufferView each chunk was assigned. The layout keeps all
//! existing bytes at their offsets and appends chunks after them. A payload
//! that already sits in an existing bufferView can be registered as reused
//! instead, so rewriting a document does not append it a second time.

use crate::document::Document;
use crate::entity::{EntityId, EntityKind};
use crate::error::{DocumentError, DocumentResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Physical output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single `.glb` file; payloads embedded in one shared buffer
    #[default]
    Glb,
    /// `.gltf` JSON with each payload written as a sibling resource
    Gltf,
}

impl OutputFormat {
    /// Pick the format from a file extension (`glb` / `gltf`)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" => Some(Self::Glb),
            "gltf" => Some(Self::Gltf),
            _ => None,
        }
    }

    /// File extension without the dot
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Gltf => "gltf",
        }
    }
}

/// Pad `bytes` with `fill` up to the next multiple of four
fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    bytes.resize(bytes.len().next_multiple_of(4), fill);
}

/// Handle returned by [`BufferLayout::register_chunk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(usize);

#[derive(Debug, Clone)]
enum PendingChunk {
    Append {
        buffer: usize,
        data: Arc<[u8]>,
        view: Option<usize>,
    },
    Reuse(usize),
}

impl PendingChunk {
    fn view(&self) -> Option<usize> {
        match self {
            Self::Append { view, .. } => *view,
            Self::Reuse(view) => Some(*view),
        }
    }
}

/// Chunks registered for the next layout pass
#[derive(Debug, Clone, Default)]
pub struct BufferLayout {
    chunks: Vec<PendingChunk>,
    applied: bool,
}

impl BufferLayout {
    /// Create empty layout
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` to be appended to `buffer`
    pub fn register_chunk(&mut self, buffer: usize, data: Arc<[u8]>) -> ChunkId {
        self.chunks.push(PendingChunk::Append {
            buffer,
            data,
            view: None,
        });
        ChunkId(self.chunks.len() - 1)
    }

    /// Register a payload already stored in `bufferViews[view]`
    ///
    /// Nothing is appended; the chunk resolves to `view` as is.
    pub fn reuse_view(&mut self, view: usize) -> ChunkId {
        self.chunks.push(PendingChunk::Reuse(view));
        ChunkId(self.chunks.len() - 1)
    }

    /// Number of registered chunks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks were registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether [`BufferLayout::apply`] has run
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// bufferView assigned to a chunk, once the layout has been applied
    #[must_use]
    pub fn buffer_view(&self, chunk: ChunkId) -> Option<usize> {
        self.chunks.get(chunk.0).and_then(PendingChunk::view)
    }

    /// Append all registered chunks to their buffers
    ///
    /// Each appended chunk starts on a 4-byte boundary and gets a new
    /// bufferView. When the document has no buffers and a chunk targets
    /// buffer 0, the buffer is created. Reused views are left untouched.
    ///
    /// # Errors
    /// Returns `MissingEntity` if a chunk targets a buffer that does not exist
    pub fn apply(&mut self, document: &mut Document) -> DocumentResult<()> {
        let appended = self
            .chunks
            .iter()
            .filter(|c| matches!(c, PendingChunk::Append { .. }))
            .count();
        if appended > 0 && document.entity_count(EntityKind::Buffer) == 0 {
            document.push_entity(EntityKind::Buffer, Map::new());
        }

        for chunk in &mut self.chunks {
            let PendingChunk::Append { buffer, data, view } = chunk else {
                continue;
            };
            let id = EntityId::buffer(*buffer);
            let mut bytes = document
                .buffer(*buffer)
                .ok_or(DocumentError::MissingEntity(id))?
                .to_vec();
            pad_to_four(&mut bytes, 0);
            let offset = bytes.len();
            bytes.extend_from_slice(&**data);
            document.set_buffer(*buffer, bytes)?;

            let views = document
                .json_mut()
                .entry("bufferViews")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(views) = views {
                views.push(json!({
                    "buffer": *buffer,
                    "byteOffset": offset,
                    "byteLength": data.len(),
                }));
                *view = Some(views.len() - 1);
            }
        }

        tracing::debug!(
            appended,
            reused = self.chunks.len() - appended,
            "buffer layout applied"
        );
        self.applied = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(OutputFormat::from_extension("glb"), Some(OutputFormat::Glb));
        assert_eq!(OutputFormat::from_extension("GLTF"), Some(OutputFormat::Gltf));
        assert_eq!(OutputFormat::from_extension("obj"), None);
        assert_eq!(OutputFormat::Gltf.extension(), "gltf");
    }

    #[test]
    fn apply_creates_buffer_when_missing() {
        let mut doc = Document::new();
        let mut layout = BufferLayout::new();
        let chunk = layout.register_chunk(0, Arc::from(vec![1u8, 2, 3]));

        assert_eq!(layout.buffer_view(chunk), None);
        layout.apply(&mut doc).unwrap();

        assert_eq!(layout.buffer_view(chunk), Some(0));
        assert_eq!(doc.buffer(0).unwrap(), &[1, 2, 3]);
        assert_eq!(doc.buffer_view_bytes(0).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn apply_appends_aligned_after_existing_data() {
        let mut doc = Document::from_parts(
            json!({
                "asset": {"version": "2.0"},
                "buffers": [{"byteLength": 5}],
                "bufferViews": [{"buffer": 0, "byteLength": 5}]
            }),
            vec![vec![9; 5]],
        )
        .unwrap();

        let mut layout = BufferLayout::new();
        let a = layout.register_chunk(0, Arc::from(vec![1u8; 3]));
        let b = layout.register_chunk(0, Arc::from(vec![2u8; 4]));
        layout.apply(&mut doc).unwrap();

        assert_eq!(layout.buffer_view(a), Some(1));
        assert_eq!(layout.buffer_view(b), Some(2));

        let views = doc.json()["bufferViews"].as_array().unwrap();
        assert_eq!(views[1]["byteOffset"], 8);
        assert_eq!(views[2]["byteOffset"], 12);
        assert_eq!(views[2]["byteLength"], 4);
        assert_eq!(doc.json()["buffers"][0]["byteLength"], 16);

        // Original view untouched.
        assert_eq!(doc.buffer_view_bytes(0).unwrap(), &[9; 5]);
        assert_eq!(doc.buffer_view_bytes(2).unwrap(), &[2; 4]);
    }

    #[test]
    fn reused_view_appends_nothing() {
        let mut doc = Document::from_parts(
            json!({
                "asset": {"version": "2.0"},
                "buffers": [{"byteLength": 4}],
                "bufferViews": [{"buffer": 0, "byteLength": 4}]
            }),
            vec![vec![5; 4]],
        )
        .unwrap();

        let mut layout = BufferLayout::new();
        let reused = layout.reuse_view(0);
        let appended = layout.register_chunk(0, Arc::from(vec![6u8; 2]));
        assert_eq!(layout.buffer_view(reused), Some(0));
        layout.apply(&mut doc).unwrap();

        assert_eq!(layout.buffer_view(reused), Some(0));
        assert_eq!(layout.buffer_view(appended), Some(1));
        assert_eq!(doc.buffer(0).unwrap().len(), 6);
        assert_eq!(doc.json()["bufferViews"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn reuse_only_layout_creates_no_buffer() {
        let mut doc = Document::new();
        let mut layout = BufferLayout::new();
        layout.reuse_view(0);
        layout.apply(&mut doc).unwrap();
        assert_eq!(doc.entity_count(EntityKind::Buffer), 0);
        assert!(layout.is_applied());
    }

    #[test]
    fn apply_rejects_unknown_buffer() {
        let mut doc = Document::new();
        let mut layout = BufferLayout::new();
        layout.register_chunk(3, Arc::from(vec![0u8]));
        assert!(matches!(
            layout.apply(&mut doc),
            Err(DocumentError::MissingEntity(_))
        ));
    }
}
