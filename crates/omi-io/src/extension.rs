//! Extension hooks and the phase pipelines that drive them
//!
//! Reading and writing each run a fixed, ordered list of phases. Every phase
//! completes for all registered extensions before the next phase starts:
//!
//! - Read: `Preread(Buffer) → Preread(Scene) → Preread(Node) →
//!   Preread(Material) → Decode`
//! - Write: `Strip → Prewrite(Buffer) → Layout → Encode → ExtensionsUsed`
//!
//! `Prewrite` only runs for the combined-binary layout.

use crate::asset::Asset;
use crate::error::IoResult;
use crate::io::WriteOptions;
use indexmap::IndexMap;
use omi_document::{BufferLayout, ChunkId, Document, EntityKind, OutputFormat};
use omi_property::{PropertyGraph, PropertyId};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// One step of the read pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// Raw JSON fix-ups for one entity kind, before any typed decode
    Preread(EntityKind),
    /// Typed decode into the property graph
    Decode,
}

impl ReadPhase {
    /// Phases in execution order
    pub const PIPELINE: [ReadPhase; 5] = [
        ReadPhase::Preread(EntityKind::Buffer),
        ReadPhase::Preread(EntityKind::Scene),
        ReadPhase::Preread(EntityKind::Node),
        ReadPhase::Preread(EntityKind::Material),
        ReadPhase::Decode,
    ];
}

impl fmt::Display for ReadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPhase::Preread(kind) => write!(f, "preread({kind})"),
            ReadPhase::Decode => f.write_str("decode"),
        }
    }
}

/// One step of the write pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// Remove every registered extension's blocks from the output JSON
    Strip,
    /// Chunk registration for one entity kind
    Prewrite(EntityKind),
    /// Host buffer layout
    Layout,
    /// Typed encode back into JSON
    Encode,
    /// Rebuild `extensionsUsed`
    ExtensionsUsed,
}

impl WritePhase {
    /// Phases in execution order
    pub const PIPELINE: [WritePhase; 5] = [
        WritePhase::Strip,
        WritePhase::Prewrite(EntityKind::Buffer),
        WritePhase::Layout,
        WritePhase::Encode,
        WritePhase::ExtensionsUsed,
    ];

    /// Whether the phase runs for `format`
    #[must_use]
    pub fn applies_to(self, format: OutputFormat) -> bool {
        !matches!(self, WritePhase::Prewrite(_)) || format == OutputFormat::Glb
    }
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritePhase::Strip => f.write_str("strip"),
            WritePhase::Prewrite(kind) => write!(f, "prewrite({kind})"),
            WritePhase::Layout => f.write_str("layout"),
            WritePhase::Encode => f.write_str("encode"),
            WritePhase::ExtensionsUsed => f.write_str("extensions-used"),
        }
    }
}

/// State shared by all extensions while reading
#[derive(Debug)]
pub struct ReadContext<'a> {
    /// Document being read; prereads may rewrite its JSON
    pub document: &'a mut Document,
    /// Graph receiving decoded properties
    pub graph: &'a mut PropertyGraph,
}

/// State shared by all extensions while writing
///
/// Entities keep their indices in the output, so an [`omi_document::EntityId`]
/// from the graph addresses the same entity in `output`.
pub struct WriteContext<'a> {
    /// Source asset, read-only
    pub asset: &'a Asset,
    /// Output document, a copy of the source document
    pub output: Document,
    /// Write options
    pub options: &'a WriteOptions,
    /// Chunks registered during prewrite
    pub layout: BufferLayout,
    /// Chunk registered for each payload-holding property
    pub chunks: IndexMap<PropertyId, ChunkId>,
    /// Extra resources written next to the output
    pub resources: IndexMap<String, Arc<[u8]>>,
}

impl Debug for WriteContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("options", self.options)
            .field("chunks", &self.chunks.len())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'a> WriteContext<'a> {
    /// Create context writing a copy of `asset.document`
    #[must_use]
    pub fn new(asset: &'a Asset, options: &'a WriteOptions) -> Self {
        Self {
            asset,
            output: asset.document.clone(),
            options,
            layout: BufferLayout::new(),
            chunks: IndexMap::new(),
            resources: IndexMap::new(),
        }
    }

    /// Property graph being written
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'a PropertyGraph {
        &self.asset.properties
    }
}

/// glTF extension with two-phase read and write hooks
///
/// Hooks default to no-ops so an extension only implements the phases it
/// takes part in.
pub trait Extension: Debug + Send + Sync {
    /// Extension name as it appears in `extensionsUsed`
    fn name(&self) -> &'static str;

    /// Entity kinds this extension prereads
    fn preread_kinds(&self) -> &'static [EntityKind] {
        &[]
    }

    /// Inspect or rewrite raw JSON of one entity kind before decode
    ///
    /// # Errors
    /// Returns error if the raw JSON cannot be processed
    fn preread(&self, _ctx: &mut ReadContext<'_>, _kind: EntityKind) -> IoResult<()> {
        Ok(())
    }

    /// Decode raw blocks into properties
    ///
    /// # Errors
    /// Returns error on fatal decode failures
    fn read(&self, ctx: &mut ReadContext<'_>) -> IoResult<()>;

    /// Entity kinds this extension prewrites
    fn prewrite_kinds(&self) -> &'static [EntityKind] {
        &[]
    }

    /// Register chunks ahead of the buffer layout
    ///
    /// # Errors
    /// Returns error if a payload cannot be registered
    fn prewrite(&self, _ctx: &mut WriteContext<'_>, _kind: EntityKind) -> IoResult<()> {
        Ok(())
    }

    /// Encode properties into the output JSON
    ///
    /// Returns whether at least one block was emitted.
    ///
    /// # Errors
    /// Returns error if the graph violates an invariant of the extension
    fn write(&self, ctx: &mut WriteContext<'_>) -> IoResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_pipeline_prereads_before_decode() {
        let phases = ReadPhase::PIPELINE;
        assert_eq!(phases.last(), Some(&ReadPhase::Decode));
        let nodes = phases
            .iter()
            .position(|p| *p == ReadPhase::Preread(EntityKind::Node));
        let scenes = phases
            .iter()
            .position(|p| *p == ReadPhase::Preread(EntityKind::Scene));
        assert!(scenes < nodes);
    }

    #[test]
    fn prewrite_only_for_glb() {
        let phase = WritePhase::Prewrite(EntityKind::Buffer);
        assert!(phase.applies_to(OutputFormat::Glb));
        assert!(!phase.applies_to(OutputFormat::Gltf));
        assert!(WritePhase::Encode.applies_to(OutputFormat::Gltf));
    }

    #[test]
    fn phase_display() {
        assert_eq!(ReadPhase::Preread(EntityKind::Node).to_string(), "preread(node)");
        assert_eq!(WritePhase::ExtensionsUsed.to_string(), "extensions-used");
    }
}
