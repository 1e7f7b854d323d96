//! `OMI_audio_emitter` extension
//!
//! # Wire layout
//! - Document level: `audioSources` and `audioEmitters` arrays
//! - Node: `{"audioEmitter": i}`, the node's positional emitter
//! - Scene: `{"audioEmitters": [i, ...]}`, the scene's global emitters
//!
//! # Write
//! Sources are written in creation order. Under the combined-binary layout
//! each payload is registered as a chunk on buffer 0 during prewrite and
//! referenced by bufferView; a source whose original bufferView still holds
//! its bytes keeps that view. Under the separated layout each payload becomes
//! a resource named `<basename>_audio<N>.mp3`, percent-encoded as a URI.

mod properties;
mod wire;

pub use properties::{
    AudioEmitter, AudioSource, DistanceModel, EmitterScope, PositionalParams, SceneEmitterList,
    UnknownDistanceModel, AUDIO_MPEG, EMITTERS_SLOT, SOURCE_SLOT,
};

use crate::error::{IoError, IoResult};
use crate::extension::{Extension, ReadContext, WriteContext};
use indexmap::IndexMap;
use omi_document::{data_uri, EntityId, EntityKind, OutputFormat};
use omi_property::{PropertyError, PropertyGraph, PropertyId, PropertyResult};
use serde_json::Value;
use std::sync::Arc;
use wire::{AudioEmitterDef, AudioSourceDef, NodeDef, RootDef, SceneDef};

/// Extension name
pub const OMI_AUDIO_EMITTER: &str = "OMI_audio_emitter";

/// Reader/writer for `OMI_audio_emitter`
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioEmitterExtension;

impl AudioEmitterExtension {
    /// Create extension
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Scene list of `scene`, created and attached on first use
///
/// # Errors
/// Returns error if the list cannot be attached to `scene`
pub fn scene_emitter_list(graph: &mut PropertyGraph, scene: EntityId) -> PropertyResult<PropertyId> {
    if let Some(id) = graph.attachment(scene, OMI_AUDIO_EMITTER) {
        if graph.get::<SceneEmitterList>(id).is_some() {
            return Ok(id);
        }
    }
    let id = graph.create(SceneEmitterList);
    graph.attach(scene, id)?;
    Ok(id)
}

/// Check the placement invariants of every emitter and source
///
/// - Every emitter owns exactly one source
/// - Every source is owned by an emitter
/// - A positional emitter is attached to exactly one node and listed nowhere
/// - A global emitter is listed by exactly one scene list and attached nowhere
///
/// # Errors
/// Returns `ParentCardinality` for the first violation found
pub fn validate(graph: &PropertyGraph) -> PropertyResult<()> {
    for id in graph.list_by_type(AudioSource::PROPERTY_TYPE) {
        if graph.owner_of(id).is_none() {
            return Err(PropertyError::cardinality(id, AudioSource::PROPERTY_TYPE, "source has no owner"));
        }
    }

    for id in graph.list_by_type(AudioEmitter::PROPERTY_TYPE) {
        let Some(emitter) = graph.get::<AudioEmitter>(id) else {
            continue;
        };
        let fail = |reason: String| PropertyError::cardinality(id, AudioEmitter::PROPERTY_TYPE, reason);

        if graph.reference(id, SOURCE_SLOT).is_none() {
            return Err(fail("emitter has no source".to_string()));
        }

        let nodes = graph.attachments_of(id);
        let lists = graph
            .weak_referrers_of(id)
            .into_iter()
            .filter(|(holder, slot)| {
                *slot == EMITTERS_SLOT && graph.get::<SceneEmitterList>(*holder).is_some()
            })
            .count();

        match emitter.scope {
            EmitterScope::Positional(_) if nodes.len() != 1 || lists != 0 => {
                return Err(fail(format!(
                    "positional emitter on {} nodes and {} scene lists",
                    nodes.len(),
                    lists
                )));
            }
            EmitterScope::Global if !nodes.is_empty() || lists != 1 => {
                return Err(fail(format!(
                    "global emitter on {} nodes and {} scene lists",
                    nodes.len(),
                    lists
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn index_in(len: usize, index: usize, what: &str) -> IoResult<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(IoError::invalid(
            OMI_AUDIO_EMITTER,
            format!("{what} index {index} out of range ({len})"),
        ))
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value, what: &str) -> IoResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| IoError::invalid(OMI_AUDIO_EMITTER, format!("{what}: {e}")))
}

impl AudioEmitterExtension {
    fn read_sources(ctx: &mut ReadContext<'_>, defs: &[AudioSourceDef]) -> IoResult<Vec<AudioSource>> {
        let mut sources = Vec::with_capacity(defs.len());
        for def in defs {
            if let Some(view) = def.buffer_view {
                let data: Arc<[u8]> = Arc::from(ctx.document.buffer_view_bytes(view)?);
                sources.push(
                    AudioSource::new(data)
                        .with_mime_type(def.mime_type.clone())
                        .with_buffer_view(view),
                );
                continue;
            }
            let data: Arc<[u8]> = match &def.uri {
                Some(uri) => match data_uri::decode(uri) {
                    Some(decoded) => Arc::from(decoded?),
                    None => ctx
                        .document
                        .take_resource(uri)
                        .ok_or_else(|| IoError::MissingResource(uri.clone()))?,
                },
                None => {
                    return Err(IoError::invalid(
                        OMI_AUDIO_EMITTER,
                        "audio source has neither bufferView nor uri",
                    ))
                }
            };
            sources.push(AudioSource::new(data).with_mime_type(def.mime_type.clone()));
        }
        Ok(sources)
    }
}

impl Extension for AudioEmitterExtension {
    fn name(&self) -> &'static str {
        OMI_AUDIO_EMITTER
    }

    fn read(&self, ctx: &mut ReadContext<'_>) -> IoResult<()> {
        let Some(root) = ctx.document.root_extension(OMI_AUDIO_EMITTER) else {
            return Ok(());
        };
        let root: RootDef = parse(root, "document block")?;
        let sources = Self::read_sources(ctx, &root.audio_sources)?;

        let mut emitters = Vec::with_capacity(root.audio_emitters.len());
        for def in &root.audio_emitters {
            let source = sources[index_in(sources.len(), def.source, "source")?].clone();
            let emitter = ctx.graph.create(def.to_emitter());
            // Each emitter owns its own source; shared indices get a copy of
            // the same payload.
            let source = ctx.graph.create(source);
            ctx.graph.set_reference(emitter, SOURCE_SLOT, Some(source))?;
            emitters.push(emitter);
        }

        let nodes: Vec<EntityId> = ctx.document.entities(EntityKind::Node).collect();
        for node in nodes {
            let Some(block) = ctx.document.extension_block(node, OMI_AUDIO_EMITTER) else {
                continue;
            };
            let def: NodeDef = parse(block, "node block")?;
            let emitter = emitters[index_in(emitters.len(), def.audio_emitter, "emitter")?];
            ctx.graph.attach(node, emitter)?;
        }

        let scenes: Vec<EntityId> = ctx.document.entities(EntityKind::Scene).collect();
        for scene in scenes {
            let Some(block) = ctx.document.extension_block(scene, OMI_AUDIO_EMITTER) else {
                continue;
            };
            let def: SceneDef = parse(block, "scene block")?;
            let list = scene_emitter_list(ctx.graph, scene)?;
            for index in def.audio_emitters {
                let emitter = emitters[index_in(emitters.len(), index, "emitter")?];
                ctx.graph.add_weak_reference(list, EMITTERS_SLOT, emitter)?;
            }
        }

        tracing::debug!(
            "Read {} audio sources and {} audio emitters",
            sources.len(),
            emitters.len()
        );
        Ok(())
    }

    fn prewrite_kinds(&self) -> &'static [EntityKind] {
        &[EntityKind::Buffer]
    }

    fn prewrite(&self, ctx: &mut WriteContext<'_>, kind: EntityKind) -> IoResult<()> {
        if kind != EntityKind::Buffer {
            return Ok(());
        }
        let graph = ctx.graph();
        for id in graph.list_by_type(AudioSource::PROPERTY_TYPE) {
            let Some(source) = graph.get::<AudioSource>(id) else {
                continue;
            };
            let unchanged = source
                .buffer_view()
                .filter(|view| {
                    ctx.output
                        .buffer_view_bytes(*view)
                        .is_ok_and(|bytes| bytes == &source.data()[..])
                });
            let chunk = match unchanged {
                Some(view) => ctx.layout.reuse_view(view),
                None => ctx.layout.register_chunk(0, Arc::clone(source.data())),
            };
            ctx.chunks.insert(id, chunk);
        }
        Ok(())
    }

    fn write(&self, ctx: &mut WriteContext<'_>) -> IoResult<bool> {
        let graph = ctx.graph();
        let source_ids = graph.list_by_type(AudioSource::PROPERTY_TYPE);
        let emitter_ids = graph.list_by_type(AudioEmitter::PROPERTY_TYPE);
        if source_ids.is_empty() && emitter_ids.is_empty() {
            return Ok(false);
        }
        validate(graph)?;

        let mut root = RootDef::default();
        let mut source_index = IndexMap::with_capacity(source_ids.len());
        for (n, id) in source_ids.iter().enumerate() {
            let Some(source) = graph.get::<AudioSource>(*id) else {
                continue;
            };
            let mut def = AudioSourceDef {
                uri: None,
                buffer_view: None,
                mime_type: source.mime_type().to_string(),
            };
            match ctx.options.format {
                OutputFormat::Glb => {
                    let view = ctx
                        .chunks
                        .get(id)
                        .and_then(|chunk| ctx.layout.buffer_view(*chunk))
                        .ok_or(IoError::UnassignedChunk(*id))?;
                    def.buffer_view = Some(view);
                }
                OutputFormat::Gltf => {
                    let uri = format!(
                        "{}_audio{}.mp3",
                        urlencoding::encode(&ctx.options.basename),
                        n
                    );
                    ctx.resources.insert(uri.clone(), Arc::clone(source.data()));
                    def.uri = Some(uri);
                }
            }
            source_index.insert(*id, root.audio_sources.len());
            root.audio_sources.push(def);
        }

        let mut emitter_index = IndexMap::with_capacity(emitter_ids.len());
        for id in &emitter_ids {
            let Some(emitter) = graph.get::<AudioEmitter>(*id) else {
                continue;
            };
            let source = graph
                .reference(*id, SOURCE_SLOT)
                .ok_or_else(|| PropertyError::cardinality(*id, AudioEmitter::PROPERTY_TYPE, "emitter has no source"))?;
            let index = *source_index
                .get(&source)
                .ok_or_else(|| PropertyError::unresolved(*id, SOURCE_SLOT, source))?;
            emitter_index.insert(*id, root.audio_emitters.len());
            root.audio_emitters.push(AudioEmitterDef::from_emitter(emitter, index));
        }

        for (entity, extension, id) in graph.attachments() {
            if extension != OMI_AUDIO_EMITTER {
                continue;
            }
            let block = match entity.kind {
                EntityKind::Node => {
                    let audio_emitter = *emitter_index
                        .get(&id)
                        .ok_or_else(|| PropertyError::unresolved(id, "node", id))?;
                    serde_json::to_value(NodeDef { audio_emitter })?
                }
                EntityKind::Scene => {
                    let audio_emitters = graph
                        .references(id, EMITTERS_SLOT)
                        .iter()
                        .map(|e| {
                            emitter_index
                                .get(e)
                                .copied()
                                .ok_or_else(|| PropertyError::unresolved(id, EMITTERS_SLOT, *e))
                        })
                        .collect::<PropertyResult<Vec<_>>>()?;
                    if audio_emitters.is_empty() {
                        continue;
                    }
                    serde_json::to_value(SceneDef { audio_emitters })?
                }
                _ => continue,
            };
            ctx.output.set_extension_block(entity, OMI_AUDIO_EMITTER, block)?;
        }

        ctx.output
            .set_root_extension(OMI_AUDIO_EMITTER, serde_json::to_value(&root)?);
        tracing::debug!(
            "Wrote {} audio sources and {} audio emitters",
            root.audio_sources.len(),
            root.audio_emitters.len()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter_with_source(graph: &mut PropertyGraph, emitter: AudioEmitter) -> PropertyId {
        let e = graph.create(emitter);
        let s = graph.create(AudioSource::new(vec![1, 2, 3]));
        graph.set_reference(e, SOURCE_SLOT, Some(s)).unwrap();
        e
    }

    #[test]
    fn valid_placements_pass() {
        let mut graph = PropertyGraph::new();
        let positional = emitter_with_source(&mut graph, AudioEmitter::default());
        graph.attach(EntityId::node(0), positional).unwrap();

        let global = emitter_with_source(&mut graph, AudioEmitter::global());
        let list = scene_emitter_list(&mut graph, EntityId::scene(0)).unwrap();
        graph.add_weak_reference(list, EMITTERS_SLOT, global).unwrap();

        assert_eq!(validate(&graph), Ok(()));
    }

    #[test]
    fn unplaced_emitter_fails() {
        let mut graph = PropertyGraph::new();
        emitter_with_source(&mut graph, AudioEmitter::global());
        assert!(matches!(
            validate(&graph),
            Err(PropertyError::ParentCardinality { .. })
        ));
    }

    #[test]
    fn positional_emitter_in_scene_list_fails() {
        let mut graph = PropertyGraph::new();
        let e = emitter_with_source(&mut graph, AudioEmitter::default());
        graph.attach(EntityId::node(0), e).unwrap();
        let list = scene_emitter_list(&mut graph, EntityId::scene(0)).unwrap();
        graph.add_weak_reference(list, EMITTERS_SLOT, e).unwrap();

        assert!(validate(&graph).is_err());
    }

    #[test]
    fn orphan_source_fails() {
        let mut graph = PropertyGraph::new();
        graph.create(AudioSource::new(vec![0]));
        let err = validate(&graph).unwrap_err();
        assert!(err.to_string().contains("source has no owner"));
    }

    #[test]
    fn global_emitter_cannot_attach_to_node() {
        let mut graph = PropertyGraph::new();
        let e = emitter_with_source(&mut graph, AudioEmitter::global());
        assert!(matches!(
            graph.attach(EntityId::node(0), e),
            Err(PropertyError::ParentTypeViolation { .. })
        ));
    }

    #[test]
    fn scene_emitter_list_reused() {
        let mut graph = PropertyGraph::new();
        let a = scene_emitter_list(&mut graph, EntityId::scene(0)).unwrap();
        let b = scene_emitter_list(&mut graph, EntityId::scene(0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn source_shared_by_two_emitters_is_rejected() {
        let mut graph = PropertyGraph::new();
        let a = emitter_with_source(&mut graph, AudioEmitter::default());
        let b = graph.create(AudioEmitter::default());
        let shared = graph.reference(a, SOURCE_SLOT).unwrap();
        assert!(matches!(
            graph.set_reference(b, SOURCE_SLOT, Some(shared)),
            Err(PropertyError::ParentCardinality { .. })
        ));
    }
}
