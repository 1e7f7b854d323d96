//! `MOZ_hubs_components` extension
//!
//! Per-entity component blocks on scenes, nodes and materials. Nodes are
//! prereaded to upgrade the older single `audio` shape into the current
//! `audio` + `audio-params` pair.

mod audio;

pub use audio::{AudioComponent, AudioParamsComponent, HubsAudioRegistry, AUDIO, AUDIO_PARAMS};

use crate::error::IoResult;
use crate::extension::{Extension, ReadContext, WriteContext};
use omi_document::{Document, EntityId, EntityKind};
use omi_property::{ComponentContainer, ComponentRegistry, Property};
use serde_json::{Map, Value};

/// Extension name
pub const MOZ_HUBS_COMPONENTS: &str = "MOZ_hubs_components";

/// Entity kinds carrying component blocks, in decode order
const COMPONENT_HOSTS: [EntityKind; 3] = [EntityKind::Scene, EntityKind::Node, EntityKind::Material];

/// Keys of the old `audio` shape that stay in `audio`
const AUDIO_KEYS: [&str; 4] = ["src", "controls", "autoPlay", "loop"];

/// Keys of the old `audio` shape that move to `audio-params`, with their new name
const AUDIO_PARAMS_KEYS: [(&str, &str); 9] = [
    ("audioType", "audioType"),
    ("volume", "gain"),
    ("distanceModel", "distanceModel"),
    ("rolloffFactor", "rolloffFactor"),
    ("refDistance", "refDistance"),
    ("maxDistance", "maxDistance"),
    ("coneInnerAngle", "coneInnerAngle"),
    ("coneOuterAngle", "coneOuterAngle"),
    ("coneOuterGain", "coneOuterGain"),
];

/// Reader/writer for `MOZ_hubs_components`
#[derive(Debug, Clone)]
pub struct HubsComponentsExtension {
    registry: ComponentRegistry,
}

impl Default for HubsComponentsExtension {
    fn default() -> Self {
        Self::new(ComponentRegistry::new().with_hubs_audio())
    }
}

impl HubsComponentsExtension {
    /// Create with a component registry
    #[must_use]
    pub fn new(registry: ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Component registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    fn decode_block(&self, entity: EntityId, block: &Value) -> Option<ComponentContainer> {
        let Some(entries) = block.as_object() else {
            tracing::warn!("{} on {} is not an object, ignoring", MOZ_HUBS_COMPONENTS, entity);
            return None;
        };
        if entries.is_empty() {
            return None;
        }

        let mut container = ComponentContainer::new(MOZ_HUBS_COMPONENTS);
        for (name, value) in entries {
            match self.registry.decode(name, value) {
                Some(Ok(component)) => {
                    container.add(component);
                }
                Some(Err(e)) => {
                    tracing::warn!("{}: {}, keeping raw value", entity, e);
                    container.retain_raw(name.clone(), value.clone());
                }
                None => container.retain_raw(name.clone(), value.clone()),
            }
        }
        Some(container)
    }
}

/// Upgrade an old single-field `audio` block in place
///
/// Returns whether the block changed. Blocks that already carry
/// `audio-params`, or carry no `audio`, are left alone.
pub fn upgrade_legacy_audio(block: &mut Map<String, Value>) -> bool {
    if block.contains_key(AUDIO_PARAMS) {
        return false;
    }
    let Some(Value::Object(old)) = block.get(AUDIO) else {
        return false;
    };

    let params = pick(old, AUDIO_PARAMS_KEYS.iter().copied());
    let audio = pick(old, AUDIO_KEYS.iter().map(|key| (*key, *key)));

    block.insert(AUDIO_PARAMS.to_string(), Value::Object(params));
    block.insert(AUDIO.to_string(), Value::Object(audio));
    true
}

fn pick(
    old: &Map<String, Value>,
    keys: impl Iterator<Item = (&'static str, &'static str)>,
) -> Map<String, Value> {
    keys.filter_map(|(from, to)| old.get(from).map(|v| (to.to_string(), v.clone())))
        .collect()
}

fn upgrade_nodes(document: &mut Document) -> usize {
    let nodes: Vec<EntityId> = document.entities(EntityKind::Node).collect();
    let mut upgraded = 0;
    for node in nodes {
        if let Some(Value::Object(block)) = document.extension_block_mut(node, MOZ_HUBS_COMPONENTS) {
            if upgrade_legacy_audio(block) {
                tracing::debug!("upgraded legacy audio component on {}", node);
                upgraded += 1;
            }
        }
    }
    upgraded
}

impl Extension for HubsComponentsExtension {
    fn name(&self) -> &'static str {
        MOZ_HUBS_COMPONENTS
    }

    fn preread_kinds(&self) -> &'static [EntityKind] {
        &[EntityKind::Node]
    }

    fn preread(&self, ctx: &mut ReadContext<'_>, kind: EntityKind) -> IoResult<()> {
        if kind == EntityKind::Node {
            let upgraded = upgrade_nodes(ctx.document);
            if upgraded > 0 {
                tracing::info!("Upgraded {} legacy audio components", upgraded);
            }
        }
        Ok(())
    }

    fn read(&self, ctx: &mut ReadContext<'_>) -> IoResult<()> {
        for kind in COMPONENT_HOSTS {
            let entities: Vec<EntityId> = ctx.document.entities(kind).collect();
            for entity in entities {
                let Some(block) = ctx.document.extension_block(entity, MOZ_HUBS_COMPONENTS) else {
                    continue;
                };
                if let Some(container) = self.decode_block(entity, block) {
                    let id = ctx.graph.create(container);
                    ctx.graph.attach(entity, id)?;
                }
            }
        }
        Ok(())
    }

    fn write(&self, ctx: &mut WriteContext<'_>) -> IoResult<bool> {
        let graph = ctx.graph();
        let mut emitted = false;

        for (entity, _, id) in graph.attachments() {
            if !COMPONENT_HOSTS.contains(&entity.kind) {
                continue;
            }
            let Some(container) = graph.get::<ComponentContainer>(id) else {
                continue;
            };
            if container.extension_name() != MOZ_HUBS_COMPONENTS || container.is_empty() {
                continue;
            }
            ctx.output
                .set_extension_block(entity, MOZ_HUBS_COMPONENTS, container.encode())?;
            emitted = true;
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn upgrade_splits_old_audio_shape() {
        let mut block = object(json!({
            "audio": {
                "src": "https://example.com/a.mp3",
                "autoPlay": true,
                "volume": 0.8,
                "audioType": "pannernode",
                "coneInnerAngle": 90
            }
        }));

        assert!(upgrade_legacy_audio(&mut block));
        assert_eq!(
            Value::Object(block),
            json!({
                "audio": {"src": "https://example.com/a.mp3", "autoPlay": true},
                "audio-params": {"audioType": "pannernode", "gain": 0.8, "coneInnerAngle": 90}
            })
        );
    }

    #[test]
    fn upgrade_is_idempotent() {
        let mut block = object(json!({"audio": {"src": "a.mp3", "volume": 1}}));
        assert!(upgrade_legacy_audio(&mut block));
        let once = block.clone();

        assert!(!upgrade_legacy_audio(&mut block));
        assert_eq!(block, once);
    }

    #[test]
    fn upgrade_ignores_blocks_without_audio() {
        let mut block = object(json!({"audio-params": {"gain": 1}}));
        assert!(!upgrade_legacy_audio(&mut block));
        let mut other = object(json!({"spawn-point": {}}));
        assert!(!upgrade_legacy_audio(&mut other));
    }

    #[test]
    fn decode_keeps_unknown_and_invalid_raw() {
        let ext = HubsComponentsExtension::default();
        let block = json!({
            "audio": {"src": "a.mp3"},
            "audio-params": {"gain": "loud"},
            "spawn-point": {}
        });

        let container = ext.decode_block(EntityId::node(0), &block).unwrap();
        assert!(container.has(AUDIO));
        assert!(!container.has(AUDIO_PARAMS));
        assert_eq!(container.retained().len(), 2);
        assert_eq!(container.retained()["audio-params"], json!({"gain": "loud"}));
    }

    #[test]
    fn decode_skips_empty_and_non_object_blocks() {
        let ext = HubsComponentsExtension::default();
        assert!(ext.decode_block(EntityId::node(0), &json!({})).is_none());
        assert!(ext.decode_block(EntityId::node(0), &json!([1])).is_none());
    }
}
