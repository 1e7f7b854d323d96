//! JSON shapes of `OMI_audio_emitter` blocks

use super::properties::{AudioEmitter, DistanceModel, EmitterScope, PositionalParams, AUDIO_MPEG};
use serde::{Deserialize, Serialize};

/// Document-level block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RootDef {
    #[serde(default)]
    pub(crate) audio_sources: Vec<AudioSourceDef>,
    #[serde(default)]
    pub(crate) audio_emitters: Vec<AudioEmitterDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AudioSourceDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) buffer_view: Option<usize>,
    #[serde(default = "default_mime_type")]
    pub(crate) mime_type: String,
}

fn default_mime_type() -> String {
    AUDIO_MPEG.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EmitterType {
    Positional,
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AudioEmitterDef {
    #[serde(rename = "type")]
    pub(crate) kind: EmitterType,
    #[serde(default = "one")]
    pub(crate) gain: f64,
    #[serde(default, rename = "loop")]
    pub(crate) looping: bool,
    #[serde(default)]
    pub(crate) playing: bool,
    pub(crate) source: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cone_inner_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cone_outer_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cone_outer_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) distance_model: Option<DistanceModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) max_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) ref_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) rolloff_factor: Option<f64>,
}

fn one() -> f64 {
    1.0
}

impl AudioEmitterDef {
    pub(crate) fn from_emitter(emitter: &AudioEmitter, source: usize) -> Self {
        let mut def = Self {
            kind: EmitterType::Global,
            gain: emitter.gain,
            looping: emitter.looping,
            playing: emitter.playing,
            source,
            cone_inner_angle: None,
            cone_outer_angle: None,
            cone_outer_gain: None,
            distance_model: None,
            max_distance: None,
            ref_distance: None,
            rolloff_factor: None,
        };
        if let EmitterScope::Positional(p) = emitter.scope {
            def.kind = EmitterType::Positional;
            def.cone_inner_angle = Some(p.cone_inner_angle);
            def.cone_outer_angle = Some(p.cone_outer_angle);
            def.cone_outer_gain = Some(p.cone_outer_gain);
            def.distance_model = Some(p.distance_model);
            def.max_distance = Some(p.max_distance);
            def.ref_distance = Some(p.ref_distance);
            def.rolloff_factor = Some(p.rolloff_factor);
        }
        def
    }

    pub(crate) fn to_emitter(&self) -> AudioEmitter {
        let scope = match self.kind {
            EmitterType::Global => EmitterScope::Global,
            EmitterType::Positional => {
                let d = PositionalParams::default();
                EmitterScope::Positional(PositionalParams {
                    cone_inner_angle: self.cone_inner_angle.unwrap_or(d.cone_inner_angle),
                    cone_outer_angle: self.cone_outer_angle.unwrap_or(d.cone_outer_angle),
                    cone_outer_gain: self.cone_outer_gain.unwrap_or(d.cone_outer_gain),
                    distance_model: self.distance_model.unwrap_or(d.distance_model),
                    max_distance: self.max_distance.unwrap_or(d.max_distance),
                    ref_distance: self.ref_distance.unwrap_or(d.ref_distance),
                    rolloff_factor: self.rolloff_factor.unwrap_or(d.rolloff_factor),
                })
            }
        };
        AudioEmitter {
            scope,
            gain: self.gain,
            looping: self.looping,
            playing: self.playing,
        }
    }
}

/// Per-node block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NodeDef {
    pub(crate) audio_emitter: usize,
}

/// Per-scene block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneDef {
    #[serde(default)]
    pub(crate) audio_emitters: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn global_emitter_omits_spatial_fields() {
        let def = AudioEmitterDef::from_emitter(&AudioEmitter::global(), 2);
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"type": "global", "gain": 1.0, "loop": false, "playing": false, "source": 2})
        );
    }

    #[test]
    fn positional_emitter_writes_spatial_fields() {
        let def = AudioEmitterDef::from_emitter(&AudioEmitter::default(), 0);
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "positional");
        assert_eq!(value["distanceModel"], "inverse");
        assert_eq!(value["maxDistance"], 10000.0);
    }

    #[test]
    fn positional_defaults_fill_missing_fields() {
        let def: AudioEmitterDef =
            serde_json::from_value(json!({"type": "positional", "source": 0, "refDistance": 3}))
                .unwrap();
        let emitter = def.to_emitter();
        assert_eq!(emitter.gain, 1.0);
        let EmitterScope::Positional(params) = emitter.scope else {
            panic!("expected positional scope");
        };
        assert_eq!(params.ref_distance, 3.0);
        assert_eq!(params.rolloff_factor, 1.0);
    }

    #[test]
    fn source_def_without_mime_type() {
        let def: AudioSourceDef = serde_json::from_value(json!({"bufferView": 4})).unwrap();
        assert_eq!(def.buffer_view, Some(4));
        assert_eq!(def.mime_type, "audio/mpeg");
        assert_eq!(serde_json::to_value(&def).unwrap(), json!({"bufferView": 4, "mimeType": "audio/mpeg"}));
    }
}
