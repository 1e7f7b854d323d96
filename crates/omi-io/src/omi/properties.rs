//! `OMI_audio_emitter` properties

use super::OMI_AUDIO_EMITTER;
use omi_document::EntityKind;
use omi_property::{ParentType, Property};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Owning slot from an emitter to its source
pub const SOURCE_SLOT: &str = "source";

/// Weak slot from a scene list to its emitters
pub const EMITTERS_SLOT: &str = "emitters";

/// MIME type written for every audio source
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Distance attenuation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceModel {
    /// Linear falloff
    Linear,
    /// Inverse distance
    #[default]
    Inverse,
    /// Exponential falloff
    Exponential,
}

impl DistanceModel {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Inverse => "inverse",
            Self::Exponential => "exponential",
        }
    }
}

impl fmt::Display for DistanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised distance model name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown distance model: {0}")]
pub struct UnknownDistanceModel(pub String);

impl FromStr for DistanceModel {
    type Err = UnknownDistanceModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "inverse" => Ok(Self::Inverse),
            "exponential" => Ok(Self::Exponential),
            other => Err(UnknownDistanceModel(other.to_string())),
        }
    }
}

/// Cone and attenuation parameters of a positional emitter
///
/// Angles are radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionalParams {
    /// Inner cone angle
    pub cone_inner_angle: f64,
    /// Outer cone angle
    pub cone_outer_angle: f64,
    /// Gain outside the outer cone
    pub cone_outer_gain: f64,
    /// Distance model
    pub distance_model: DistanceModel,
    /// Maximum distance
    pub max_distance: f64,
    /// Reference distance
    pub ref_distance: f64,
    /// Rolloff factor
    pub rolloff_factor: f64,
}

impl Default for PositionalParams {
    fn default() -> Self {
        Self {
            cone_inner_angle: TAU,
            cone_outer_angle: TAU,
            cone_outer_gain: 0.0,
            distance_model: DistanceModel::Inverse,
            max_distance: 10000.0,
            ref_distance: 1.0,
            rolloff_factor: 1.0,
        }
    }
}

/// Where an emitter is placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmitterScope {
    /// Attached to a node; directional and attenuated
    Positional(PositionalParams),
    /// Listed on a scene; heard everywhere
    Global,
}

impl EmitterScope {
    /// Wire name of the scope
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positional(_) => "positional",
            Self::Global => "global",
        }
    }

    /// Whether the scope is positional
    #[inline]
    #[must_use]
    pub fn is_positional(&self) -> bool {
        matches!(self, Self::Positional(_))
    }
}

const POSITIONAL_PARENTS: &[ParentType] = &[ParentType::Entity(EntityKind::Node)];

/// Audio emitter
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEmitter {
    /// Placement and spatial parameters
    pub scope: EmitterScope,
    /// Linear gain
    pub gain: f64,
    /// Loop playback
    pub looping: bool,
    /// Playing on load
    pub playing: bool,
}

impl Default for AudioEmitter {
    fn default() -> Self {
        Self {
            scope: EmitterScope::Positional(PositionalParams::default()),
            gain: 1.0,
            looping: false,
            playing: false,
        }
    }
}

impl AudioEmitter {
    /// Property type name
    pub const PROPERTY_TYPE: &'static str = "AudioEmitter";

    /// Global emitter with default playback settings
    #[must_use]
    pub fn global() -> Self {
        Self {
            scope: EmitterScope::Global,
            ..Self::default()
        }
    }

    /// Positional emitter with default playback settings
    #[must_use]
    pub fn positional(params: PositionalParams) -> Self {
        Self {
            scope: EmitterScope::Positional(params),
            ..Self::default()
        }
    }
}

impl Property for AudioEmitter {
    fn property_type(&self) -> &'static str {
        Self::PROPERTY_TYPE
    }

    fn extension_name(&self) -> &'static str {
        OMI_AUDIO_EMITTER
    }

    // Global emitters are only reachable through a scene list.
    fn parent_types(&self) -> &'static [ParentType] {
        match self.scope {
            EmitterScope::Positional(_) => POSITIONAL_PARENTS,
            EmitterScope::Global => &[],
        }
    }

    fn clone_property(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }
}

/// Immutable audio payload
///
/// A source read from a bufferView remembers it, so a GLB rewrite can point
/// at the same bytes instead of appending them again.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    data: Arc<[u8]>,
    mime_type: String,
    buffer_view: Option<usize>,
}

impl AudioSource {
    /// Property type name
    pub const PROPERTY_TYPE: &'static str = "AudioSource";

    /// Create an `audio/mpeg` source
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            mime_type: AUDIO_MPEG.to_string(),
            buffer_view: None,
        }
    }

    /// With the bufferView the payload was read from
    #[inline]
    #[must_use]
    pub fn with_buffer_view(mut self, view: usize) -> Self {
        self.buffer_view = Some(view);
        self
    }

    /// With MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Payload bytes
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// MIME type
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// bufferView the payload was read from, if any
    #[inline]
    #[must_use]
    pub fn buffer_view(&self) -> Option<usize> {
        self.buffer_view
    }
}

impl Property for AudioSource {
    fn property_type(&self) -> &'static str {
        Self::PROPERTY_TYPE
    }

    fn extension_name(&self) -> &'static str {
        OMI_AUDIO_EMITTER
    }

    fn parent_types(&self) -> &'static [ParentType] {
        &[ParentType::Property(AudioEmitter::PROPERTY_TYPE)]
    }

    fn clone_property(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }
}

/// Global emitters of one scene, in order
///
/// The emitters themselves are weak links in [`EMITTERS_SLOT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneEmitterList;

impl SceneEmitterList {
    /// Property type name
    pub const PROPERTY_TYPE: &'static str = "SceneEmitterList";
}

impl Property for SceneEmitterList {
    fn property_type(&self) -> &'static str {
        Self::PROPERTY_TYPE
    }

    fn extension_name(&self) -> &'static str {
        OMI_AUDIO_EMITTER
    }

    fn parent_types(&self) -> &'static [ParentType] {
        &[ParentType::Entity(EntityKind::Scene)]
    }

    fn clone_property(&self) -> Box<dyn Property> {
        Box::new(*self)
    }
}
