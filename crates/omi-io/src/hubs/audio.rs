//! Hubs `audio` and `audio-params` components
//!
//! Both decode leniently: missing keys and explicit `null`s take the default,
//! while a value of the wrong type is a schema error.

use omi_property::{decode_serde, Component, ComponentRegistry, SchemaError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Component name of [`AudioComponent`]
pub const AUDIO: &str = "audio";

/// Component name of [`AudioParamsComponent`]
pub const AUDIO_PARAMS: &str = "audio-params";

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn encode_serde<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Audio clip reference and playback flags
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioComponent {
    /// URL or path of the audio file
    #[serde(deserialize_with = "nullable")]
    pub src: String,
    /// Show playback controls
    #[serde(deserialize_with = "nullable")]
    pub controls: bool,
    /// Start playing on load
    #[serde(deserialize_with = "nullable")]
    pub auto_play: bool,
    /// Loop playback
    #[serde(rename = "loop", deserialize_with = "nullable")]
    pub looping: bool,
}

impl AudioComponent {
    /// Create with a source locator and default flags
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    /// Registry decoder
    ///
    /// # Errors
    /// Returns `SchemaError` on a value of the wrong type
    pub fn decode(value: &Value) -> Result<Box<dyn Component>, SchemaError> {
        Ok(Box::new(decode_serde::<Self>(AUDIO, value)?))
    }
}

impl Component for AudioComponent {
    fn name(&self) -> &'static str {
        AUDIO
    }

    fn encode(&self) -> Value {
        encode_serde(self)
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}

/// Spatial audio parameters; cone angles are degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioParamsComponent {
    /// `"pannernode"` for positional audio, anything else is global
    #[serde(deserialize_with = "string_or_default")]
    pub audio_type: String,
    /// Linear gain
    #[serde(deserialize_with = "nullable_gain")]
    pub gain: f64,
    /// Web Audio distance model name
    #[serde(deserialize_with = "string_or_default")]
    pub distance_model: String,
    /// Rolloff factor
    #[serde(deserialize_with = "nullable_one")]
    pub rolloff_factor: f64,
    /// Reference distance
    #[serde(deserialize_with = "nullable_one")]
    pub ref_distance: f64,
    /// Maximum distance
    #[serde(deserialize_with = "nullable_max_distance")]
    pub max_distance: f64,
    /// Inner cone angle, degrees
    #[serde(deserialize_with = "nullable_full_circle")]
    pub cone_inner_angle: f64,
    /// Outer cone angle, degrees
    #[serde(deserialize_with = "nullable")]
    pub cone_outer_angle: f64,
    /// Gain outside the outer cone
    #[serde(deserialize_with = "nullable")]
    pub cone_outer_gain: f64,
}

impl Default for AudioParamsComponent {
    fn default() -> Self {
        Self {
            audio_type: "stereo".to_string(),
            gain: 0.5,
            distance_model: "inverse".to_string(),
            rolloff_factor: 1.0,
            ref_distance: 1.0,
            max_distance: 10000.0,
            cone_inner_angle: 360.0,
            cone_outer_angle: 0.0,
            cone_outer_gain: 0.0,
        }
    }
}

// `null` falls back to the field's own default, not the type's.
fn or_field_default<'de, D, T>(deserializer: D, default: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or(default))
}

fn string_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    // Empty strings read as unset, like a missing key.
    let value: Option<String> = Option::deserialize(d)?;
    Ok(value.filter(|s| !s.is_empty()).unwrap_or_default())
}

fn nullable_gain<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    or_field_default(d, AudioParamsComponent::default().gain)
}

fn nullable_one<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    or_field_default(d, 1.0)
}

fn nullable_max_distance<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    or_field_default(d, AudioParamsComponent::default().max_distance)
}

fn nullable_full_circle<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    or_field_default(d, 360.0)
}

impl AudioParamsComponent {
    /// Registry decoder
    ///
    /// # Errors
    /// Returns `SchemaError` on a value of the wrong type
    pub fn decode(value: &Value) -> Result<Box<dyn Component>, SchemaError> {
        let mut params = decode_serde::<Self>(AUDIO_PARAMS, value)?;
        let defaults = Self::default();
        if params.audio_type.is_empty() {
            params.audio_type = defaults.audio_type;
        }
        if params.distance_model.is_empty() {
            params.distance_model = defaults.distance_model;
        }
        Ok(Box::new(params))
    }
}

impl Component for AudioParamsComponent {
    fn name(&self) -> &'static str {
        AUDIO_PARAMS
    }

    fn encode(&self) -> Value {
        encode_serde(self)
    }

    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}

/// Installs the Hubs audio component decoders
pub trait HubsAudioRegistry {
    /// Register `audio` and `audio-params`
    #[must_use]
    fn with_hubs_audio(self) -> Self;
}

impl HubsAudioRegistry for ComponentRegistry {
    fn with_hubs_audio(self) -> Self {
        self.with(AUDIO, AudioComponent::decode)
            .with(AUDIO_PARAMS, AudioParamsComponent::decode)
    }
}
