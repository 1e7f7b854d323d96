//! Field mapping from Hubs audio components to an OMI emitter
//!
//! Pure functions; no fetching and no graph access.
//!
//! | Hubs | OMI |
//! |---|---|
//! | `audio.loop` | `loop` |
//! | `audio.autoPlay` | `playing` |
//! | `audio-params.audioType == "pannernode"` | `positional`, else `global` |
//! | `audio-params.gain` | `gain` |
//! | `audio-params.coneInnerAngle` / `coneOuterAngle` (degrees) | radians |
//! | remaining spatial fields | copied |

use omi_io::hubs::{AudioComponent, AudioParamsComponent};
use omi_io::omi::{AudioEmitter, DistanceModel, EmitterScope, PositionalParams};

/// `audioType` value of positional Hubs audio
pub const PANNER_NODE: &str = "pannernode";

/// Degrees to radians
#[inline]
#[must_use]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Distance model for a Hubs name; unknown names fall back to inverse
#[must_use]
pub fn distance_model(name: &str) -> DistanceModel {
    name.parse().unwrap_or_else(|e| {
        tracing::warn!("{}, using {}", e, DistanceModel::Inverse);
        DistanceModel::Inverse
    })
}

/// Emitter scope for an `audio-params` component
#[must_use]
pub fn scope(params: &AudioParamsComponent) -> EmitterScope {
    if params.audio_type != PANNER_NODE {
        return EmitterScope::Global;
    }
    EmitterScope::Positional(PositionalParams {
        cone_inner_angle: degrees_to_radians(params.cone_inner_angle),
        cone_outer_angle: degrees_to_radians(params.cone_outer_angle),
        cone_outer_gain: params.cone_outer_gain,
        distance_model: distance_model(&params.distance_model),
        max_distance: params.max_distance,
        ref_distance: params.ref_distance,
        rolloff_factor: params.rolloff_factor,
    })
}

/// Emitter equivalent to an `audio` + `audio-params` pair
#[must_use]
pub fn emitter(audio: &AudioComponent, params: &AudioParamsComponent) -> AudioEmitter {
    AudioEmitter {
        scope: scope(params),
        gain: params.gain,
        looping: audio.looping,
        playing: audio.auto_play,
    }
}
