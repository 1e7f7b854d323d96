//! Testing utilities for the OMI glTF transform workspace
//!
//! Shared fixtures: a Hubs scene covering every audio shape, fake audio
//! payloads, and in-memory fetchers.

#![allow(missing_docs)]

use async_trait::async_trait;
use omi_document::Document;
use omi_io::{Asset, GltfIo};
use omi_transform::{FetchError, ResourceFetcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SPEAKER_SRC: &str = "audio/speaker.mp3";
pub const MUSIC_SRC: &str = "audio/music.mp3";
pub const AMBIENCE_SRC: &str = "https://cdn.example.com/ambience.mp3";
pub const BIRDS_SRC: &str = "audio/birds.mp3";

/// Node indices of [`hubs_scene_json`]
pub const SPEAKER_NODE: usize = 0;
pub const MUSIC_NODE: usize = 1;
pub const AMBIENCE_NODE: usize = 2;
pub const PARTIAL_NODE: usize = 3;
pub const SPAWN_NODE: usize = 4;
pub const BIRDS_NODE: usize = 5;

/// Bytes in buffer 0 before any audio is appended
pub const GEOMETRY_BYTES: usize = 12;

/// Hubs scene with one node per audio shape
///
/// - speaker: positional (`pannernode`), 180° inner cone
/// - music: global (`stereo`)
/// - ambience: old single-`audio` shape, global after upgrade
/// - partial: `audio-params` without `audio`
/// - spawn: unregistered component only
/// - birds: global, no `audioType`
pub fn hubs_scene_json() -> Value {
    json!({
        "asset": {"version": "2.0", "generator": "Spoke"},
        "extensionsUsed": ["MOZ_hubs_components", "KHR_materials_unlit"],
        "scene": 0,
        "scenes": [{
            "name": "Room",
            "nodes": [0, 1, 2, 3, 4, 5],
            "extensions": {"MOZ_hubs_components": {"background": {"color": "#aaaaaa"}}}
        }],
        "nodes": [
            {"name": "speaker", "extensions": {"MOZ_hubs_components": {
                "audio": {"src": SPEAKER_SRC, "autoPlay": true, "loop": true, "controls": true},
                "audio-params": {
                    "audioType": "pannernode",
                    "gain": 0.8,
                    "distanceModel": "linear",
                    "rolloffFactor": 2,
                    "refDistance": 3,
                    "maxDistance": 40,
                    "coneInnerAngle": 180,
                    "coneOuterAngle": 360,
                    "coneOuterGain": 0.1
                },
                "networked": {"id": "speaker"}
            }}},
            {"name": "music", "extensions": {"MOZ_hubs_components": {
                "audio": {"src": MUSIC_SRC, "autoPlay": true},
                "audio-params": {"audioType": "stereo", "gain": 0.5}
            }}},
            {"name": "ambience", "extensions": {"MOZ_hubs_components": {
                "audio": {"src": AMBIENCE_SRC, "volume": 0.4, "loop": true}
            }}},
            {"name": "partial", "extensions": {"MOZ_hubs_components": {
                "audio-params": {"audioType": "pannernode"}
            }}},
            {"name": "spawn", "extensions": {"MOZ_hubs_components": {
                "spawn-point": {}
            }}},
            {"name": "birds", "extensions": {"MOZ_hubs_components": {
                "audio": {"src": BIRDS_SRC},
                "audio-params": {"gain": 0.2}
            }}}
        ],
        "materials": [{
            "name": "floor",
            "extensions": {"KHR_materials_unlit": {}}
        }],
        "buffers": [{"byteLength": GEOMETRY_BYTES}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": GEOMETRY_BYTES}]
    })
}

pub fn geometry_bytes() -> Vec<u8> {
    (0..GEOMETRY_BYTES).map(|i| u8::try_from(i).unwrap()).collect()
}

pub fn hubs_document() -> Document {
    Document::from_parts(hubs_scene_json(), vec![geometry_bytes()]).unwrap()
}

pub fn hubs_asset() -> Asset {
    GltfIo::with_defaults().read_document(hubs_document()).unwrap()
}

/// Document with no scene and one global audio node
pub fn sceneless_document() -> Document {
    Document::from_parts(
        json!({
            "asset": {"version": "2.0"},
            "extensionsUsed": ["MOZ_hubs_components"],
            "nodes": [{"extensions": {"MOZ_hubs_components": {
                "audio": {"src": MUSIC_SRC},
                "audio-params": {"audioType": "stereo"}
            }}}]
        }),
        Vec::new(),
    )
    .unwrap()
}

/// Payload starting with an ID3 tag, `len` bytes in total
pub fn fake_mp3(len: usize) -> Vec<u8> {
    let mut bytes = b"ID3\x04\x00".to_vec();
    bytes.extend((0..).map(|i: usize| u8::try_from(i % 251).unwrap()).take(len.saturating_sub(5)));
    bytes.truncate(len);
    bytes
}

/// Payload lengths served by [`fixture_fetcher`]
pub fn fixture_payload_len(locator: &str) -> usize {
    match locator {
        SPEAKER_SRC => 1001,
        MUSIC_SRC => 2002,
        AMBIENCE_SRC => 3003,
        BIRDS_SRC => 404,
        _ => 0,
    }
}

/// Fetcher serving every audio source of [`hubs_scene_json`]
pub fn fixture_fetcher() -> StaticFetcher {
    [SPEAKER_SRC, MUSIC_SRC, AMBIENCE_SRC, BIRDS_SRC]
        .into_iter()
        .fold(StaticFetcher::new(), |fetcher, src| {
            fetcher.with(src, fake_mp3(fixture_payload_len(src)))
        })
}

/// In-memory fetcher; unknown locators answer HTTP 404
#[derive(Debug, Default)]
pub struct StaticFetcher {
    payloads: HashMap<String, (Vec<u8>, Duration)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, locator: &str, bytes: Vec<u8>) -> Self {
        self.with_delay(locator, bytes, Duration::ZERO)
    }

    pub fn with_delay(mut self, locator: &str, bytes: Vec<u8>, delay: Duration) -> Self {
        self.payloads.insert(locator.to_string(), (bytes, delay));
        self
    }

    pub fn without(mut self, locator: &str) -> Self {
        self.payloads.remove(locator);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.payloads.get(locator) {
            Some((bytes, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(bytes.clone())
            }
            None => Err(FetchError::Http {
                locator: locator.to_string(),
                status: 404,
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
