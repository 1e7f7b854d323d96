//! Load, migrate, save

use crate::paths::Paths;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use omi_document::{data_uri, OutputFormat};
use omi_io::{Asset, GltfIo, WriteOptions, WriteOutput};
use omi_transform::{DefaultFetcher, HubsToOmi, MigrationReport, TransformConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// External URIs referenced by a `.gltf` document, each once
///
/// Buffers, images and `OMI_audio_emitter` sources; `data:` URIs are skipped.
#[must_use]
pub fn referenced_uris(json: &Value) -> Vec<String> {
    let arrays = [
        json.get("buffers"),
        json.get("images"),
        json.pointer("/extensions/OMI_audio_emitter/audioSources"),
    ];
    let uris: IndexSet<String> = arrays
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|item| item.get("uri").and_then(Value::as_str))
        .filter(|uri| !data_uri::is_data_uri(uri))
        .map(str::to_string)
        .collect();
    uris.into_iter().collect()
}

/// File path of a relative URI, percent-decoded
///
/// # Errors
/// Returns error if the decoded URI is not UTF-8
pub fn uri_to_path(dir: &Path, uri: &str) -> Result<PathBuf> {
    let decoded = urlencoding::decode(uri).with_context(|| format!("invalid URI {uri}"))?;
    Ok(dir.join(decoded.as_ref()))
}

/// Read the input document and run the extension read pipeline
///
/// # Errors
/// Returns error if the file or one of its resources cannot be read, or the
/// document is malformed
pub async fn load(io: &GltfIo, paths: &Paths) -> Result<Asset> {
    let bytes = tokio::fs::read(&paths.input)
        .await
        .with_context(|| format!("failed to read {}", paths.input.display()))?;

    match paths.input_format {
        OutputFormat::Glb => io
            .read_glb(&bytes)
            .with_context(|| format!("failed to load {}", paths.input.display())),
        OutputFormat::Gltf => {
            let json: Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not valid JSON", paths.input.display()))?;
            let mut resources = IndexMap::new();
            for uri in referenced_uris(&json) {
                let path = uri_to_path(paths.input_dir(), &uri)?;
                let data = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read resource {}", path.display()))?;
                resources.insert(uri, data);
            }
            tracing::debug!("loaded {} external resources", resources.len());
            io.read_json(&bytes, resources)
                .with_context(|| format!("failed to load {}", paths.input.display()))
        }
    }
}

/// Write the output document and its resources
///
/// # Errors
/// Returns error if a file cannot be written
pub async fn save(output: &WriteOutput, paths: &Paths) -> Result<()> {
    let dir = paths.output_dir();
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let document = match paths.output_format {
        OutputFormat::Glb => output.to_glb()?,
        OutputFormat::Gltf => output.to_json_bytes()?,
    };
    write_file(&paths.output, &document).await?;

    for (uri, data) in &output.resources {
        write_file(&uri_to_path(dir, uri)?, data).await?;
    }
    tracing::info!(
        "Wrote {} with {} resources",
        paths.output.display(),
        output.resources.len()
    );
    Ok(())
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Full conversion: load, migrate, save
///
/// # Errors
/// Returns the first failure of any stage; nothing is written if loading or
/// migration fails
pub async fn convert(paths: &Paths, config: TransformConfig) -> Result<MigrationReport> {
    let io = GltfIo::with_defaults();
    tracing::info!("Loading {}", paths.input.display());
    let mut asset = load(&io, paths).await?;

    let fetcher = DefaultFetcher::new(paths.input_dir(), &config)?;
    let report = HubsToOmi::new(Arc::new(fetcher))
        .with_config(config)
        .run(&mut asset)
        .await?;

    let options = WriteOptions::new()
        .with_format(paths.output_format)
        .with_basename(paths.basename.clone());
    let output = io.write(&asset, &options)?;
    save(&output, paths).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_external_uris() {
        let json = json!({
            "buffers": [{"uri": "room.bin", "byteLength": 4}, {"byteLength": 2}],
            "images": [{"uri": "textures/floor.png"}, {"uri": "data:image/png;base64,AAAA"}],
            "extensions": {"OMI_audio_emitter": {"audioSources": [{"uri": "room_audio0.mp3"}]}}
        });
        assert_eq!(
            referenced_uris(&json),
            vec!["room.bin", "textures/floor.png", "room_audio0.mp3"]
        );
    }

    #[test]
    fn repeated_uris_listed_once() {
        let json = json!({
            "buffers": [{"uri": "shared.bin"}],
            "images": [{"uri": "a.png"}, {"uri": "shared.bin"}, {"uri": "a.png"}]
        });
        assert_eq!(referenced_uris(&json), vec!["shared.bin", "a.png"]);
    }

    #[test]
    fn uris_are_percent_decoded() {
        let path = uri_to_path(Path::new("/scenes"), "main%20hall_audio0.mp3").unwrap();
        assert_eq!(path, Path::new("/scenes/main hall_audio0.mp3"));
    }

    #[test]
    fn no_uris_in_plain_document() {
        assert!(referenced_uris(&json!({"asset": {"version": "2.0"}})).is_empty());
    }
}
