//! Read/write driver
//!
//! [`GltfIo`] owns the registered extensions and runs the phase pipelines
//! from [`crate::extension`] over them, in registration order within each
//! phase.

use crate::asset::Asset;
use crate::error::IoResult;
use crate::extension::{Extension, ReadContext, ReadPhase, WriteContext, WritePhase};
use crate::hubs::HubsComponentsExtension;
use crate::omi::AudioEmitterExtension;
use indexmap::IndexMap;
use omi_document::{container, Document, EntityId, EntityKind, OutputFormat};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Options for [`GltfIo::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Physical layout
    pub format: OutputFormat,
    /// Stem for generated resource names
    pub basename: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Glb,
            basename: "scene".to_string(),
        }
    }
}

impl WriteOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With output layout
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// With resource basename
    #[inline]
    #[must_use]
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }
}

/// Serialized document
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutput {
    /// glTF JSON
    pub json: Value,
    /// BIN chunk, combined layout only
    pub binary: Option<Vec<u8>>,
    /// Files to write next to the output, by URI
    pub resources: IndexMap<String, Arc<[u8]>>,
}

impl WriteOutput {
    /// Encode as a GLB container
    ///
    /// # Errors
    /// Returns error if JSON serialization fails
    pub fn to_glb(&self) -> IoResult<Vec<u8>> {
        Ok(container::encode(&self.json, self.binary.as_deref())?)
    }

    /// Pretty-printed glTF JSON
    ///
    /// # Errors
    /// Returns error if JSON serialization fails
    pub fn to_json_bytes(&self) -> IoResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.json)?)
    }
}

/// Extension-aware glTF reader and writer
#[derive(Debug, Default)]
pub struct GltfIo {
    extensions: Vec<Box<dyn Extension>>,
}

impl GltfIo {
    /// Create with no extensions
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with `MOZ_hubs_components` (audio components registered) and
    /// `OMI_audio_emitter`
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_extension(HubsComponentsExtension::default())
            .with_extension(AudioEmitterExtension::new())
    }

    /// Register an extension; one with the same name is replaced
    pub fn register(&mut self, extension: Box<dyn Extension>) {
        match self
            .extensions
            .iter_mut()
            .find(|e| e.name() == extension.name())
        {
            Some(existing) => *existing = extension,
            None => self.extensions.push(extension),
        }
    }

    /// Builder form of [`GltfIo::register`]
    #[must_use]
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.register(Box::new(extension));
        self
    }

    /// Names of registered extensions
    pub fn extension_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.iter().map(|e| e.name())
    }

    fn is_registered(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.name() == name)
    }

    /// Read a GLB container
    ///
    /// # Errors
    /// Returns error if the container is malformed or an extension fails
    pub fn read_glb(&self, bytes: &[u8]) -> IoResult<Asset> {
        self.read_document(Document::from_glb(bytes)?)
    }

    /// Read `.gltf` JSON with its external resources
    ///
    /// # Errors
    /// Returns error if the JSON is malformed, a buffer resource is missing,
    /// or an extension fails
    pub fn read_json(&self, json: &[u8], resources: IndexMap<String, Vec<u8>>) -> IoResult<Asset> {
        self.read_document(Document::from_gltf(json, resources)?)
    }

    /// Run the read pipeline over a loaded document
    ///
    /// # Errors
    /// Returns the first extension failure
    pub fn read_document(&self, document: Document) -> IoResult<Asset> {
        let mut asset = Asset::new(document);
        let mut ctx = ReadContext {
            document: &mut asset.document,
            graph: &mut asset.properties,
        };

        for phase in ReadPhase::PIPELINE {
            tracing::debug!("read phase {}", phase);
            for extension in &self.extensions {
                match phase {
                    ReadPhase::Preread(kind) => {
                        if extension.preread_kinds().contains(&kind) {
                            extension.preread(&mut ctx, kind)?;
                        }
                    }
                    ReadPhase::Decode => extension.read(&mut ctx)?,
                }
            }
        }

        tracing::debug!("read {} properties", asset.properties.len());
        Ok(asset)
    }

    /// Run the write pipeline
    ///
    /// The asset is not modified; the output is built from a copy of its
    /// document.
    ///
    /// # Errors
    /// Returns the first extension or layout failure
    pub fn write(&self, asset: &Asset, options: &WriteOptions) -> IoResult<WriteOutput> {
        let mut ctx = WriteContext::new(asset, options);
        let mut emitted = HashSet::new();

        for phase in WritePhase::PIPELINE {
            if !phase.applies_to(options.format) {
                continue;
            }
            tracing::debug!("write phase {}", phase);
            match phase {
                WritePhase::Strip => self.strip(&mut ctx.output),
                WritePhase::Prewrite(kind) => {
                    for extension in &self.extensions {
                        if extension.prewrite_kinds().contains(&kind) {
                            extension.prewrite(&mut ctx, kind)?;
                        }
                    }
                }
                WritePhase::Layout => ctx.layout.apply(&mut ctx.output)?,
                WritePhase::Encode => {
                    for extension in &self.extensions {
                        if extension.write(&mut ctx)? {
                            emitted.insert(extension.name());
                        }
                    }
                }
                WritePhase::ExtensionsUsed => self.rebuild_extensions_used(&mut ctx.output, &emitted),
            }
        }

        Ok(assemble(ctx))
    }

    fn strip(&self, output: &mut Document) {
        for extension in &self.extensions {
            let name = extension.name();
            for kind in EntityKind::ALL {
                let entities: Vec<EntityId> = output.entities(kind).collect();
                for entity in entities {
                    output.remove_extension_block(entity, name);
                }
            }
            output.remove_root_extension(name);
        }
    }

    fn rebuild_extensions_used(&self, output: &mut Document, emitted: &HashSet<&'static str>) {
        let keep = |name: &str| !self.is_registered(name) || emitted.contains(name);

        let mut used: Vec<String> = output
            .extensions_used()
            .into_iter()
            .filter(|name| keep(*name))
            .map(str::to_string)
            .collect();
        for name in self.extension_names() {
            if emitted.contains(name) && !used.iter().any(|u| u == name) {
                used.push(name.to_string());
            }
        }
        output.set_extensions_used(used);

        let required: Option<Vec<Value>> = output
            .json()
            .get("extensionsRequired")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter(|n| n.as_str().map_or(true, |n| keep(n)))
                    .cloned()
                    .collect()
            });
        match required {
            Some(names) if names.is_empty() => {
                output.json_mut().shift_remove("extensionsRequired");
            }
            Some(names) => {
                output
                    .json_mut()
                    .insert("extensionsRequired".to_string(), Value::Array(names));
            }
            None => {}
        }
    }
}

/// Split the written document into JSON, BIN chunk and resources
fn assemble(ctx: WriteContext<'_>) -> WriteOutput {
    let WriteContext {
        mut output,
        options,
        resources: extension_resources,
        ..
    } = ctx;

    let mut resources = IndexMap::new();
    let mut binary = None;

    let buffer_count = output.entity_count(EntityKind::Buffer);
    for index in 0..buffer_count {
        let buffer = EntityId::buffer(index);
        let data = output.buffer(index).map(<[u8]>::to_vec).unwrap_or_default();
        let uri = output
            .entity_def(buffer)
            .and_then(|def| def.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match (uri, options.format) {
            // Buffer 0 always becomes the BIN chunk of a GLB.
            (_, OutputFormat::Glb) if index == 0 => {
                if let Some(def) = output.entity_def_mut(buffer) {
                    def.shift_remove("uri");
                }
                binary = Some(data);
            }
            (Some(uri), _) => {
                resources.insert(uri, Arc::from(data));
            }
            (None, _) => {
                let basename = urlencoding::encode(&options.basename);
                let uri = if index == 0 {
                    format!("{basename}.bin")
                } else {
                    format!("{basename}_{index}.bin")
                };
                if let Some(def) = output.entity_def_mut(buffer) {
                    def.insert("uri".to_string(), Value::String(uri.clone()));
                }
                resources.insert(uri, Arc::from(data));
            }
        }
    }

    for (uri, data) in output.resources() {
        resources.insert(uri.to_string(), Arc::clone(data));
    }
    resources.extend(extension_resources);

    WriteOutput {
        json: Value::Object(output.json().clone()),
        binary,
        resources,
    }
}
