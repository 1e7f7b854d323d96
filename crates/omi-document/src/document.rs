//! Host document
//!
//! Holds the raw glTF JSON plus buffer bytes. Core geometry, materials and
//! animation are never interpreted: they stay as JSON and pass through a
//! read/write cycle untouched. The only services offered are the ones the
//! extension pipeline needs:
//! - Ordered entity enumeration per kind
//! - Raw per-entity and document-level extension blocks
//! - `extensionsUsed` bookkeeping
//! - Buffer view slicing and external resources

use crate::container;
use crate::data_uri;
use crate::entity::{EntityId, EntityKind};
use crate::error::{DocumentError, DocumentResult};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// glTF document: raw JSON plus binary data
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Root JSON object
    json: Map<String, Value>,
    /// Bytes for each entry of `buffers`
    buffers: Vec<Vec<u8>>,
    /// External resources by URI that are not buffers
    resources: IndexMap<String, Arc<[u8]>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty glTF 2.0 document
    #[must_use]
    pub fn new() -> Self {
        let mut json = Map::new();
        json.insert("asset".to_string(), json!({"version": "2.0"}));
        Self {
            json,
            buffers: Vec::new(),
            resources: IndexMap::new(),
        }
    }

    /// Create from a JSON value and pre-loaded buffer bytes
    ///
    /// `buffers[i]` holds the bytes of `json.buffers[i]`. Missing entries are
    /// treated as empty buffers.
    ///
    /// # Errors
    /// Returns `NotAnObject` if `json` is not a JSON object
    pub fn from_parts(json: Value, buffers: Vec<Vec<u8>>) -> DocumentResult<Self> {
        let Value::Object(json) = json else {
            return Err(DocumentError::NotAnObject);
        };
        let mut doc = Self {
            json,
            buffers,
            resources: IndexMap::new(),
        };
        doc.normalize_buffers();
        Ok(doc)
    }

    /// Load a GLB container
    ///
    /// The BIN chunk becomes the data of `buffers[0]` when that buffer has no
    /// `uri`.
    ///
    /// # Errors
    /// Returns error if the container or its JSON is malformed
    pub fn from_glb(bytes: &[u8]) -> DocumentResult<Self> {
        let chunks = container::decode(bytes)?;
        let mut doc = Self::from_parts(chunks.json, Vec::new())?;
        doc.embed_data_uris()?;

        if let Some(bin) = chunks.bin {
            let first_is_embedded = doc
                .entity_def(EntityId::buffer(0))
                .is_some_and(|def| !def.contains_key("uri"));
            if first_is_embedded {
                doc.buffers[0] = bin;
                doc.normalize_buffers();
            }
        }

        Ok(doc)
    }

    /// Load a `.gltf` JSON document with its external resources
    ///
    /// Buffers with a `data:` URI are decoded in place. Buffers with any
    /// other `uri` take their bytes from `resources`. Remaining resources
    /// stay available through [`Document::resource`].
    ///
    /// # Errors
    /// - `Json` / `NotAnObject` if the JSON is malformed
    /// - `InvalidDataUri` if an embedded buffer does not decode
    /// - `MissingResource` if a buffer URI is not in `resources`
    pub fn from_gltf(
        json_bytes: &[u8],
        mut resources: IndexMap<String, Vec<u8>>,
    ) -> DocumentResult<Self> {
        let json: Value = serde_json::from_slice(json_bytes)?;
        let mut doc = Self::from_parts(json, Vec::new())?;
        doc.embed_data_uris()?;

        for index in 0..doc.entity_count(EntityKind::Buffer) {
            let uri = doc
                .entity_def(EntityId::buffer(index))
                .and_then(|def| def.get("uri"))
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(uri) = uri {
                let data = resources
                    .shift_remove(&uri)
                    .ok_or_else(|| DocumentError::MissingResource(uri.clone()))?;
                doc.buffers[index] = data;
            }
        }
        doc.normalize_buffers();

        doc.resources = resources
            .into_iter()
            .map(|(uri, data)| (uri, Arc::from(data)))
            .collect();
        Ok(doc)
    }

    /// Decode `data:` buffer URIs and drop the `uri`
    ///
    /// The buffer then counts as embedded; writers give it a fresh location.
    fn embed_data_uris(&mut self) -> DocumentResult<()> {
        for index in 0..self.entity_count(EntityKind::Buffer) {
            let Some(def) = self.entity_def_mut(EntityId::buffer(index)) else {
                continue;
            };
            let Some(decoded) = def
                .get("uri")
                .and_then(Value::as_str)
                .and_then(data_uri::decode)
            else {
                continue;
            };
            def.shift_remove("uri");
            self.buffers[index] = decoded?;
        }
        self.normalize_buffers();
        Ok(())
    }

    /// Keep one byte vector per buffer entry, truncated to `byteLength`
    fn normalize_buffers(&mut self) {
        let count = self.entity_count(EntityKind::Buffer);
        self.buffers.resize_with(count, Vec::new);
        for index in 0..count {
            let declared = self
                .entity_def(EntityId::buffer(index))
                .and_then(|def| def.get("byteLength"))
                .and_then(Value::as_u64)
                .and_then(|len| usize::try_from(len).ok());
            if let Some(declared) = declared {
                if self.buffers[index].len() > declared {
                    // GLB BIN chunks carry trailing padding.
                    self.buffers[index].truncate(declared);
                }
            }
        }
    }

    /// Root JSON object
    #[inline]
    #[must_use]
    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// Mutable root JSON object
    #[inline]
    pub fn json_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.json
    }

    /// Number of entities of `kind`
    #[must_use]
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.json
            .get(kind.json_key())
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Entities of `kind` in document order
    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> {
        (0..self.entity_count(kind)).map(move |index| EntityId::new(kind, index))
    }

    /// Raw definition of an entity
    #[must_use]
    pub fn entity_def(&self, id: EntityId) -> Option<&Map<String, Value>> {
        self.json
            .get(id.kind.json_key())
            .and_then(Value::as_array)
            .and_then(|defs| defs.get(id.index))
            .and_then(Value::as_object)
    }

    /// Mutable raw definition of an entity
    pub fn entity_def_mut(&mut self, id: EntityId) -> Option<&mut Map<String, Value>> {
        self.json
            .get_mut(id.kind.json_key())
            .and_then(Value::as_array_mut)
            .and_then(|defs| defs.get_mut(id.index))
            .and_then(Value::as_object_mut)
    }

    /// Append an entity definition and return its handle
    ///
    /// Buffers get an empty byte vector; fill it with [`Document::set_buffer`].
    pub fn push_entity(&mut self, kind: EntityKind, def: Map<String, Value>) -> EntityId {
        let defs = self
            .json
            .entry(kind.json_key())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !defs.is_array() {
            *defs = Value::Array(Vec::new());
        }
        let Value::Array(defs) = defs else {
            unreachable!("replaced with an array above");
        };
        defs.push(Value::Object(def));
        let id = EntityId::new(kind, defs.len() - 1);
        if kind == EntityKind::Buffer {
            self.buffers.push(Vec::new());
        }
        id
    }

    /// Raw extension block of an entity
    #[must_use]
    pub fn extension_block(&self, id: EntityId, name: &str) -> Option<&Value> {
        self.entity_def(id)
            .and_then(|def| def.get("extensions"))
            .and_then(|exts| exts.get(name))
    }

    /// Mutable raw extension block of an entity
    pub fn extension_block_mut(&mut self, id: EntityId, name: &str) -> Option<&mut Value> {
        self.entity_def_mut(id)
            .and_then(|def| def.get_mut("extensions"))
            .and_then(|exts| exts.get_mut(name))
    }

    /// Set an entity's extension block
    ///
    /// # Errors
    /// Returns `MissingEntity` if the entity does not exist
    pub fn set_extension_block(
        &mut self,
        id: EntityId,
        name: &str,
        block: Value,
    ) -> DocumentResult<()> {
        let def = self
            .entity_def_mut(id)
            .ok_or(DocumentError::MissingEntity(id))?;
        set_extension(def, name, block);
        Ok(())
    }

    /// Remove an entity's extension block, dropping an emptied `extensions`
    pub fn remove_extension_block(&mut self, id: EntityId, name: &str) -> Option<Value> {
        self.entity_def_mut(id)
            .and_then(|def| remove_extension(def, name))
    }

    /// Document-level extension block
    #[must_use]
    pub fn root_extension(&self, name: &str) -> Option<&Value> {
        self.json.get("extensions").and_then(|exts| exts.get(name))
    }

    /// Set a document-level extension block
    pub fn set_root_extension(&mut self, name: &str, block: Value) {
        set_extension(&mut self.json, name, block);
    }

    /// Remove a document-level extension block
    pub fn remove_root_extension(&mut self, name: &str) -> Option<Value> {
        remove_extension(&mut self.json, name)
    }

    /// Names listed in `extensionsUsed`
    #[must_use]
    pub fn extensions_used(&self) -> Vec<&str> {
        self.json
            .get("extensionsUsed")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `extensionsUsed` lists `name`
    #[must_use]
    pub fn is_extension_used(&self, name: &str) -> bool {
        self.extensions_used().contains(&name)
    }

    /// Replace `extensionsUsed`; an empty list removes the key
    pub fn set_extensions_used<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<Value> = names
            .into_iter()
            .map(|name| Value::String(name.into()))
            .collect();
        if names.is_empty() {
            self.json.remove("extensionsUsed");
        } else {
            self.json
                .insert("extensionsUsed".to_string(), Value::Array(names));
        }
    }

    /// Add `name` to `extensionsUsed` if absent
    pub fn mark_extension_used(&mut self, name: &str) {
        if !self.is_extension_used(name) {
            let mut names: Vec<String> =
                self.extensions_used().into_iter().map(str::to_string).collect();
            names.push(name.to_string());
            self.set_extensions_used(names);
        }
    }

    /// Default scene: `scene` when set, otherwise the first scene
    #[must_use]
    pub fn default_scene(&self) -> Option<EntityId> {
        let count = self.entity_count(EntityKind::Scene);
        let index = self
            .json
            .get("scene")
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
            .unwrap_or(0);
        (index < count).then_some(EntityId::scene(index))
    }

    /// Bytes of buffer `index`
    #[must_use]
    pub fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.buffers.get(index).map(Vec::as_slice)
    }

    /// All buffer bytes, indexed like `buffers`
    #[inline]
    #[must_use]
    pub fn buffers(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Replace the bytes of buffer `index` and update its `byteLength`
    ///
    /// # Errors
    /// Returns `MissingEntity` if the buffer does not exist
    pub fn set_buffer(&mut self, index: usize, data: Vec<u8>) -> DocumentResult<()> {
        let id = EntityId::buffer(index);
        let def = self
            .entity_def_mut(id)
            .ok_or(DocumentError::MissingEntity(id))?;
        def.insert("byteLength".to_string(), Value::from(data.len()));
        self.buffers[index] = data;
        Ok(())
    }

    /// Slice of buffer data covered by `bufferViews[view]`
    ///
    /// # Errors
    /// - `InvalidBufferView` if the view is missing or malformed
    /// - `MissingBuffer` if the target buffer is absent
    /// - `BufferViewOutOfRange` if the range exceeds the buffer
    pub fn buffer_view_bytes(&self, view: usize) -> DocumentResult<&[u8]> {
        let def = self
            .json
            .get("bufferViews")
            .and_then(Value::as_array)
            .and_then(|views| views.get(view))
            .and_then(Value::as_object)
            .ok_or(DocumentError::InvalidBufferView(view))?;

        let field = |key: &str| {
            def.get(key)
                .and_then(Value::as_u64)
                .and_then(|v| usize::try_from(v).ok())
        };
        let buffer = field("buffer").ok_or(DocumentError::InvalidBufferView(view))?;
        let length = field("byteLength").ok_or(DocumentError::InvalidBufferView(view))?;
        let offset = field("byteOffset").unwrap_or(0);

        let data = self
            .buffers
            .get(buffer)
            .ok_or(DocumentError::MissingBuffer(buffer))?;
        let end = offset
            .checked_add(length)
            .ok_or(DocumentError::InvalidBufferView(view))?;
        data.get(offset..end)
            .ok_or(DocumentError::BufferViewOutOfRange {
                view,
                offset,
                end,
                len: data.len(),
            })
    }

    /// External resource provided at load time
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&Arc<[u8]>> {
        self.resources.get(uri)
    }

    /// Remove and return an external resource
    pub fn take_resource(&mut self, uri: &str) -> Option<Arc<[u8]>> {
        self.resources.shift_remove(uri)
    }

    /// External resources in load order
    pub fn resources(&self) -> impl Iterator<Item = (&str, &Arc<[u8]>)> {
        self.resources.iter().map(|(uri, data)| (uri.as_str(), data))
    }

    /// Register an external resource
    pub fn insert_resource(&mut self, uri: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.resources.insert(uri.into(), data.into());
    }

    /// Serialize to a GLB container with `buffers[0]` as the BIN chunk
    ///
    /// # Errors
    /// Returns error if JSON serialization fails
    pub fn to_glb(&self) -> DocumentResult<Vec<u8>> {
        let bin = self.buffers.first().map(Vec::as_slice);
        container::encode(&Value::Object(self.json.clone()), bin)
    }
}

fn set_extension(def: &mut Map<String, Value>, name: &str, block: Value) {
    let exts = def
        .entry("extensions")
        .or_insert_with(|| Value::Object(Map::new()));
    if !exts.is_object() {
        *exts = Value::Object(Map::new());
    }
    if let Value::Object(exts) = exts {
        exts.insert(name.to_string(), block);
    }
}

fn remove_extension(def: &mut Map<String, Value>, name: &str) -> Option<Value> {
    let exts = def.get_mut("extensions")?.as_object_mut()?;
    let removed = exts.shift_remove(name);
    if exts.is_empty() {
        def.shift_remove("extensions");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        Document::from_parts(
            json!({
                "asset": {"version": "2.0"},
                "scene": 1,
                "scenes": [{"nodes": []}, {"nodes": [0, 1]}],
                "nodes": [
                    {"name": "a", "extensions": {"EXT_x": {"k": 1}}},
                    {"name": "b"}
                ],
                "buffers": [{"byteLength": 8}],
                "bufferViews": [
                    {"buffer": 0, "byteOffset": 2, "byteLength": 4},
                    {"buffer": 0, "byteOffset": 6, "byteLength": 4}
                ],
                "extensionsUsed": ["EXT_x"]
            }),
            vec![vec![0, 1, 2, 3, 4, 5, 6, 7]],
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_object_root() {
        let result = Document::from_parts(json!([1, 2]), Vec::new());
        assert!(matches!(result, Err(DocumentError::NotAnObject)));
    }

    #[test]
    fn entity_enumeration_in_order() {
        let doc = sample();
        let nodes: Vec<_> = doc.entities(EntityKind::Node).collect();
        assert_eq!(nodes, vec![EntityId::node(0), EntityId::node(1)]);
        assert_eq!(doc.entity_count(EntityKind::Material), 0);
    }

    #[test]
    fn extension_block_access() {
        let mut doc = sample();
        assert_eq!(doc.extension_block(EntityId::node(0), "EXT_x"), Some(&json!({"k": 1})));
        assert!(doc.extension_block(EntityId::node(1), "EXT_x").is_none());

        doc.set_extension_block(EntityId::node(1), "EXT_y", json!({"v": true}))
            .unwrap();
        assert_eq!(doc.extension_block(EntityId::node(1), "EXT_y"), Some(&json!({"v": true})));

        let removed = doc.remove_extension_block(EntityId::node(0), "EXT_x");
        assert_eq!(removed, Some(json!({"k": 1})));
        // Emptied `extensions` objects are dropped.
        assert!(!doc.entity_def(EntityId::node(0)).unwrap().contains_key("extensions"));
    }

    #[test]
    fn set_extension_on_missing_entity_fails() {
        let mut doc = sample();
        let err = doc
            .set_extension_block(EntityId::node(9), "EXT_x", json!({}))
            .unwrap_err();
        assert!(matches!(err, DocumentError::MissingEntity(_)));
    }

    #[test]
    fn extensions_used_bookkeeping() {
        let mut doc = sample();
        assert!(doc.is_extension_used("EXT_x"));
        doc.mark_extension_used("EXT_y");
        doc.mark_extension_used("EXT_y");
        assert_eq!(doc.extensions_used(), vec!["EXT_x", "EXT_y"]);

        doc.set_extensions_used(Vec::<String>::new());
        assert!(!doc.json().contains_key("extensionsUsed"));
    }

    #[test]
    fn default_scene_honours_scene_field() {
        let doc = sample();
        assert_eq!(doc.default_scene(), Some(EntityId::scene(1)));

        let empty = Document::new();
        assert_eq!(empty.default_scene(), None);
    }

    #[test]
    fn buffer_view_slicing() {
        let doc = sample();
        assert_eq!(doc.buffer_view_bytes(0).unwrap(), &[2, 3, 4, 5]);
        assert!(matches!(
            doc.buffer_view_bytes(1),
            Err(DocumentError::BufferViewOutOfRange { view: 1, .. })
        ));
        assert!(matches!(
            doc.buffer_view_bytes(5),
            Err(DocumentError::InvalidBufferView(5))
        ));
    }

    #[test]
    fn glb_load_truncates_bin_padding() {
        let mut doc = Document::new();
        let buffer = doc.push_entity(EntityKind::Buffer, Map::new());
        doc.set_buffer(buffer.index, vec![7, 7, 7, 7, 7]).unwrap();

        let glb = doc.to_glb().unwrap();
        let loaded = Document::from_glb(&glb).unwrap();
        assert_eq!(loaded.buffer(0).unwrap(), &[7, 7, 7, 7, 7]);
    }

    #[test]
    fn gltf_load_resolves_buffer_uris() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"uri":"scene.bin","byteLength":3}]}"#;
        let mut resources = IndexMap::new();
        resources.insert("scene.bin".to_string(), vec![1, 2, 3]);
        resources.insert("clip.mp3".to_string(), vec![9]);

        let doc = Document::from_gltf(json, resources).unwrap();
        assert_eq!(doc.buffer(0).unwrap(), &[1, 2, 3]);
        assert_eq!(doc.resource("clip.mp3").map(|r| r.to_vec()), Some(vec![9]));
        assert!(doc.resource("scene.bin").is_none());

        let mut doc = doc;
        assert!(doc.take_resource("clip.mp3").is_some());
        assert_eq!(doc.resources().count(), 0);
    }

    #[test]
    fn gltf_load_decodes_embedded_buffer() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4,"uri":"data:application/octet-stream;base64,AQIDBA=="}]}"#;

        let doc = Document::from_gltf(json, IndexMap::new()).unwrap();
        assert_eq!(doc.buffer(0).unwrap(), &[1, 2, 3, 4]);
        assert!(!doc.entity_def(EntityId::buffer(0)).unwrap().contains_key("uri"));
    }

    #[test]
    fn gltf_load_rejects_broken_data_uri() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4,"uri":"data:application/octet-stream;base64,@@@"}]}"#;
        let result = Document::from_gltf(json, IndexMap::new());
        assert!(matches!(result, Err(DocumentError::InvalidDataUri(_))));
    }

    #[test]
    fn gltf_load_missing_buffer_uri_fails() {
        let json = br#"{"asset":{"version":"2.0"},"buffers":[{"uri":"gone.bin","byteLength":3}]}"#;
        let result = Document::from_gltf(json, IndexMap::new());
        assert!(matches!(result, Err(DocumentError::MissingResource(uri)) if uri == "gone.bin"));
    }
}
