//! OMI Host Document
//!
//! The minimal glTF document the extension pipeline runs against.
//!
//! # Core Concepts
//!
//! - [`Document`]: raw glTF JSON plus buffer bytes and external resources
//! - [`EntityId`]: handle to a scene, node, material or buffer
//! - [`BufferLayout`]: chunk registration and bufferView assignment for writers
//! - [`container`]: GLB framing
//! - [`data_uri`]: embedded base64 payloads
//!
//! Geometry, materials and animation are carried as opaque JSON.

#![warn(unreachable_pub)]

pub mod container;
pub mod data_uri;
mod document;
mod entity;
mod error;
mod layout;

pub use document::Document;
pub use entity::{EntityId, EntityKind};
pub use error::{DocumentError, DocumentResult};
pub use layout::{BufferLayout, ChunkId, OutputFormat};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
