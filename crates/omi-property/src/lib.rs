//! OMI Property Model
//!
//! Typed, extensible metadata attached to glTF entities.
//!
//! # Core Concepts
//!
//! - [`Property`]: typed extension data with an allowed-parent set
//! - [`PropertyGraph`]: arena holding properties, owned/weak links and entity
//!   attachments
//! - [`Component`] / [`ComponentRegistry`]: open-ended named records of a
//!   legacy components block, decoded through a name → decoder table
//! - [`ComponentContainer`]: the per-entity holder of components

#![warn(unreachable_pub)]

mod component;
mod container;
mod error;
mod graph;
mod property;

pub use component::{decode_serde, Component, ComponentDecoder, ComponentRegistry};
pub use container::ComponentContainer;
pub use error::{PropertyError, PropertyResult, SchemaError};
pub use graph::{LinkKind, PropertyGraph, PropertyId};
pub use property::{AsAny, ParentType, Property};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
