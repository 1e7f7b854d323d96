//! OMI Serialization Protocol
//!
//! Maps the property graph to glTF JSON plus binary chunks and back.
//!
//! # Core Concepts
//!
//! - [`Extension`]: two-phase read and write hooks for one glTF extension
//! - [`GltfIo`]: runs the [`ReadPhase`] and [`WritePhase`] pipelines over the
//!   registered extensions
//! - [`Asset`]: host document plus property graph
//! - [`hubs`]: `MOZ_hubs_components` and its audio components
//! - [`omi`]: `OMI_audio_emitter` and its emitter, source and scene-list
//!   properties
//!
//! # Example
//! ```rust,ignore
//! let io = GltfIo::with_defaults();
//! let asset = io.read_glb(&bytes)?;
//! let out = io.write(&asset, &WriteOptions::new().with_basename("room"))?;
//! std::fs::write("room.glb", out.to_glb()?)?;
//! ```

#![warn(unreachable_pub)]

mod asset;
mod error;
mod extension;
pub mod hubs;
mod io;
pub mod omi;

pub use asset::Asset;
pub use error::{IoError, IoResult};
pub use extension::{Extension, ReadContext, ReadPhase, WriteContext, WritePhase};
pub use io::{GltfIo, WriteOptions, WriteOutput};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
