//! Hubs → OMI audio migration
//!
//! Replaces `MOZ_hubs_components` `audio` / `audio-params` pairs with
//! `OMI_audio_emitter` emitters and sources on an in-memory [`Asset`].
//!
//! # Core Concepts
//!
//! - [`HubsToOmi`]: plans, fetches and commits one migration run
//! - [`ResourceFetcher`]: async retrieval of `audio.src` payloads
//! - [`TransformConfig`]: fetch concurrency, commit policy, HTTP timeout
//! - [`MigrationReport`]: what was migrated and what was skipped
//!
//! # Example
//! ```rust,ignore
//! let io = GltfIo::with_defaults();
//! let mut asset = io.read_glb(&bytes)?;
//! let fetcher = Arc::new(DefaultFetcher::new("scenes/", &config)?);
//! let report = HubsToOmi::new(fetcher).with_config(config).run(&mut asset).await?;
//! ```
//!
//! [`Asset`]: omi_io::Asset

#![warn(unreachable_pub)]

mod config;
mod error;
mod fetch;
pub mod mapping;
mod report;
mod transform;

pub use config::{CommitMode, TransformConfig};
pub use error::{ConfigError, FetchError, TransformError, TransformResult};
pub use fetch::{DefaultFetcher, FileFetcher, HttpFetcher, ResourceFetcher};
pub use report::{MigratedNode, MigrationReport, NodeFailure};
pub use transform::HubsToOmi;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
