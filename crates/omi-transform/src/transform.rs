//! Hubs audio → OMI emitter migration
//!
//! A run has four stages:
//! 1. Plan: collect nodes carrying both `audio` and `audio-params`, in
//!    document order
//! 2. Fetch: retrieve every planned payload, up to the configured number
//!    concurrently; results come back in plan order
//! 3. Commit: create source and emitter, place the emitter on its node or in
//!    the default scene's list, drop the two Hubs components
//! 4. Report
//!
//! The property graph is only touched in stage 3.

use crate::config::{CommitMode, TransformConfig};
use crate::error::{FetchError, TransformError, TransformResult};
use crate::fetch::ResourceFetcher;
use crate::mapping;
use crate::report::{MigratedNode, MigrationReport, NodeFailure};
use futures::stream::{self, StreamExt};
use omi_document::{EntityId, EntityKind};
use omi_io::hubs::{AudioComponent, AudioParamsComponent, AUDIO, AUDIO_PARAMS, MOZ_HUBS_COMPONENTS};
use omi_io::omi::{scene_emitter_list, AudioEmitter, AudioSource, EmitterScope, EMITTERS_SLOT, SOURCE_SLOT};
use omi_io::Asset;
use omi_property::{ComponentContainer, PropertyGraph, PropertyId};
use std::fmt;
use std::pin::pin;
use std::sync::Arc;

/// One node selected for migration
#[derive(Debug, Clone)]
struct PlannedNode {
    node: EntityId,
    container: PropertyId,
    locator: String,
    emitter: AudioEmitter,
}

/// Migrates `MOZ_hubs_components` audio to `OMI_audio_emitter`
pub struct HubsToOmi {
    config: TransformConfig,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl fmt::Debug for HubsToOmi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubsToOmi")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HubsToOmi {
    /// Create with default configuration
    #[must_use]
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            config: TransformConfig::default(),
            fetcher,
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run the migration over `asset`
    ///
    /// # Errors
    /// - `MissingDefaultScene` if a global emitter is needed and the
    ///   document has no scene; nothing is changed
    /// - `ResourceFetch` on the first failed fetch under
    ///   [`CommitMode::AllOrNothing`]; nothing is changed
    /// - `PartialMigration` under [`CommitMode::BestEffort`] when any fetch
    ///   failed; successfully fetched nodes are committed
    /// - `Property` if the graph rejects a link
    pub async fn run(&self, asset: &mut Asset) -> TransformResult<MigrationReport> {
        let mut report = MigrationReport::default();

        if !asset.document.is_extension_used(MOZ_HUBS_COMPONENTS) {
            tracing::info!("{} not used, nothing to migrate", MOZ_HUBS_COMPONENTS);
            return Ok(report);
        }

        let plans = plan(asset, &mut report);
        tracing::info!("Planned {} audio nodes for migration", plans.len());

        let needs_scene = plans.iter().any(|p| !p.emitter.scope.is_positional());
        let scene = asset.document.default_scene();
        if needs_scene && scene.is_none() {
            return Err(TransformError::MissingDefaultScene);
        }

        let (fetched, failures) = self.fetch_all(&plans).await?;

        for (plan, bytes) in fetched {
            report.bytes_fetched += bytes.len();
            commit(&mut asset.properties, plan, bytes, scene)?;
            report.migrated.push(MigratedNode {
                node: plan.node,
                scope: plan.emitter.scope,
            });
        }
        report.log();

        if failures.is_empty() {
            Ok(report)
        } else {
            tracing::warn!("{} nodes could not be fetched", failures.len());
            Err(TransformError::PartialMigration { report, failures })
        }
    }

    async fn fetch_all<'p>(
        &self,
        plans: &'p [PlannedNode],
    ) -> TransformResult<(Vec<(&'p PlannedNode, Vec<u8>)>, Vec<NodeFailure>)> {
        let limit = self.config.effective_concurrency();
        tracing::debug!("fetching {} payloads, {} at a time", plans.len(), limit);

        let mut results = pin!(stream::iter(plans)
            .map(|plan| async move { (plan, self.fetcher.fetch(&plan.locator).await) })
            .buffered(limit));

        let mut fetched = Vec::with_capacity(plans.len());
        let mut failures = Vec::new();
        while let Some((plan, result)) = results.next().await {
            match result {
                Ok(bytes) => fetched.push((plan, bytes)),
                Err(error) => match self.config.commit_mode {
                    CommitMode::AllOrNothing => {
                        return Err(TransformError::ResourceFetch {
                            node: plan.node,
                            locator: plan.locator.clone(),
                            source: error,
                        });
                    }
                    CommitMode::BestEffort => {
                        tracing::warn!("{}: {}", plan.node, error);
                        failures.push(failure(plan, error));
                    }
                },
            }
        }
        Ok((fetched, failures))
    }
}

fn failure(plan: &PlannedNode, error: FetchError) -> NodeFailure {
    NodeFailure {
        node: plan.node,
        locator: plan.locator.clone(),
        error,
    }
}

fn plan(asset: &Asset, report: &mut MigrationReport) -> Vec<PlannedNode> {
    let graph = &asset.properties;
    let mut plans = Vec::new();

    for node in asset.document.entities(EntityKind::Node) {
        let Some(container_id) = graph.attachment(node, MOZ_HUBS_COMPONENTS) else {
            continue;
        };
        let Some(container) = graph.get::<ComponentContainer>(container_id) else {
            continue;
        };
        let audio = container.get_as::<AudioComponent>(AUDIO);
        let params = container.get_as::<AudioParamsComponent>(AUDIO_PARAMS);

        match (audio, params) {
            (Some(audio), Some(params)) => {
                tracing::debug!("{}: {} -> {}", node, audio.src, params.audio_type);
                plans.push(PlannedNode {
                    node,
                    container: container_id,
                    locator: audio.src.clone(),
                    emitter: mapping::emitter(audio, params),
                });
            }
            (None, None) => {}
            _ => {
                tracing::debug!("{}: partial audio configuration, skipping", node);
                report.partial.push(node);
            }
        }
    }
    plans
}

fn commit(
    graph: &mut PropertyGraph,
    plan: &PlannedNode,
    bytes: Vec<u8>,
    scene: Option<EntityId>,
) -> TransformResult<()> {
    let source = graph.create(AudioSource::new(bytes));
    let emitter = graph.create(plan.emitter.clone());
    graph.set_reference(emitter, SOURCE_SLOT, Some(source))?;

    match plan.emitter.scope {
        EmitterScope::Positional(_) => {
            if let Some(previous) = graph.attach(plan.node, emitter)? {
                tracing::warn!("{}: replacing existing audio emitter {}", plan.node, previous);
                graph.remove(previous)?;
            }
        }
        EmitterScope::Global => {
            let scene = scene.ok_or(TransformError::MissingDefaultScene)?;
            let list = scene_emitter_list(graph, scene)?;
            graph.add_weak_reference(list, EMITTERS_SLOT, emitter)?;
        }
    }

    if let Some(container) = graph.get_mut::<ComponentContainer>(plan.container) {
        container.remove(AUDIO);
        container.remove(AUDIO_PARAMS);
    }
    tracing::debug!("{}: migrated as {} emitter", plan.node, plan.emitter.scope.as_str());
    Ok(())
}
