//! Migration outcome

use crate::error::FetchError;
use omi_document::EntityId;
use omi_io::omi::EmitterScope;

/// One node that received an emitter
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedNode {
    /// Migrated node
    pub node: EntityId,
    /// Scope of the new emitter
    pub scope: EmitterScope,
}

/// One node whose payload could not be fetched
#[derive(Debug)]
pub struct NodeFailure {
    /// Node left unmigrated
    pub node: EntityId,
    /// Locator that failed
    pub locator: String,
    /// Fetch failure
    pub error: FetchError,
}

/// Summary of one migration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Migrated nodes, in document order
    pub migrated: Vec<MigratedNode>,
    /// Nodes with only one of the two audio components, left untouched
    pub partial: Vec<EntityId>,
    /// Total payload bytes fetched for migrated nodes
    pub bytes_fetched: usize,
}

impl MigrationReport {
    /// Whether nothing was migrated or skipped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.partial.is_empty()
    }

    /// Number of positional emitters created
    #[must_use]
    pub fn positional_count(&self) -> usize {
        self.migrated.iter().filter(|m| m.scope.is_positional()).count()
    }

    /// Number of global emitters created
    #[must_use]
    pub fn global_count(&self) -> usize {
        self.migrated.len() - self.positional_count()
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            "Migrated {} nodes ({} positional, {} global), {} bytes fetched",
            self.migrated.len(),
            self.positional_count(),
            self.global_count(),
            self.bytes_fetched
        );
        if !self.partial.is_empty() {
            tracing::info!("Skipped {} nodes with partial audio configuration", self.partial.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omi_io::omi::PositionalParams;

    #[test]
    fn counts_by_scope() {
        let report = MigrationReport {
            migrated: vec![
                MigratedNode {
                    node: EntityId::node(0),
                    scope: EmitterScope::Global,
                },
                MigratedNode {
                    node: EntityId::node(2),
                    scope: EmitterScope::Positional(PositionalParams::default()),
                },
                MigratedNode {
                    node: EntityId::node(3),
                    scope: EmitterScope::Global,
                },
            ],
            partial: vec![EntityId::node(1)],
            bytes_fetched: 12,
        };
        assert_eq!(report.positional_count(), 1);
        assert_eq!(report.global_count(), 2);
        assert!(!report.is_empty());
        assert!(MigrationReport::default().is_empty());
    }
}
