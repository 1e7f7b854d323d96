//! Error types for the property model
//!
//! - [`PropertyError`]: graph integrity failures, all fatal
//! - [`SchemaError`]: malformed component content, recovered by the caller

use crate::graph::{LinkKind, PropertyId};
use omi_document::EntityId;

/// Property graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// Property id not present in the graph
    #[error("unknown property: {0}")]
    UnknownProperty(PropertyId),

    /// Parent kind not in the property's allowed-parent set
    #[error("{property_type} cannot have parent {parent}")]
    ParentTypeViolation {
        property_type: &'static str,
        parent: String,
    },

    /// Property would end up with zero or more than one parent
    #[error("parent cardinality violated for {property_type} {id}: {reason}")]
    ParentCardinality {
        id: PropertyId,
        property_type: &'static str,
        reason: String,
    },

    /// A link target could not be mapped to a property
    #[error("cannot resolve reference {holder}.{slot} -> {target}")]
    ReferenceResolution {
        holder: PropertyId,
        slot: String,
        target: PropertyId,
    },

    /// Copy between properties of different types
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Slot already holds links of the other kind
    #[error("slot '{slot}' holds {existing:?} links")]
    SlotKindMismatch {
        slot: &'static str,
        existing: LinkKind,
    },

    /// Entity has no counterpart in the merge target
    #[error("no mapping for entity {0}")]
    UnmappedEntity(EntityId),
}

impl PropertyError {
    /// Create cardinality error
    pub fn cardinality(id: PropertyId, property_type: &'static str, reason: impl Into<String>) -> Self {
        Self::ParentCardinality {
            id,
            property_type,
            reason: reason.into(),
        }
    }

    /// Create resolution error
    pub fn unresolved(holder: PropertyId, slot: impl Into<String>, target: PropertyId) -> Self {
        Self::ReferenceResolution {
            holder,
            slot: slot.into(),
            target,
        }
    }
}

/// Component content does not match its schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid '{component}' component: {message}")]
pub struct SchemaError {
    /// Component name
    pub component: String,
    /// What was wrong
    pub message: String,
}

impl SchemaError {
    /// Create schema error
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result alias for graph operations
pub type PropertyResult<T> = Result<T, PropertyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display() {
        let err = SchemaError::new("audio", "expected bool");
        assert_eq!(err.to_string(), "invalid 'audio' component: expected bool");
    }

    #[test]
    fn property_error_display() {
        let err = PropertyError::ParentTypeViolation {
            property_type: "AudioEmitter",
            parent: "material".to_string(),
        };
        assert_eq!(err.to_string(), "AudioEmitter cannot have parent material");
    }
}
