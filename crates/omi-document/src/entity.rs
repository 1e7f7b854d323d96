//! Entity handles
//!
//! Entities are owned by the host document. Everything else refers to them
//! through [`EntityId`], a `(kind, index)` pair into the document's arrays.

use std::fmt;

/// Kinds of document entities that can carry extension metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// `scenes[i]`
    Scene,
    /// `nodes[i]`
    Node,
    /// `materials[i]`
    Material,
    /// `buffers[i]`
    Buffer,
}

impl EntityKind {
    /// All kinds, in declaration order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Scene,
        EntityKind::Node,
        EntityKind::Material,
        EntityKind::Buffer,
    ];

    /// Top-level JSON array holding entities of this kind
    #[inline]
    #[must_use]
    pub fn json_key(self) -> &'static str {
        match self {
            EntityKind::Scene => "scenes",
            EntityKind::Node => "nodes",
            EntityKind::Material => "materials",
            EntityKind::Buffer => "buffers",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Scene => "scene",
            EntityKind::Node => "node",
            EntityKind::Material => "material",
            EntityKind::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

/// Handle to one entity of the host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    /// Entity kind
    pub kind: EntityKind,
    /// Index into the kind's JSON array
    pub index: usize,
}

impl EntityId {
    /// Create a handle
    #[inline]
    #[must_use]
    pub const fn new(kind: EntityKind, index: usize) -> Self {
        Self { kind, index }
    }

    /// Scene handle
    #[inline]
    #[must_use]
    pub const fn scene(index: usize) -> Self {
        Self::new(EntityKind::Scene, index)
    }

    /// Node handle
    #[inline]
    #[must_use]
    pub const fn node(index: usize) -> Self {
        Self::new(EntityKind::Node, index)
    }

    /// Material handle
    #[inline]
    #[must_use]
    pub const fn material(index: usize) -> Self {
        Self::new(EntityKind::Material, index)
    }

    /// Buffer handle
    #[inline]
    #[must_use]
    pub const fn buffer(index: usize) -> Self {
        Self::new(EntityKind::Buffer, index)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys() {
        assert_eq!(EntityKind::Scene.json_key(), "scenes");
        assert_eq!(EntityKind::Node.json_key(), "nodes");
        assert_eq!(EntityKind::Material.json_key(), "materials");
        assert_eq!(EntityKind::Buffer.json_key(), "buffers");
    }

    #[test]
    fn entity_display() {
        assert_eq!(EntityId::node(3).to_string(), "node[3]");
        assert_eq!(EntityId::scene(0).to_string(), "scene[0]");
    }

    #[test]
    fn entity_ordering_groups_by_kind() {
        let mut ids = vec![EntityId::node(1), EntityId::scene(2), EntityId::node(0)];
        ids.sort();
        assert_eq!(ids, vec![EntityId::scene(2), EntityId::node(0), EntityId::node(1)]);
    }
}
