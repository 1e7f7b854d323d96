//! Property graph
//!
//! Arena of properties plus the links between them and their attachments to
//! document entities.
//!
//! # Links
//! - **Owned** slots hold at most one target. A property has at most one
//!   owner, and an owned property is never also attached to an entity.
//! - **Weak** slots hold an ordered list of targets and confer no ownership.
//!
//! # Identity
//! [`PropertyGraph::copy`] and [`PropertyGraph::merge_from`] never deep-copy
//! a link target on their own: every target is resolved through a caller
//! supplied or internally threaded old→new map, so a leaf shared by several
//! holders stays shared after the operation.

use crate::error::{PropertyError, PropertyResult};
use crate::property::{AsAny, ParentType, Property};
use indexmap::{Equivalent, IndexMap};
use omi_document::EntityId;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Property handle, unique within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u64);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Link semantics of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Single-valued, exclusive ownership
    Owned,
    /// Multi-valued, no ownership
    Weak,
}

#[derive(Debug, Clone)]
struct Slot {
    kind: LinkKind,
    targets: Vec<PropertyId>,
}

#[derive(Debug)]
struct PropertyNode {
    property: Box<dyn Property>,
    slots: IndexMap<&'static str, Slot>,
}

/// Borrowed form of an attachment key
///
/// Hashes like `(EntityId, &str)` so lookups need no `'static` name.
#[derive(Hash)]
struct AttachmentKey<'a>(EntityId, &'a str);

impl Equivalent<(EntityId, &'static str)> for AttachmentKey<'_> {
    fn equivalent(&self, key: &(EntityId, &'static str)) -> bool {
        self.0 == key.0 && self.1 == key.1
    }
}

/// Arena of properties, links and entity attachments
///
/// Owners and attached entities are indexed in reverse so placement checks
/// stay constant time per property.
#[derive(Debug, Default)]
pub struct PropertyGraph {
    next_id: u64,
    nodes: IndexMap<PropertyId, PropertyNode>,
    attachments: IndexMap<(EntityId, &'static str), PropertyId>,
    owners: HashMap<PropertyId, (PropertyId, &'static str)>,
    attached_to: HashMap<PropertyId, Vec<EntityId>>,
}

impl PropertyGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no properties
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a property; it starts unattached and unlinked
    pub fn create<P: Property>(&mut self, property: P) -> PropertyId {
        self.insert_boxed(Box::new(property))
    }

    /// Add a boxed property
    pub fn insert_boxed(&mut self, property: Box<dyn Property>) -> PropertyId {
        let id = PropertyId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            PropertyNode {
                property,
                slots: IndexMap::new(),
            },
        );
        id
    }

    /// Whether `id` exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Type-erased property
    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<&dyn Property> {
        self.nodes.get(&id).map(|node| &*node.property)
    }

    /// Typed property
    #[must_use]
    pub fn get<T: Property>(&self, id: PropertyId) -> Option<&T> {
        self.nodes
            .get(&id)
            .and_then(|node| (*node.property).as_any().downcast_ref())
    }

    /// Mutable typed property
    pub fn get_mut<T: Property>(&mut self, id: PropertyId) -> Option<&mut T> {
        self.nodes
            .get_mut(&id)
            .and_then(|node| (*node.property).as_any_mut().downcast_mut())
    }

    /// Property type name
    #[must_use]
    pub fn property_type(&self, id: PropertyId) -> Option<&'static str> {
        self.property(id).map(Property::property_type)
    }

    /// All property ids in creation order
    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.nodes.keys().copied()
    }

    /// Properties of one extension, in creation order
    #[must_use]
    pub fn list_by_extension(&self, extension: &str) -> Vec<PropertyId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.property.extension_name() == extension)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Properties of one type, in creation order
    #[must_use]
    pub fn list_by_type(&self, property_type: &str) -> Vec<PropertyId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.property.property_type() == property_type)
            .map(|(id, _)| *id)
            .collect()
    }

    fn node(&self, id: PropertyId) -> PropertyResult<&PropertyNode> {
        self.nodes.get(&id).ok_or(PropertyError::UnknownProperty(id))
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Attach a property to an entity under its extension name
    ///
    /// Replaces any property already attached to `(entity, extension)` and
    /// returns it; the replaced property stays in the graph.
    ///
    /// # Errors
    /// - `UnknownProperty` if `id` is not in the graph
    /// - `ParentTypeViolation` if the entity kind is not an allowed parent
    /// - `ParentCardinality` if the property already has another parent
    pub fn attach(&mut self, entity: EntityId, id: PropertyId) -> PropertyResult<Option<PropertyId>> {
        let node = self.node(id)?;
        let property_type = node.property.property_type();
        let extension = node.property.extension_name();

        if !node.property.allows_parent(ParentType::Entity(entity.kind)) {
            return Err(PropertyError::ParentTypeViolation {
                property_type,
                parent: entity.kind.to_string(),
            });
        }

        if let Some((owner, slot)) = self.owner_of(id) {
            return Err(PropertyError::cardinality(
                id,
                property_type,
                format!("already owned by {owner}.{slot}"),
            ));
        }
        if let Some(other) = self
            .attachments_of(id)
            .into_iter()
            .find(|other| *other != entity)
        {
            return Err(PropertyError::cardinality(
                id,
                property_type,
                format!("already attached to {other}"),
            ));
        }

        let previous = self
            .attachments
            .insert((entity, extension), id)
            .filter(|previous| *previous != id);
        if let Some(previous) = previous {
            self.unindex_attachment(previous, entity);
        }
        let entities = self.attached_to.entry(id).or_default();
        if !entities.contains(&entity) {
            entities.push(entity);
        }
        Ok(previous)
    }

    fn unindex_attachment(&mut self, id: PropertyId, entity: EntityId) {
        if let Some(entities) = self.attached_to.get_mut(&id) {
            entities.retain(|e| *e != entity);
            if entities.is_empty() {
                self.attached_to.remove(&id);
            }
        }
    }

    /// Property attached to `(entity, extension)`
    #[must_use]
    pub fn attachment(&self, entity: EntityId, extension: &str) -> Option<PropertyId> {
        self.attachments
            .get(&AttachmentKey(entity, extension))
            .copied()
    }

    /// Typed property attached to `(entity, extension)`
    #[must_use]
    pub fn attachment_as<T: Property>(&self, entity: EntityId, extension: &str) -> Option<&T> {
        self.attachment(entity, extension).and_then(|id| self.get(id))
    }

    /// Detach whatever is attached to `(entity, extension)`
    pub fn detach(&mut self, entity: EntityId, extension: &str) -> Option<PropertyId> {
        let id = self
            .attachments
            .shift_remove(&AttachmentKey(entity, extension))?;
        self.unindex_attachment(id, entity);
        Some(id)
    }

    /// Entities a property is attached to
    #[must_use]
    pub fn attachments_of(&self, id: PropertyId) -> Vec<EntityId> {
        self.attached_to.get(&id).cloned().unwrap_or_default()
    }

    /// All attachments in insertion order
    pub fn attachments(&self) -> impl Iterator<Item = (EntityId, &'static str, PropertyId)> + '_ {
        self.attachments
            .iter()
            .map(|((entity, ext), id)| (*entity, *ext, *id))
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Set or clear the owning link `holder.slot`
    ///
    /// Returns the previous target, which stays in the graph unowned.
    ///
    /// # Errors
    /// - `UnknownProperty` if holder or target is missing
    /// - `SlotKindMismatch` if the slot holds weak links
    /// - `ParentTypeViolation` if the holder's type is not an allowed parent
    /// - `ParentCardinality` if the target already has another parent
    pub fn set_reference(
        &mut self,
        holder: PropertyId,
        slot: &'static str,
        target: Option<PropertyId>,
    ) -> PropertyResult<Option<PropertyId>> {
        let holder_type = self.node(holder)?.property.property_type();
        if let Some(existing) = self.node(holder)?.slots.get(slot) {
            if existing.kind != LinkKind::Owned {
                return Err(PropertyError::SlotKindMismatch {
                    slot,
                    existing: existing.kind,
                });
            }
        }

        if let Some(target) = target {
            self.check_ownable(holder, holder_type, slot, target)?;
        }

        let node = self
            .nodes
            .get_mut(&holder)
            .ok_or(PropertyError::UnknownProperty(holder))?;
        let previous = match target {
            Some(target) => node.slots.insert(
                slot,
                Slot {
                    kind: LinkKind::Owned,
                    targets: vec![target],
                },
            ),
            None => node.slots.shift_remove(slot),
        };
        let previous = previous
            .and_then(|s| s.targets.first().copied())
            .filter(|prev| Some(*prev) != target);

        if let Some(previous) = previous {
            self.owners.remove(&previous);
        }
        if let Some(target) = target {
            self.owners.insert(target, (holder, slot));
        }
        Ok(previous)
    }

    fn check_ownable(
        &self,
        holder: PropertyId,
        holder_type: &'static str,
        slot: &'static str,
        target: PropertyId,
    ) -> PropertyResult<()> {
        let target_node = self.node(target)?;
        let target_type = target_node.property.property_type();

        if target == holder {
            return Err(PropertyError::cardinality(target, target_type, "cannot own itself"));
        }
        if !target_node
            .property
            .allows_parent(ParentType::Property(holder_type))
        {
            return Err(PropertyError::ParentTypeViolation {
                property_type: target_type,
                parent: holder_type.to_string(),
            });
        }
        if let Some((owner, owner_slot)) = self.owner_of(target) {
            if owner != holder || owner_slot != slot {
                return Err(PropertyError::cardinality(
                    target,
                    target_type,
                    format!("already owned by {owner}.{owner_slot}"),
                ));
            }
        }
        if let Some(entity) = self.attachments_of(target).first() {
            return Err(PropertyError::cardinality(
                target,
                target_type,
                format!("already attached to {entity}"),
            ));
        }
        Ok(())
    }

    /// Target of the owning link `holder.slot`
    #[must_use]
    pub fn reference(&self, holder: PropertyId, slot: &str) -> Option<PropertyId> {
        self.nodes
            .get(&holder)
            .and_then(|node| node.slots.get(slot))
            .filter(|s| s.kind == LinkKind::Owned)
            .and_then(|s| s.targets.first().copied())
    }

    /// Append a weak link `holder.slot -> target`
    ///
    /// # Errors
    /// - `UnknownProperty` if holder or target is missing
    /// - `SlotKindMismatch` if the slot holds an owning link
    pub fn add_weak_reference(
        &mut self,
        holder: PropertyId,
        slot: &'static str,
        target: PropertyId,
    ) -> PropertyResult<()> {
        self.node(target)?;
        let node = self
            .nodes
            .get_mut(&holder)
            .ok_or(PropertyError::UnknownProperty(holder))?;
        let entry = node.slots.entry(slot).or_insert_with(|| Slot {
            kind: LinkKind::Weak,
            targets: Vec::new(),
        });
        if entry.kind != LinkKind::Weak {
            return Err(PropertyError::SlotKindMismatch {
                slot,
                existing: entry.kind,
            });
        }
        entry.targets.push(target);
        Ok(())
    }

    /// Remove every weak link `holder.slot -> target`
    pub fn remove_weak_reference(&mut self, holder: PropertyId, slot: &str, target: PropertyId) -> bool {
        let Some(entry) = self
            .nodes
            .get_mut(&holder)
            .and_then(|node| node.slots.get_mut(slot))
            .filter(|s| s.kind == LinkKind::Weak)
        else {
            return false;
        };
        let before = entry.targets.len();
        entry.targets.retain(|t| *t != target);
        before != entry.targets.len()
    }

    /// Targets of `holder.slot`, in insertion order
    #[must_use]
    pub fn references(&self, holder: PropertyId, slot: &str) -> &[PropertyId] {
        self.nodes
            .get(&holder)
            .and_then(|node| node.slots.get(slot))
            .map(|s| s.targets.as_slice())
            .unwrap_or_default()
    }

    /// Owner of `id` and the slot holding it
    #[must_use]
    pub fn owner_of(&self, id: PropertyId) -> Option<(PropertyId, &'static str)> {
        self.owners.get(&id).copied()
    }

    /// Properties holding a weak link to `id`, one entry per link
    #[must_use]
    pub fn weak_referrers_of(&self, id: PropertyId) -> Vec<(PropertyId, &'static str)> {
        let mut out = Vec::new();
        for (holder, node) in &self.nodes {
            for (slot, s) in &node.slots {
                if s.kind == LinkKind::Weak {
                    out.extend(s.targets.iter().filter(|t| **t == id).map(|_| (*holder, *slot)));
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Dispose a property and everything it owns
    ///
    /// Links and attachments pointing at removed properties are cleared.
    ///
    /// # Errors
    /// Returns `UnknownProperty` if `id` is not in the graph
    pub fn remove(&mut self, id: PropertyId) -> PropertyResult<()> {
        self.node(id)?;

        let mut doomed = HashSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !doomed.insert(next) {
                continue;
            }
            if let Some(node) = self.nodes.get(&next) {
                for s in node.slots.values().filter(|s| s.kind == LinkKind::Owned) {
                    stack.extend(s.targets.iter().copied());
                }
            }
        }

        self.nodes.retain(|id, _| !doomed.contains(id));
        self.attachments.retain(|_, target| !doomed.contains(target));
        self.attached_to.retain(|target, _| !doomed.contains(target));
        self.owners
            .retain(|target, owner| !doomed.contains(target) && !doomed.contains(&owner.0));
        for node in self.nodes.values_mut() {
            for s in node.slots.values_mut() {
                s.targets.retain(|t| !doomed.contains(t));
            }
            node.slots
                .retain(|_, s| s.kind == LinkKind::Weak || !s.targets.is_empty());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy / clone / merge
    // ------------------------------------------------------------------

    /// Copy `src` onto `dest`, re-targeting every link through `resolve`
    ///
    /// `dest` receives a clone of `src`'s data and one link per `src` link,
    /// pointing at `resolve(old_target)`. Previous links of `dest` are
    /// replaced.
    ///
    /// # Errors
    /// - `UnknownProperty` if either property is missing
    /// - `TypeMismatch` if the two property types differ
    /// - `ReferenceResolution` if `resolve` returns `None`, or a property
    ///   that is not in the graph
    /// - `ParentCardinality` if a resolved owned target is already owned
    ///   elsewhere
    pub fn copy<F>(&mut self, dest: PropertyId, src: PropertyId, mut resolve: F) -> PropertyResult<()>
    where
        F: FnMut(PropertyId) -> Option<PropertyId>,
    {
        let expected = self.node(dest)?.property.property_type();
        let src_node = self.node(src)?;
        let actual = src_node.property.property_type();
        if expected != actual {
            return Err(PropertyError::TypeMismatch { expected, actual });
        }

        let data = src_node.property.clone_property();
        let slots = resolve_slots(src, &src_node.slots, |t| {
            resolve(t).filter(|new| self.contains(*new))
        })?;

        for (slot, s) in &slots {
            if s.kind == LinkKind::Owned {
                for target in &s.targets {
                    if let Some((owner, owner_slot)) = self.owner_of(*target) {
                        if owner != dest || owner_slot != *slot {
                            return Err(PropertyError::cardinality(
                                *target,
                                self.property_type(*target).unwrap_or("unknown"),
                                format!("already owned by {owner}.{owner_slot}"),
                            ));
                        }
                    }
                }
            }
        }

        let node = self
            .nodes
            .get_mut(&dest)
            .ok_or(PropertyError::UnknownProperty(dest))?;
        node.property = data;
        self.replace_slots(dest, slots);
        Ok(())
    }

    /// Swap in new slots for `holder`, keeping the owner index in step
    fn replace_slots(&mut self, holder: PropertyId, slots: IndexMap<&'static str, Slot>) {
        let Some(node) = self.nodes.get_mut(&holder) else {
            return;
        };
        let old = std::mem::replace(&mut node.slots, slots);
        for s in old.values().filter(|s| s.kind == LinkKind::Owned) {
            for target in &s.targets {
                if self.owners.get(target).is_some_and(|(owner, _)| *owner == holder) {
                    self.owners.remove(target);
                }
            }
        }
        if let Some(node) = self.nodes.get(&holder) {
            for (slot, s) in &node.slots {
                if s.kind == LinkKind::Owned {
                    for target in &s.targets {
                        self.owners.insert(*target, (holder, *slot));
                    }
                }
            }
        }
    }

    /// Clone a property together with everything it owns
    ///
    /// Weak links leaving the cloned subtree keep their original targets.
    ///
    /// # Errors
    /// Returns `UnknownProperty` if `root` is not in the graph
    pub fn clone_subtree(&mut self, root: PropertyId) -> PropertyResult<PropertyId> {
        self.node(root)?;

        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(next) = stack.pop() {
            if order.contains(&next) {
                continue;
            }
            order.push(next);
            if let Some(node) = self.nodes.get(&next) {
                for s in node.slots.values().filter(|s| s.kind == LinkKind::Owned) {
                    stack.extend(s.targets.iter().copied());
                }
            }
        }

        let mut map = HashMap::new();
        for old in &order {
            let data = self.node(*old)?.property.clone_property();
            map.insert(*old, self.insert_boxed(data));
        }
        for old in &order {
            self.copy(map[old], *old, |t| map.get(&t).copied().or(Some(t)))?;
        }
        Ok(map[&root])
    }

    /// Merge every property of `other` into this graph
    ///
    /// Each property of `other` is cloned exactly once. Links are resolved
    /// through one old→new map, so identity sharing inside `other` is
    /// preserved. Attachments are carried over with entities remapped by
    /// `entity_map`.
    ///
    /// # Errors
    /// - `UnmappedEntity` if `entity_map` has no counterpart for an attachment
    /// - Any attach error from the remapped attachments
    pub fn merge_from<F>(
        &mut self,
        other: &PropertyGraph,
        mut entity_map: F,
    ) -> PropertyResult<HashMap<PropertyId, PropertyId>>
    where
        F: FnMut(EntityId) -> Option<EntityId>,
    {
        let mut map = HashMap::with_capacity(other.len());
        for (old, node) in &other.nodes {
            map.insert(*old, self.insert_boxed(node.property.clone_property()));
        }

        for (old, node) in &other.nodes {
            let slots = resolve_slots(*old, &node.slots, |t| map.get(&t).copied())?;
            self.replace_slots(map[old], slots);
        }

        for ((entity, _), old) in &other.attachments {
            let target = entity_map(*entity).ok_or(PropertyError::UnmappedEntity(*entity))?;
            self.attach(target, map[old])?;
        }

        Ok(map)
    }
}

fn resolve_slots<F>(
    holder: PropertyId,
    slots: &IndexMap<&'static str, Slot>,
    mut resolve: F,
) -> PropertyResult<IndexMap<&'static str, Slot>>
where
    F: FnMut(PropertyId) -> Option<PropertyId>,
{
    let mut out = IndexMap::with_capacity(slots.len());
    for (name, slot) in slots {
        let targets = slot
            .targets
            .iter()
            .map(|t| resolve(*t).ok_or_else(|| PropertyError::unresolved(holder, *name, *t)))
            .collect::<PropertyResult<Vec<_>>>()?;
        out.insert(
            *name,
            Slot {
                kind: slot.kind,
                targets,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omi_document::EntityKind;

    const NODE: ParentType = ParentType::Entity(EntityKind::Node);

    #[derive(Debug, Clone, PartialEq)]
    struct Holder {
        label: &'static str,
    }

    impl Property for Holder {
        fn property_type(&self) -> &'static str {
            "Holder"
        }
        fn extension_name(&self) -> &'static str {
            "EXT_test"
        }
        fn parent_types(&self) -> &'static [ParentType] {
            &[NODE]
        }
        fn clone_property(&self) -> Box<dyn Property> {
            Box::new(self.clone())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Leaf {
        value: u32,
    }

    impl Property for Leaf {
        fn property_type(&self) -> &'static str {
            "Leaf"
        }
        fn extension_name(&self) -> &'static str {
            "EXT_test"
        }
        fn parent_types(&self) -> &'static [ParentType] {
            &[ParentType::Property("Holder")]
        }
        fn clone_property(&self) -> Box<dyn Property> {
            Box::new(self.clone())
        }
    }

    fn holder(graph: &mut PropertyGraph, label: &'static str) -> PropertyId {
        graph.create(Holder { label })
    }

    #[test]
    fn create_and_downcast() {
        let mut graph = PropertyGraph::new();
        let id = graph.create(Leaf { value: 7 });

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get::<Leaf>(id), Some(&Leaf { value: 7 }));
        assert!(graph.get::<Holder>(id).is_none());

        graph.get_mut::<Leaf>(id).unwrap().value = 8;
        assert_eq!(graph.get::<Leaf>(id).unwrap().value, 8);
    }

    #[test]
    fn attach_checks_parent_kind() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");

        assert!(graph.attach(EntityId::node(0), h).is_ok());
        let err = graph.attach(EntityId::material(0), h).unwrap_err();
        assert!(matches!(err, PropertyError::ParentTypeViolation { .. }));
    }

    #[test]
    fn attach_rejects_second_entity() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        graph.attach(EntityId::node(0), h).unwrap();

        let err = graph.attach(EntityId::node(1), h).unwrap_err();
        assert!(matches!(err, PropertyError::ParentCardinality { .. }));
        // Re-attaching to the same entity is fine.
        assert_eq!(graph.attach(EntityId::node(0), h).unwrap(), None);
    }

    #[test]
    fn attach_replaces_per_extension() {
        let mut graph = PropertyGraph::new();
        let a = holder(&mut graph, "a");
        let b = holder(&mut graph, "b");
        graph.attach(EntityId::node(0), a).unwrap();

        let previous = graph.attach(EntityId::node(0), b).unwrap();
        assert_eq!(previous, Some(a));
        assert_eq!(graph.attachment(EntityId::node(0), "EXT_test"), Some(b));
        assert_eq!(graph.attachment_as::<Holder>(EntityId::node(0), "EXT_test").unwrap().label, "b");
    }

    #[test]
    fn detach_returns_attachment() {
        let mut graph = PropertyGraph::new();
        let a = holder(&mut graph, "a");
        graph.attach(EntityId::node(2), a).unwrap();

        assert_eq!(graph.detach(EntityId::node(2), "EXT_test"), Some(a));
        assert_eq!(graph.detach(EntityId::node(2), "EXT_test"), None);
        assert!(graph.contains(a));
    }

    #[test]
    fn set_reference_and_clear() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let leaf = graph.create(Leaf { value: 1 });

        assert_eq!(graph.set_reference(h, "leaf", Some(leaf)).unwrap(), None);
        assert_eq!(graph.reference(h, "leaf"), Some(leaf));
        assert_eq!(graph.owner_of(leaf), Some((h, "leaf")));

        assert_eq!(graph.set_reference(h, "leaf", None).unwrap(), Some(leaf));
        assert_eq!(graph.reference(h, "leaf"), None);
        assert_eq!(graph.owner_of(leaf), None);
    }

    #[test]
    fn set_reference_rejects_second_owner() {
        let mut graph = PropertyGraph::new();
        let a = holder(&mut graph, "a");
        let b = holder(&mut graph, "b");
        let leaf = graph.create(Leaf { value: 1 });

        graph.set_reference(a, "leaf", Some(leaf)).unwrap();
        let err = graph.set_reference(b, "leaf", Some(leaf)).unwrap_err();
        assert!(matches!(err, PropertyError::ParentCardinality { .. }));
    }

    #[test]
    fn set_reference_checks_parent_type() {
        let mut graph = PropertyGraph::new();
        let leaf_a = graph.create(Leaf { value: 1 });
        let leaf_b = graph.create(Leaf { value: 2 });

        let err = graph.set_reference(leaf_a, "child", Some(leaf_b)).unwrap_err();
        assert!(matches!(err, PropertyError::ParentTypeViolation { .. }));
    }

    #[test]
    fn weak_links_keep_order() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let a = graph.create(Leaf { value: 1 });
        let b = graph.create(Leaf { value: 2 });

        graph.add_weak_reference(h, "items", b).unwrap();
        graph.add_weak_reference(h, "items", a).unwrap();
        assert_eq!(graph.references(h, "items"), &[b, a]);
        assert_eq!(graph.weak_referrers_of(a), vec![(h, "items")]);

        assert!(graph.remove_weak_reference(h, "items", b));
        assert!(!graph.remove_weak_reference(h, "items", b));
        assert_eq!(graph.references(h, "items"), &[a]);
    }

    #[test]
    fn slot_kinds_do_not_mix() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let leaf = graph.create(Leaf { value: 1 });

        graph.add_weak_reference(h, "slot", leaf).unwrap();
        let err = graph.set_reference(h, "slot", Some(leaf)).unwrap_err();
        assert!(matches!(err, PropertyError::SlotKindMismatch { existing: LinkKind::Weak, .. }));
    }

    #[test]
    fn remove_cascades_owned_and_clears_links() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let list = holder(&mut graph, "list");
        let leaf = graph.create(Leaf { value: 1 });
        graph.set_reference(h, "leaf", Some(leaf)).unwrap();
        graph.add_weak_reference(list, "items", h).unwrap();
        graph.attach(EntityId::node(0), h).unwrap();

        graph.remove(h).unwrap();

        assert!(!graph.contains(h));
        assert!(!graph.contains(leaf));
        assert!(graph.references(list, "items").is_empty());
        assert_eq!(graph.attachment(EntityId::node(0), "EXT_test"), None);
    }

    #[test]
    fn copy_resolves_links_through_callback() {
        let mut graph = PropertyGraph::new();
        let src = holder(&mut graph, "src");
        let dest = holder(&mut graph, "dest");
        let old_leaf = graph.create(Leaf { value: 1 });
        let new_leaf = graph.create(Leaf { value: 1 });
        graph.set_reference(src, "leaf", Some(old_leaf)).unwrap();

        graph
            .copy(dest, src, |t| (t == old_leaf).then_some(new_leaf))
            .unwrap();

        assert_eq!(graph.get::<Holder>(dest).unwrap().label, "src");
        assert_eq!(graph.reference(dest, "leaf"), Some(new_leaf));
        assert_eq!(graph.reference(src, "leaf"), Some(old_leaf));
    }

    #[test]
    fn copy_fails_on_unresolved_target() {
        let mut graph = PropertyGraph::new();
        let src = holder(&mut graph, "src");
        let dest = holder(&mut graph, "dest");
        let leaf = graph.create(Leaf { value: 1 });
        graph.set_reference(src, "leaf", Some(leaf)).unwrap();

        let err = graph.copy(dest, src, |_| None).unwrap_err();
        assert!(matches!(err, PropertyError::ReferenceResolution { target, .. } if target == leaf));
    }

    #[test]
    fn copy_identity_on_owned_link_violates_cardinality() {
        let mut graph = PropertyGraph::new();
        let src = holder(&mut graph, "src");
        let dest = holder(&mut graph, "dest");
        let leaf = graph.create(Leaf { value: 1 });
        graph.set_reference(src, "leaf", Some(leaf)).unwrap();

        let err = graph.copy(dest, src, Some).unwrap_err();
        assert!(matches!(err, PropertyError::ParentCardinality { .. }));
    }

    #[test]
    fn copy_rejects_type_mismatch() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let leaf = graph.create(Leaf { value: 1 });
        assert!(matches!(
            graph.copy(h, leaf, Some),
            Err(PropertyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn clone_subtree_duplicates_owned_keeps_weak() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let leaf = graph.create(Leaf { value: 5 });
        let shared = graph.create(Leaf { value: 9 });
        graph.set_reference(h, "leaf", Some(leaf)).unwrap();
        graph.add_weak_reference(h, "seen", shared).unwrap();

        let copy = graph.clone_subtree(h).unwrap();

        let copied_leaf = graph.reference(copy, "leaf").unwrap();
        assert_ne!(copied_leaf, leaf);
        assert_eq!(graph.get::<Leaf>(copied_leaf).unwrap().value, 5);
        assert_eq!(graph.references(copy, "seen"), &[shared]);
    }

    #[test]
    fn merge_preserves_shared_identity() {
        let mut other = PropertyGraph::new();
        let a = holder(&mut other, "a");
        let b = holder(&mut other, "b");
        let list = holder(&mut other, "list");
        let leaf = other.create(Leaf { value: 3 });
        other.set_reference(a, "leaf", Some(leaf)).unwrap();
        // `leaf` is reachable from `a` (owned) and from `list` twice (weak).
        other.add_weak_reference(list, "items", leaf).unwrap();
        other.add_weak_reference(b, "items", leaf).unwrap();
        other.attach(EntityId::node(0), a).unwrap();

        let mut graph = PropertyGraph::new();
        let _existing = holder(&mut graph, "existing");
        let map = graph
            .merge_from(&other, |e| Some(EntityId::node(e.index + 10)))
            .unwrap();

        assert_eq!(graph.len(), 5);
        let new_leaf = map[&leaf];
        assert_eq!(graph.reference(map[&a], "leaf"), Some(new_leaf));
        assert_eq!(graph.references(map[&list], "items"), &[new_leaf]);
        assert_eq!(graph.references(map[&b], "items"), &[new_leaf]);
        assert_eq!(graph.attachment(EntityId::node(10), "EXT_test"), Some(map[&a]));
        assert_eq!(graph.owner_of(new_leaf), Some((map[&a], "leaf")));
        assert_eq!(graph.attachments_of(map[&a]), vec![EntityId::node(10)]);
    }

    #[test]
    fn owner_index_follows_relinking() {
        let mut graph = PropertyGraph::new();
        let h = holder(&mut graph, "h");
        let first = graph.create(Leaf { value: 1 });
        let second = graph.create(Leaf { value: 2 });

        graph.set_reference(h, "leaf", Some(first)).unwrap();
        assert_eq!(graph.set_reference(h, "leaf", Some(second)).unwrap(), Some(first));
        assert_eq!(graph.owner_of(first), None);
        assert_eq!(graph.owner_of(second), Some((h, "leaf")));

        // Copying onto `h` drops its old owned link from the index.
        let other = holder(&mut graph, "other");
        graph.copy(h, other, Some).unwrap();
        assert_eq!(graph.owner_of(second), None);
        graph.set_reference(other, "leaf", Some(second)).unwrap();
        assert_eq!(graph.owner_of(second), Some((other, "leaf")));

        graph.remove(second).unwrap();
        assert_eq!(graph.reference(other, "leaf"), None);
        assert_eq!(graph.owner_of(second), None);
        assert!(graph.set_reference(other, "leaf", Some(first)).is_ok());
    }

    #[test]
    fn attachment_index_follows_replace_and_detach() {
        let mut graph = PropertyGraph::new();
        let a = holder(&mut graph, "a");
        let b = holder(&mut graph, "b");
        let node = EntityId::node(3);

        graph.attach(node, a).unwrap();
        assert_eq!(graph.attachments_of(a), vec![node]);

        graph.attach(node, b).unwrap();
        assert!(graph.attachments_of(a).is_empty());
        // `a` is free again and may go elsewhere.
        graph.attach(EntityId::node(4), a).unwrap();

        let extension = String::from("EXT_test");
        assert_eq!(graph.attachment(node, &extension), Some(b));
        assert_eq!(graph.detach(node, &extension), Some(b));
        assert!(graph.attachments_of(b).is_empty());
        assert_eq!(graph.attachment(node, &extension), None);
    }

    #[test]
    fn merge_requires_entity_mapping() {
        let mut other = PropertyGraph::new();
        let a = holder(&mut other, "a");
        other.attach(EntityId::node(0), a).unwrap();

        let mut graph = PropertyGraph::new();
        let err = graph.merge_from(&other, |_| None).unwrap_err();
        assert_eq!(err, PropertyError::UnmappedEntity(EntityId::node(0)));
    }

    #[test]
    fn list_by_extension_in_creation_order() {
        let mut graph = PropertyGraph::new();
        let a = holder(&mut graph, "a");
        let leaf = graph.create(Leaf { value: 1 });
        let b = holder(&mut graph, "b");

        assert_eq!(graph.list_by_extension("EXT_test"), vec![a, leaf, b]);
        assert_eq!(graph.list_by_type("Holder"), vec![a, b]);
        assert!(graph.list_by_extension("EXT_other").is_empty());
    }
}
