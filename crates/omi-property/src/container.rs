//! Per-entity components container

use crate::component::Component;
use crate::property::{AsAny, ParentType, Property};
use indexmap::IndexMap;
use omi_document::EntityKind;
use serde_json::{Map, Value};

const CONTAINER_PARENTS: &[ParentType] = &[
    ParentType::Entity(EntityKind::Scene),
    ParentType::Entity(EntityKind::Node),
    ParentType::Entity(EntityKind::Material),
];

/// One entry of a container
#[derive(Debug)]
enum Entry {
    Decoded(Box<dyn Component>),
    Raw(Value),
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        match self {
            Self::Decoded(component) => Self::Decoded(component.clone_component()),
            Self::Raw(value) => Self::Raw(value.clone()),
        }
    }
}

/// Components of one legacy extension block on one entity
///
/// Entries that could not be decoded are kept raw and written back
/// unchanged, so unknown component kinds survive a read/write cycle. Decoded
/// and raw entries share one insertion order.
#[derive(Debug, Clone)]
pub struct ComponentContainer {
    extension: &'static str,
    entries: IndexMap<String, Entry>,
}

impl ComponentContainer {
    /// Property type of every container
    pub const PROPERTY_TYPE: &'static str = "HubsComponents";

    /// Create empty container for `extension`
    #[must_use]
    pub fn new(extension: &'static str) -> Self {
        Self {
            extension,
            entries: IndexMap::new(),
        }
    }

    /// Insert a component under its own name
    ///
    /// Returns the component it replaced. A raw entry of the same name is
    /// dropped; the new component takes its position.
    pub fn add(&mut self, component: Box<dyn Component>) -> Option<Box<dyn Component>> {
        let name = component.name().to_string();
        match self.entries.insert(name, Entry::Decoded(component)) {
            Some(Entry::Decoded(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Component by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        match self.entries.get(name) {
            Some(Entry::Decoded(component)) => Some(&**component),
            _ => None,
        }
    }

    /// Typed component by name
    #[must_use]
    pub fn get_as<T: Component>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(|c| c.as_any().downcast_ref())
    }

    /// Whether a decoded component `name` exists
    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Entry::Decoded(_)))
    }

    /// Remove component `name`; returns whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        if self.has(name) {
            self.entries.shift_remove(name);
            true
        } else {
            false
        }
    }

    /// Decoded components in insertion order
    pub fn components(&self) -> impl Iterator<Item = (&str, &dyn Component)> {
        self.entries.iter().filter_map(|(k, entry)| match entry {
            Entry::Decoded(component) => Some((k.as_str(), &**component)),
            Entry::Raw(_) => None,
        })
    }

    /// Keep an undecoded entry verbatim
    pub fn retain_raw(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), Entry::Raw(value));
    }

    /// Undecoded entries in insertion order
    #[must_use]
    pub fn retained(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|(k, entry)| match entry {
                Entry::Raw(value) => Some((k.clone(), value.clone())),
                Entry::Decoded(_) => None,
            })
            .collect()
    }

    /// No components and no retained entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON block with every entry in insertion order
    #[must_use]
    pub fn encode(&self) -> Value {
        let block = self
            .entries
            .iter()
            .map(|(name, entry)| {
                let value = match entry {
                    Entry::Decoded(component) => component.encode(),
                    Entry::Raw(value) => value.clone(),
                };
                (name.clone(), value)
            })
            .collect();
        Value::Object(block)
    }
}

impl Property for ComponentContainer {
    fn property_type(&self) -> &'static str {
        Self::PROPERTY_TYPE
    }

    fn extension_name(&self) -> &'static str {
        self.extension
    }

    fn parent_types(&self) -> &'static [ParentType] {
        CONTAINER_PARENTS
    }

    fn clone_property(&self) -> Box<dyn Property> {
        Box::new(self.clone())
    }
}
