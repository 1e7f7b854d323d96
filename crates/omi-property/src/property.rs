//! Property trait
//!
//! A property is typed extension data stored in a [`PropertyGraph`]. Links
//! between properties live in the graph, not in the property, so the graph
//! can re-target them during copies and merges.
//!
//! [`PropertyGraph`]: crate::PropertyGraph

use omi_document::EntityKind;
use std::any::Any;
use std::fmt::{self, Debug};

/// Something a property can be parented to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentType {
    /// Attached directly to a document entity
    Entity(EntityKind),
    /// Held through an owning link by a property of this type
    Property(&'static str),
}

impl fmt::Display for ParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentType::Entity(kind) => write!(f, "{kind}"),
            ParentType::Property(ty) => f.write_str(ty),
        }
    }
}

/// Upcast helper for downcasting trait objects
pub trait AsAny: Any {
    /// `&dyn Any` view
    fn as_any(&self) -> &dyn Any;
    /// `&mut dyn Any` view
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed extension data
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Clone)]
/// struct Light { intensity: f64 }
///
/// impl Property for Light {
///     fn property_type(&self) -> &'static str { "Light" }
///     fn extension_name(&self) -> &'static str { "KHR_lights_punctual" }
///     fn parent_types(&self) -> &'static [ParentType] {
///         &[ParentType::Entity(EntityKind::Node)]
///     }
///     fn clone_property(&self) -> Box<dyn Property> { Box::new(self.clone()) }
/// }
/// ```
pub trait Property: AsAny + Debug + Send + Sync {
    /// Type name, unique per property kind
    fn property_type(&self) -> &'static str;

    /// Extension this property belongs to
    fn extension_name(&self) -> &'static str;

    /// Allowed parents
    ///
    /// May depend on the property's state. An empty slice means the property
    /// can only be reached through weak links.
    fn parent_types(&self) -> &'static [ParentType];

    /// Clone data (links are not part of the property)
    fn clone_property(&self) -> Box<dyn Property>;

    /// Whether `parent` is allowed
    fn allows_parent(&self, parent: ParentType) -> bool {
        self.parent_types().contains(&parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Marker;

    impl Property for Marker {
        fn property_type(&self) -> &'static str {
            "Marker"
        }

        fn extension_name(&self) -> &'static str {
            "EXT_marker"
        }

        fn parent_types(&self) -> &'static [ParentType] {
            &[ParentType::Entity(EntityKind::Node), ParentType::Property("Holder")]
        }

        fn clone_property(&self) -> Box<dyn Property> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn allows_parent_checks_declared_set() {
        let marker = Marker;
        assert!(marker.allows_parent(ParentType::Entity(EntityKind::Node)));
        assert!(marker.allows_parent(ParentType::Property("Holder")));
        assert!(!marker.allows_parent(ParentType::Entity(EntityKind::Scene)));
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn Property> = Box::new(Marker);
        assert!((*boxed).as_any().downcast_ref::<Marker>().is_some());
    }

    #[test]
    fn parent_type_display() {
        assert_eq!(ParentType::Entity(EntityKind::Node).to_string(), "node");
        assert_eq!(ParentType::Property("AudioEmitter").to_string(), "AudioEmitter");
    }
}
