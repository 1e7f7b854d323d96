//! Components and the component registry
//!
//! A component is one named entry of a legacy components block, such as
//! `audio` or `audio-params`. The registry maps a component name to the
//! function that decodes it; encoding is a method on the component itself.

use crate::error::SchemaError;
use crate::property::AsAny;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{self, Debug};

/// Named flat record inside a components container
pub trait Component: AsAny + Debug + Send + Sync {
    /// Key under which the component is stored
    fn name(&self) -> &'static str;

    /// JSON form written back into the legacy block
    fn encode(&self) -> Value;

    /// Boxed clone
    fn clone_component(&self) -> Box<dyn Component>;
}

/// Decode function installed for one component name
pub type ComponentDecoder = fn(&Value) -> Result<Box<dyn Component>, SchemaError>;

/// Name → decoder table, populated before any document is read
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    decoders: IndexMap<String, ComponentDecoder>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl ComponentRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder; an existing entry for `name` is replaced and returned
    pub fn register(
        &mut self,
        name: impl Into<String>,
        decoder: ComponentDecoder,
    ) -> Option<ComponentDecoder> {
        self.decoders.insert(name.into(), decoder)
    }

    /// Builder form of [`ComponentRegistry::register`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, decoder: ComponentDecoder) -> Self {
        self.register(name, decoder);
        self
    }

    /// Decode `value` as component `name`
    ///
    /// Returns `None` when no decoder is registered for `name`.
    #[must_use]
    pub fn decode(&self, name: &str, value: &Value) -> Option<Result<Box<dyn Component>, SchemaError>> {
        self.decoders.get(name).map(|decode| decode(value))
    }

    /// Whether `name` has a decoder
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Number of registered names
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Decode a component through its serde representation
///
/// # Errors
/// Returns `SchemaError` naming `component` when `value` does not match `T`
pub fn decode_serde<T>(component: &str, value: &Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value.clone()).map_err(|e| SchemaError::new(component, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Label {
        text: String,
    }

    impl Component for Label {
        fn name(&self) -> &'static str {
            "label"
        }

        fn encode(&self) -> Value {
            serde_json::to_value(self).unwrap_or(Value::Null)
        }

        fn clone_component(&self) -> Box<dyn Component> {
            Box::new(self.clone())
        }
    }

    fn decode_label(value: &Value) -> Result<Box<dyn Component>, SchemaError> {
        decode_serde::<Label>("label", value).map(|c| Box::new(c) as Box<dyn Component>)
    }

    fn decode_nothing(_: &Value) -> Result<Box<dyn Component>, SchemaError> {
        Err(SchemaError::new("label", "always fails"))
    }

    #[test]
    fn decode_registered_name() {
        let registry = ComponentRegistry::new().with("label", decode_label);

        let component = registry
            .decode("label", &json!({"text": "hi"}))
            .unwrap()
            .unwrap();
        let label = (*component).as_any().downcast_ref::<Label>().unwrap();
        assert_eq!(label.text, "hi");
        assert_eq!(component.encode(), json!({"text": "hi"}));
    }

    #[test]
    fn unregistered_name_is_not_an_error() {
        let registry = ComponentRegistry::new();
        assert!(registry.decode("label", &json!({})).is_none());
    }

    #[test]
    fn schema_mismatch_reports_component() {
        let registry = ComponentRegistry::new().with("label", decode_label);
        let err = registry.decode("label", &json!({"text": 3})).unwrap().unwrap_err();
        assert_eq!(err.component, "label");
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.register("label", decode_label).is_none());
        assert!(registry.register("label", decode_nothing).is_some());

        assert_eq!(registry.len(), 1);
        assert!(registry.decode("label", &json!({"text": "x"})).unwrap().is_err());
    }
}
