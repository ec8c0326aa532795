//! Class declarations recovered from build scripts.
//!
//! A class declaration is a call like `cc.Class({ name: "Player", ... })`.
//! [`Extractor`] finds them in a [`SyntaxTree`](crate::script::SyntaxTree)
//! and normalizes each descriptor into a [`ClassModel`]; [`Regenerator`]
//! turns a model back into source text that re-extracts to the same model.

mod extract;
mod regenerate;

pub use extract::{classify, Extractor};
pub use regenerate::Regenerator;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::script::{Literal, SyntaxTree};

/// Factory member name recognized by default (`<namespace>.Class`)
pub const DEFAULT_FACTORY: &str = "Class";

/// Lifecycle methods every regenerated class carries as empty stubs
pub const LIFECYCLE_METHODS: [&str; 3] = ["onLoad", "start", "update"];

/// A normalized class declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassModel {
    /// Callee text of the declaration, such as `cc.Class`
    pub factory: String,
    pub name: Option<String>,
    /// Dotted base class path, such as `cc.Component`
    pub extends: Option<String>,
    pub properties: PropertyMap,
}

impl ClassModel {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            name: None,
            extends: None,
            properties: PropertyMap::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Classified value of a descriptor entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum PropertyValue {
    Literal(Literal),
    Object(PropertyMap),
    Array(Vec<PropertyValue>),
    /// A function whose body was discarded
    FunctionMarker,
    MemberPath(String),
    Identifier(String),
    /// Unrecognized syntax, tagged with its node kind
    Opaque(String),
}

impl PropertyValue {
    pub fn is_function(&self) -> bool {
        matches!(self, Self::FunctionMarker)
    }
}

/// Insertion-ordered mapping of property names to values.
///
/// Re-inserting a key replaces its value in place. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Extract every class declaration, with any factory name accepted
pub fn extract(tree: &SyntaxTree) -> Vec<ClassModel> {
    Extractor::new().extract(tree)
}

/// Regenerate source for a model with four-space indentation
pub fn regenerate(model: &ClassModel) -> String {
    Regenerator::default().regenerate(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64) -> PropertyValue {
        PropertyValue::Literal(Literal::Number(n))
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = PropertyMap::new();
        map.insert("a", number(1.0));
        map.insert("b", number(2.0));
        map.insert("a", number(3.0));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&number(3.0)));
    }

    #[test]
    fn test_equality_ignores_order() {
        let left: PropertyMap = [("x".to_string(), number(1.0)), ("y".to_string(), number(2.0))]
            .into_iter()
            .collect();
        let right: PropertyMap = [("y".to_string(), number(2.0)), ("x".to_string(), number(1.0))]
            .into_iter()
            .collect();
        assert_eq!(left, right);

        let different: PropertyMap = [("x".to_string(), number(1.0))].into_iter().collect();
        assert_ne!(left, different);
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut map = PropertyMap::new();
        map.insert("zeta", PropertyValue::FunctionMarker);
        map.insert("alpha", PropertyValue::MemberPath("cc.Node".into()));
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(
            json,
            r#"{"zeta":{"kind":"FunctionMarker"},"alpha":{"kind":"MemberPath","value":"cc.Node"}}"#
        );
    }
}
