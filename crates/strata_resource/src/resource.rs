//! Resource identity and values.
//!
//! A [`Resource`] is one typed, identifiable entity exposed through the API.
//! Its identity is a [`ResourceKey`], the pair of its [`ResourceType`] and its
//! string identifier. Attribute values are kept as JSON values; the hook
//! engine never interprets them.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// ResourceType
// ─────────────────────────────────────────────────────────────────────────────

/// Public name of a resource type (e.g. `"articles"`).
///
/// Cloning is cheap: the name is shared behind an [`Arc`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceType(Arc<str>);

impl ResourceType {
    /// Creates a resource type from its public name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the public name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceType {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl PartialEq<str> for ResourceType {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ResourceType {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceKey
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a resource: its type plus its string identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    resource_type: ResourceType,
    id: String,
}

impl ResourceKey {
    /// Creates a key from a type and identifier.
    #[must_use]
    pub fn new(resource_type: impl Into<ResourceType>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the string identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource
// ─────────────────────────────────────────────────────────────────────────────

/// A single resource value.
///
/// Relationships are not stored on the resource itself; they live as explicit
/// slots in the [`ResourceTree`](crate::tree::ResourceTree) that owns it.
///
/// # Example
///
/// ```
/// use strata_resource::Resource;
///
/// let article = Resource::new("articles", "1").with_attribute("title", "Hello");
/// assert_eq!(article.id(), "1");
/// assert_eq!(article.attribute("title"), Some(&serde_json::json!("Hello")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    key: ResourceKey,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl Resource {
    /// Creates a resource with no attributes.
    #[must_use]
    pub fn new(resource_type: impl Into<ResourceType>, id: impl Into<String>) -> Self {
        Self {
            key: ResourceKey::new(resource_type, id),
            attributes: Map::new(),
        }
    }

    /// Creates a resource with no attributes from an existing key.
    #[must_use]
    pub fn from_key(key: ResourceKey) -> Self {
        Self {
            key,
            attributes: Map::new(),
        }
    }

    /// Sets an attribute value, returning the updated resource.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the resource key.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        self.key.resource_type()
    }

    /// Returns the string identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Sets an attribute value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_type_compares_with_str() {
        let articles = ResourceType::new("articles");
        assert_eq!(articles, "articles");
        assert_eq!(articles.to_string(), "articles");
    }

    #[test]
    fn key_display_includes_type_and_id() {
        let key = ResourceKey::new("people", "7");
        assert_eq!(key.to_string(), "people:7");
    }

    #[test]
    fn attributes_round_trip_through_setters() {
        let mut person = Resource::new("people", "1").with_attribute("name", "Ada");
        person.set_attribute("age", 36);

        assert_eq!(person.attribute("name"), Some(&json!("Ada")));
        assert_eq!(person.remove_attribute("age"), Some(json!(36)));
        assert!(person.attribute("age").is_none());
    }
}
