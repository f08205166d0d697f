//! Persisted-value loading.
//!
//! The hook engine never talks to a database directly. When a hook needs the
//! persisted counterpart of requested resources (to diff an update, or to find
//! resources implicitly affected by a relationship change) it asks a
//! [`ResourceLoader`]. [`MemoryStore`] is a thread-safe in-memory loader used
//! by tests and small hosts.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::graph::Relationship;
use crate::resource::{Resource, ResourceKey, ResourceType};
use crate::tree::{RelationshipValue, ResourceTree};

/// Errors reported by a [`ResourceLoader`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The loader does not know the resource type.
    #[error("unknown resource type: {0}")]
    UnknownType(ResourceType),

    /// The backing store failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Loads persisted resources with a chosen set of relationships included.
///
/// Calls are synchronous: the caller blocks until the values are available.
pub trait ResourceLoader: Send + Sync {
    /// Loads the persisted resources of `resource_type` whose ids are in `ids`.
    ///
    /// The returned tree's roots are the resources that exist, and each root has
    /// a populated slot for every relationship in `include`. Ids without a
    /// persisted resource are absent from the roots; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the backing store cannot answer.
    fn load(
        &self,
        resource_type: &ResourceType,
        ids: &[String],
        include: &[Arc<Relationship>],
    ) -> Result<ResourceTree, LoadError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredResource {
    resource: Resource,
    relationships: IndexMap<String, RelationshipValue>,
}

/// In-memory [`ResourceLoader`] backed by a `RwLock`ed map.
///
/// # Example
///
/// ```
/// use strata_resource::{MemoryStore, Resource, ResourceKey, ResourceLoader};
///
/// let store = MemoryStore::new();
/// store.insert(Resource::new("people", "1").with_attribute("name", "Ada"));
///
/// let loaded = store.load(&"people".into(), &["1".into(), "2".into()], &[]).unwrap();
/// assert_eq!(loaded.roots(), &[ResourceKey::new("people", "1")]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: RwLock<IndexMap<ResourceKey, StoredResource>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a resource. Stored relationships are kept.
    pub fn insert(&self, resource: Resource) {
        let mut resources = self.resources.write();
        let key = resource.key().clone();
        match resources.get_mut(&key) {
            Some(stored) => stored.resource = resource,
            None => {
                resources.insert(
                    key,
                    StoredResource {
                        resource,
                        relationships: IndexMap::new(),
                    },
                );
            }
        }
    }

    /// Sets a relationship slot of a stored resource.
    ///
    /// Inserts a bare resource for `source` if it is not stored yet.
    pub fn set_relationship(
        &self,
        source: &ResourceKey,
        relationship: impl Into<String>,
        value: RelationshipValue,
    ) {
        let mut resources = self.resources.write();
        resources
            .entry(source.clone())
            .or_insert_with(|| StoredResource {
                resource: Resource::from_key(source.clone()),
                relationships: IndexMap::new(),
            })
            .relationships
            .insert(relationship.into(), value);
    }

    /// Returns a stored resource.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<Resource> {
        self.resources
            .read()
            .get(key)
            .map(|stored| stored.resource.clone())
    }

    /// Returns a stored relationship slot.
    #[must_use]
    pub fn relationship(&self, source: &ResourceKey, relationship: &str) -> Option<RelationshipValue> {
        self.resources
            .read()
            .get(source)
            .and_then(|stored| stored.relationships.get(relationship).cloned())
    }

    /// Removes a resource and every reference to it.
    pub fn remove(&self, key: &ResourceKey) -> Option<Resource> {
        let mut resources = self.resources.write();
        let removed = resources.shift_remove(key)?;
        for stored in resources.values_mut() {
            for value in stored.relationships.values_mut() {
                value.retain(|target| target != key);
            }
        }
        Some(removed.resource)
    }

    /// Persists every resource and populated slot of `tree`.
    pub fn save(&self, tree: &ResourceTree) {
        for resource in tree.resources() {
            self.insert(resource.clone());
            for (name, value) in tree.relationships_of(resource.key()) {
                self.set_relationship(resource.key(), name, value.clone());
            }
        }
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl ResourceLoader for MemoryStore {
    fn load(
        &self,
        resource_type: &ResourceType,
        ids: &[String],
        include: &[Arc<Relationship>],
    ) -> Result<ResourceTree, LoadError> {
        let resources = self.resources.read();
        let mut tree = ResourceTree::new();

        for id in ids {
            let key = ResourceKey::new(resource_type.clone(), id.as_str());
            let Some(stored) = resources.get(&key) else {
                continue;
            };
            tree.push_root(stored.resource.clone());

            for relationship in include {
                let value = stored
                    .relationships
                    .get(relationship.name())
                    .cloned()
                    .unwrap_or_else(|| empty_value(relationship));
                for target in value.keys() {
                    let related = resources
                        .get(target)
                        .map_or_else(|| Resource::from_key(target.clone()), |s| s.resource.clone());
                    tree.insert_if_absent(related);
                }
                tree.set_relationship(&key, relationship.name(), value);
            }
        }

        tracing::trace!(
            resource_type = %resource_type,
            requested = ids.len(),
            found = tree.roots().len(),
            "loaded persisted resources"
        );
        Ok(tree)
    }
}

fn empty_value(relationship: &Relationship) -> RelationshipValue {
    if relationship.is_to_one() {
        RelationshipValue::ToOne(None)
    } else {
        RelationshipValue::ToMany(Vec::new())
    }
}
