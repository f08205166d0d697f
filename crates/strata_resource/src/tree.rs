//! Per-operation resource trees.
//!
//! A [`ResourceTree`] is an arena holding every resource that takes part in
//! one operation, an ordered list of root keys, and the relationship *slots*
//! that connect resources. Slots are explicit `(source, relationship)` entries:
//!
//! - an absent slot means the relationship was not populated (untouched),
//! - `ToOne(None)` or an empty `ToMany` means it was populated with nothing.
//!
//! Relationships refer to other resources by [`ResourceKey`], so cyclic data
//! (an article whose author lists the same article) is represented without
//! shared ownership.

use hashbrown::HashSet;
use indexmap::IndexMap;

use crate::resource::{Resource, ResourceKey, ResourceType};

// ─────────────────────────────────────────────────────────────────────────────
// RelationshipValue
// ─────────────────────────────────────────────────────────────────────────────

/// The populated value of one relationship slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipValue {
    /// A to-one relationship; `None` is an explicit null.
    ToOne(Option<ResourceKey>),
    /// A to-many relationship, in request order.
    ToMany(Vec<ResourceKey>),
}

impl RelationshipValue {
    /// Returns the referenced keys.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        let keys: &[ResourceKey] = match self {
            RelationshipValue::ToOne(key) => key.as_slice(),
            RelationshipValue::ToMany(keys) => keys,
        };
        keys.iter()
    }

    /// Returns whether `key` is referenced.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.keys().any(|candidate| candidate == key)
    }

    /// Returns true when no resource is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            RelationshipValue::ToOne(key) => key.is_none(),
            RelationshipValue::ToMany(keys) => keys.is_empty(),
        }
    }

    /// Keeps only the references accepted by `keep`.
    ///
    /// A rejected to-one reference becomes `ToOne(None)`. Returns whether the
    /// value changed.
    pub fn retain(&mut self, mut keep: impl FnMut(&ResourceKey) -> bool) -> bool {
        match self {
            RelationshipValue::ToOne(slot) => match slot {
                Some(key) if !keep(key) => {
                    *slot = None;
                    true
                }
                _ => false,
            },
            RelationshipValue::ToMany(keys) => {
                let before = keys.len();
                keys.retain(|key| keep(key));
                keys.len() != before
            }
        }
    }
}

/// One explicit `(source, relationship, target)` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    /// The resource declaring the relationship.
    pub source: &'a ResourceKey,
    /// The relationship name on the source type.
    pub relationship: &'a str,
    /// The referenced resource.
    pub target: &'a ResourceKey,
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceTree
// ─────────────────────────────────────────────────────────────────────────────

/// Arena of resources and relationship slots for one operation.
///
/// # Example
///
/// ```
/// use strata_resource::{Resource, ResourceTree};
///
/// let mut tree = ResourceTree::from_roots([Resource::new("articles", "1")]);
/// let article = tree.roots()[0].clone();
/// tree.relate_one(&article, "author", Some(Resource::new("people", "9")));
///
/// assert_eq!(tree.edges().count(), 1);
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTree {
    resources: IndexMap<ResourceKey, Resource>,
    roots: Vec<ResourceKey>,
    slots: IndexMap<ResourceKey, IndexMap<String, RelationshipValue>>,
}

impl ResourceTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree whose roots are `resources`, in order.
    #[must_use]
    pub fn from_roots(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut tree = Self::new();
        for resource in resources {
            tree.push_root(resource);
        }
        tree
    }

    /// Inserts `resource` (overwriting a stored value with the same key) and
    /// appends it to the roots unless it is already a root.
    pub fn push_root(&mut self, resource: Resource) -> ResourceKey {
        let key = self.insert(resource);
        if !self.roots.contains(&key) {
            self.roots.push(key.clone());
        }
        key
    }

    /// Inserts or overwrites a resource value. Relationship slots are kept.
    pub fn insert(&mut self, resource: Resource) -> ResourceKey {
        let key = resource.key().clone();
        self.resources.insert(key.clone(), resource);
        key
    }

    /// Inserts a resource only if its key is not stored yet.
    pub fn insert_if_absent(&mut self, resource: Resource) -> ResourceKey {
        let key = resource.key().clone();
        self.resources.entry(key.clone()).or_insert(resource);
        key
    }

    /// Returns a stored resource.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    /// Returns a stored resource mutably.
    pub fn get_mut(&mut self, key: &ResourceKey) -> Option<&mut Resource> {
        self.resources.get_mut(key)
    }

    /// Returns whether a resource with `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Returns the root keys in order.
    #[must_use]
    pub fn roots(&self) -> &[ResourceKey] {
        &self.roots
    }

    /// Returns the root resources in order.
    pub fn root_resources(&self) -> impl Iterator<Item = &Resource> {
        self.roots.iter().filter_map(|key| self.resources.get(key))
    }

    /// Returns the type of the first root, if any.
    #[must_use]
    pub fn root_type(&self) -> Option<&ResourceType> {
        self.roots.first().map(ResourceKey::resource_type)
    }

    /// Replaces the root list with `resources`, in the given order.
    ///
    /// Each resource overwrites the stored value with the same key; existing
    /// relationship slots of retained resources are preserved.
    pub fn replace_roots(&mut self, resources: impl IntoIterator<Item = Resource>) {
        self.roots.clear();
        for resource in resources {
            self.push_root(resource);
        }
    }

    /// Sets a relationship slot to an explicit value.
    pub fn set_relationship(
        &mut self,
        source: &ResourceKey,
        relationship: impl Into<String>,
        value: RelationshipValue,
    ) {
        self.slots
            .entry(source.clone())
            .or_default()
            .insert(relationship.into(), value);
    }

    /// Populates a to-one slot, storing `target` if it is not stored yet.
    pub fn relate_one(
        &mut self,
        source: &ResourceKey,
        relationship: impl Into<String>,
        target: Option<Resource>,
    ) {
        let target = target.map(|resource| self.insert_if_absent(resource));
        self.set_relationship(source, relationship, RelationshipValue::ToOne(target));
    }

    /// Populates a to-many slot, storing each target that is not stored yet.
    pub fn relate_many(
        &mut self,
        source: &ResourceKey,
        relationship: impl Into<String>,
        targets: impl IntoIterator<Item = Resource>,
    ) {
        let targets = targets
            .into_iter()
            .map(|resource| self.insert_if_absent(resource))
            .collect();
        self.set_relationship(source, relationship, RelationshipValue::ToMany(targets));
    }

    /// Returns a populated slot.
    #[must_use]
    pub fn relationship(&self, source: &ResourceKey, relationship: &str) -> Option<&RelationshipValue> {
        self.slots.get(source)?.get(relationship)
    }

    /// Returns a populated slot mutably.
    pub fn relationship_mut(
        &mut self,
        source: &ResourceKey,
        relationship: &str,
    ) -> Option<&mut RelationshipValue> {
        self.slots.get_mut(source)?.get_mut(relationship)
    }

    /// Returns every populated slot of `source` as `(name, value)` pairs.
    pub fn relationships_of<'a>(
        &'a self,
        source: &ResourceKey,
    ) -> impl Iterator<Item = (&'a str, &'a RelationshipValue)> + 'a {
        self.slots
            .get(source)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|(name, value)| (name.as_str(), value)))
    }

    /// Removes a slot, returning it to the unpopulated state.
    pub fn clear_relationship(
        &mut self,
        source: &ResourceKey,
        relationship: &str,
    ) -> Option<RelationshipValue> {
        self.slots.get_mut(source)?.shift_remove(relationship)
    }

    /// Returns every reference as an explicit edge record.
    pub fn edges(&self) -> impl Iterator<Item = Edge<'_>> {
        self.slots.iter().flat_map(|(source, slots)| {
            slots.iter().flat_map(move |(relationship, value)| {
                value.keys().map(move |target| Edge {
                    source,
                    relationship,
                    target,
                })
            })
        })
    }

    /// Returns all stored resources.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resources are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the keys reachable from the roots through populated slots.
    #[must_use]
    pub fn reachable(&self) -> HashSet<ResourceKey> {
        let mut visited: HashSet<ResourceKey> = HashSet::new();
        let mut pending: Vec<&ResourceKey> = self.roots.iter().collect();

        while let Some(key) = pending.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            for (_, value) in self.relationships_of(key) {
                pending.extend(value.keys().filter(|target| !visited.contains(*target)));
            }
        }
        visited
    }

    /// Drops resources and slots that are no longer reachable from the roots.
    ///
    /// Returns the number of resources removed.
    pub fn prune_unreachable(&mut self) -> usize {
        let reachable = self.reachable();
        let before = self.resources.len();
        self.resources.retain(|key, _| reachable.contains(key));
        self.slots.retain(|key, _| reachable.contains(key));
        before - self.resources.len()
    }
}
