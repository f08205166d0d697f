//! Resource sets handed to hooks.
//!
//! Root hooks receive a [`ResourceHashSet`] (or a [`DiffableResourceHashSet`]
//! for updates). Relationship-level hooks receive a
//! [`RelationshipsDictionary`] that groups resources by the relationship
//! through which they are affected.

use std::sync::Arc;

use indexmap::IndexMap;
use strata_resource::{
    Relationship, RelationshipValue, Resource, ResourceKey, ResourceTree, ResourceType,
};

use crate::error::{ConfigurationError, HookError};
use crate::hook::ResourceHook;

// ─────────────────────────────────────────────────────────────────────────────
// ResourceHashSet
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered, id-unique set of resources of one type.
///
/// Besides the resources themselves the set records which relationships were
/// populated in the request, and for which resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceHashSet {
    resource_type: ResourceType,
    resources: IndexMap<String, Resource>,
    affected_relationships: IndexMap<Arc<Relationship>, Vec<String>>,
}

impl ResourceHashSet {
    /// Creates a set. When two resources share an id the first one is kept.
    #[must_use]
    pub fn new(resource_type: impl Into<ResourceType>, resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut set = Self {
            resource_type: resource_type.into(),
            resources: IndexMap::new(),
            affected_relationships: IndexMap::new(),
        };
        for resource in resources {
            set.resources
                .entry(resource.id().to_owned())
                .or_insert(resource);
        }
        set
    }

    pub(crate) fn with_affected_relationships(
        mut self,
        affected: IndexMap<Arc<Relationship>, Vec<String>>,
    ) -> Self {
        self.affected_relationships = affected;
        self
    }

    /// Returns the resource type of every member.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the resources in order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Returns the ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Returns the resource with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Returns whether a resource with `id` is a member.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Returns the relationships populated in the request.
    pub fn affected_relationships(&self) -> impl Iterator<Item = &Arc<Relationship>> {
        self.affected_relationships.keys()
    }

    /// Returns the members whose `relationship` slot was populated.
    #[must_use]
    pub fn affected_by(&self, relationship: &str) -> Vec<&Resource> {
        self.affected_relationships
            .iter()
            .filter(|(candidate, _)| candidate.name() == relationship)
            .flat_map(|(_, ids)| ids.iter().filter_map(|id| self.resources.get(id)))
            .collect()
    }

    /// Groups the members by populated relationships pointing at `right_type`.
    #[must_use]
    pub fn get_by_relationship(
        &self,
        right_type: &ResourceType,
    ) -> IndexMap<Arc<Relationship>, Vec<&Resource>> {
        self.affected_relationships
            .iter()
            .filter(|(relationship, _)| relationship.right_type() == right_type)
            .map(|(relationship, ids)| {
                let resources = ids.iter().filter_map(|id| self.resources.get(id)).collect();
                (Arc::clone(relationship), resources)
            })
            .collect()
    }

    /// Clones the members into a vector, in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Resource> {
        self.resources.values().cloned().collect()
    }

    /// Consumes the set, returning the members in order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Resource> {
        self.resources.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a ResourceHashSet {
    type Item = &'a Resource;
    type IntoIter = indexmap::map::Values<'a, String, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.values()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DatabaseValues
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted counterparts of requested resources.
///
/// An id without a persisted resource is simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseValues {
    resource_type: ResourceType,
    tree: ResourceTree,
}

impl DatabaseValues {
    /// Wraps a loaded tree whose roots are the persisted resources.
    #[must_use]
    pub fn new(resource_type: impl Into<ResourceType>, tree: ResourceTree) -> Self {
        Self {
            resource_type: resource_type.into(),
            tree,
        }
    }

    /// Returns the persisted resource with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.tree
            .get(&ResourceKey::new(self.resource_type.clone(), id))
    }

    /// Returns a persisted relationship slot, if it was loaded.
    #[must_use]
    pub fn relationship(&self, id: &str, relationship: &str) -> Option<&RelationshipValue> {
        self.tree.relationship(
            &ResourceKey::new(self.resource_type.clone(), id),
            relationship,
        )
    }

    /// Returns the persisted resources currently related through a loaded slot.
    #[must_use]
    pub fn related(&self, id: &str, relationship: &str) -> Vec<&Resource> {
        self.relationship(id, relationship)
            .into_iter()
            .flat_map(|value| value.keys())
            .filter_map(|key| self.tree.get(key))
            .collect()
    }

    /// Returns the persisted resources in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.tree.root_resources()
    }

    /// Returns the number of persisted resources found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.roots().len()
    }

    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.roots().is_empty()
    }

    /// Returns the loaded tree.
    #[must_use]
    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DiffableResourceHashSet
// ─────────────────────────────────────────────────────────────────────────────

/// A requested resource paired with its persisted counterpart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceDiffPair<'a> {
    /// The resource as sent in the request.
    pub resource: &'a Resource,
    /// The persisted value, absent when nothing is stored under the id.
    pub database_value: Option<&'a Resource>,
}

/// The root set of an update, diffable against persisted values.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffableResourceHashSet {
    set: ResourceHashSet,
    database_values: Option<DatabaseValues>,
    updated_attributes: IndexMap<String, Vec<String>>,
    hook: ResourceHook,
}

impl DiffableResourceHashSet {
    /// Creates a diffable set.
    ///
    /// `targeted_attributes` are the attribute names present in the request;
    /// each maps to the members that carry it.
    #[must_use]
    pub fn new(
        set: ResourceHashSet,
        database_values: Option<DatabaseValues>,
        targeted_attributes: &[String],
    ) -> Self {
        let updated_attributes = targeted_attributes
            .iter()
            .map(|attribute| {
                let ids = set
                    .iter()
                    .filter(|resource| resource.attribute(attribute).is_some())
                    .map(|resource| resource.id().to_owned())
                    .collect();
                (attribute.clone(), ids)
            })
            .collect();
        Self {
            set,
            database_values,
            updated_attributes,
            hook: ResourceHook::BeforeUpdate,
        }
    }

    /// Returns the underlying set.
    #[must_use]
    pub fn as_set(&self) -> &ResourceHashSet {
        &self.set
    }

    /// Returns the resource type of every member.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        self.set.resource_type()
    }

    /// Returns the requested resources in order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.set.iter()
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Returns the requested resource with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.set.get(id)
    }

    /// Returns the persisted values, if they were loaded.
    #[must_use]
    pub fn database_values(&self) -> Option<&DatabaseValues> {
        self.database_values.as_ref()
    }

    /// Pairs every requested resource with its persisted value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DatabaseValuesNotLoaded`] when persisted
    /// values were not loaded for this hook.
    pub fn diffs(&self) -> Result<impl Iterator<Item = ResourceDiffPair<'_>>, HookError> {
        let database_values = self.database_values.as_ref().ok_or_else(|| {
            ConfigurationError::DatabaseValuesNotLoaded {
                resource_type: self.set.resource_type().clone(),
                hook: self.hook,
            }
        })?;
        Ok(self.set.iter().map(move |resource| ResourceDiffPair {
            resource,
            database_value: database_values.get(resource.id()),
        }))
    }

    /// Returns the names of the attributes present in the request.
    pub fn updated_attributes(&self) -> impl Iterator<Item = &str> {
        self.updated_attributes.keys().map(String::as_str)
    }

    /// Returns the members whose request carries `attribute`.
    #[must_use]
    pub fn affected_attribute(&self, attribute: &str) -> Vec<&Resource> {
        self.updated_attributes
            .get(attribute)
            .into_iter()
            .flatten()
            .filter_map(|id| self.set.get(id))
            .collect()
    }

    /// Returns the members whose `relationship` slot was populated.
    #[must_use]
    pub fn affected_by(&self, relationship: &str) -> Vec<&Resource> {
        self.set.affected_by(relationship)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RelationshipsDictionary
// ─────────────────────────────────────────────────────────────────────────────

/// Resources of one type grouped by the relationship that affects them.
///
/// Keys are relationships *as seen from* the dictionary's type: the inverse
/// navigation when one is declared, otherwise the relationship pointing at
/// this type.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipsDictionary {
    resource_type: ResourceType,
    entries: IndexMap<Arc<Relationship>, IndexMap<String, Resource>>,
}

impl RelationshipsDictionary {
    /// Creates an empty dictionary for `resource_type`.
    #[must_use]
    pub fn new(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            entries: IndexMap::new(),
        }
    }

    /// Adds `resource` under `relationship`. Duplicated ids are ignored.
    pub fn insert(&mut self, relationship: Arc<Relationship>, resource: Resource) {
        self.entries
            .entry(relationship)
            .or_default()
            .entry(resource.id().to_owned())
            .or_insert(resource);
    }

    /// Adds every resource under `relationship`.
    pub fn extend(
        &mut self,
        relationship: &Arc<Relationship>,
        resources: impl IntoIterator<Item = Resource>,
    ) {
        for resource in resources {
            self.insert(Arc::clone(relationship), resource);
        }
    }

    /// Returns the dictionary's resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the resources affected through the relationship named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Vec<&Resource> {
        self.entries
            .iter()
            .filter(|(relationship, _)| relationship.name() == name)
            .flat_map(|(_, resources)| resources.values())
            .collect()
    }

    /// Returns the entries whose other side is `other_type`.
    #[must_use]
    pub fn get_by_relationship(&self, other_type: &ResourceType) -> Vec<(&Arc<Relationship>, Vec<&Resource>)> {
        self.entries
            .iter()
            .filter(|(relationship, _)| self.other_side(relationship) == other_type)
            .map(|(relationship, resources)| (relationship, resources.values().collect()))
            .collect()
    }

    /// Returns every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Relationship>, Vec<&Resource>)> {
        self.entries
            .iter()
            .map(|(relationship, resources)| (relationship, resources.values().collect()))
    }

    /// Returns the keyed relationships.
    pub fn relationships(&self) -> impl Iterator<Item = &Arc<Relationship>> {
        self.entries.keys()
    }

    /// Returns every distinct resource across all entries.
    #[must_use]
    pub fn resources(&self) -> Vec<&Resource> {
        let mut seen: IndexMap<&str, &Resource> = IndexMap::new();
        for resource in self.entries.values().flat_map(|resources| resources.values()) {
            seen.entry(resource.id()).or_insert(resource);
        }
        seen.into_values().collect()
    }

    /// Returns every distinct id across all entries.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.resources()
            .into_iter()
            .map(|resource| resource.id().to_owned())
            .collect()
    }

    /// Returns the number of keyed relationships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no resource is affected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|resources| resources.is_empty())
    }

    fn other_side<'r>(&self, relationship: &'r Relationship) -> &'r ResourceType {
        if relationship.left_type() == &self.resource_type {
            relationship.right_type()
        } else {
            relationship.left_type()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TargetedFields
// ─────────────────────────────────────────────────────────────────────────────

/// The fields present in an update request.
///
/// Attributes feed [`DiffableResourceHashSet::affected_attribute`]. When
/// relationships are listed, only those relationship slots of the roots take
/// part in relationship hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetedFields {
    attributes: Vec<String>,
    relationships: Vec<String>,
}

impl TargetedFields {
    /// No targeted fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a targeted attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Adds a targeted relationship.
    #[must_use]
    pub fn with_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationships.push(name.into());
        self
    }

    /// Returns the targeted attributes.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Returns the targeted relationships.
    #[must_use]
    pub fn relationships(&self) -> &[String] {
        &self.relationships
    }
}

#[cfg(test)]
mod tests {
    use strata_resource::Cardinality;

    use super::*;

    fn author() -> Arc<Relationship> {
        Arc::new(
            Relationship::new("author", "articles", "people", Cardinality::ToOne)
                .with_inverse("articles"),
        )
    }

    fn articles() -> Arc<Relationship> {
        Arc::new(
            Relationship::new("articles", "people", "articles", Cardinality::ToMany)
                .with_inverse("author"),
        )
    }

    #[test]
    fn hash_set_keeps_first_of_duplicated_ids() {
        let set = ResourceHashSet::new(
            "articles",
            [
                Resource::new("articles", "1").with_attribute("title", "first"),
                Resource::new("articles", "2"),
                Resource::new("articles", "1").with_attribute("title", "second"),
            ],
        );

        assert_eq!(set.ids().collect::<Vec<_>>(), ["1", "2"]);
        assert_eq!(
            set.get("1").and_then(|r| r.attribute("title")),
            Some(&serde_json::json!("first"))
        );
    }

    #[test]
    fn hash_set_groups_affected_relationships_by_right_type() {
        let affected = IndexMap::from([(author(), vec!["1".to_owned()])]);
        let set = ResourceHashSet::new(
            "articles",
            [Resource::new("articles", "1"), Resource::new("articles", "2")],
        )
        .with_affected_relationships(affected);

        let grouped = set.get_by_relationship(&ResourceType::new("people"));
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&author()].len(), 1);
        assert!(set.get_by_relationship(&ResourceType::new("tags")).is_empty());
        assert_eq!(set.affected_by("author").len(), 1);
    }

    #[test]
    fn diffs_require_loaded_values() {
        let set = ResourceHashSet::new("articles", [Resource::new("articles", "1")]);
        let diffable = DiffableResourceHashSet::new(set, None, &[]);

        let err = diffable.diffs().err().unwrap();
        assert!(matches!(
            err,
            HookError::Configuration(ConfigurationError::DatabaseValuesNotLoaded { .. })
        ));
    }

    #[test]
    fn diffs_pair_requested_and_persisted_values() {
        let set = ResourceHashSet::new(
            "articles",
            [
                Resource::new("articles", "1").with_attribute("title", "new"),
                Resource::new("articles", "2"),
            ],
        );
        let persisted = ResourceTree::from_roots([
            Resource::new("articles", "1").with_attribute("title", "old"),
        ]);
        let diffable = DiffableResourceHashSet::new(
            set,
            Some(DatabaseValues::new("articles", persisted)),
            &["title".to_owned()],
        );

        let pairs: Vec<_> = diffable.diffs().unwrap().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(
            pairs[0].database_value.and_then(|r| r.attribute("title")),
            Some(&serde_json::json!("old"))
        );
        assert!(pairs[1].database_value.is_none());
        assert_eq!(diffable.affected_attribute("title").len(), 1);
    }

    #[test]
    fn dictionary_groups_by_other_side() {
        let mut dictionary = RelationshipsDictionary::new("people");
        dictionary.insert(articles(), Resource::new("people", "1"));
        dictionary.insert(articles(), Resource::new("people", "1"));
        dictionary.insert(author(), Resource::new("people", "2"));

        assert_eq!(dictionary.get("articles").len(), 1);
        assert_eq!(dictionary.ids(), ["1", "2"]);
        assert_eq!(
            dictionary
                .get_by_relationship(&ResourceType::new("articles"))
                .len(),
            2
        );
    }
}
