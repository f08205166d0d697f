//! Layered traversal of resource trees.
//!
//! The executor walks a [`ResourceTree`] breadth-first, one *depth* at a time.
//! Each step produces one [`NodeLayer`] per resource type reached at that
//! depth, so hooks are called once per type per depth with every affected
//! resource at once.
//!
//! Cycles in the data (an article whose author lists the same article) are
//! cut by remembering, per type, which ids were already visited: a resource is
//! only ever part of the first layer that reaches it.
//!
//! When a hook removes resources from a layer, [`Traversal::reassemble`]
//! removes the references to them from the parents that pointed at them. A
//! pruned resource stays pruned for the rest of the walk:
//! [`Traversal::detach_pruned`] removes the references deeper layers hold to
//! it before the next depth is built.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use indexmap::{IndexMap, IndexSet};
use strata_resource::{Relationship, Resource, ResourceGraph, ResourceKey, ResourceTree, ResourceType};

use crate::error::ConfigurationError;
use crate::sets::ResourceHashSet;

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

/// The parent through which a node was discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// The resource holding the relationship.
    pub parent: ResourceKey,
    /// The relationship, declared on the parent's type.
    pub relationship: Arc<Relationship>,
}

/// One resource taking part in a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    key: ResourceKey,
    parents: Vec<ParentLink>,
}

impl ResourceNode {
    fn new(key: ResourceKey) -> Self {
        Self {
            key,
            parents: Vec::new(),
        }
    }

    /// Returns the resource key.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Returns the resource id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// Returns every parent link. Root nodes have none.
    #[must_use]
    pub fn parents(&self) -> &[ParentLink] {
        &self.parents
    }
}

/// The resources one relationship contributed to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipGroup {
    relationship: Arc<Relationship>,
    left: IndexSet<ResourceKey>,
    right: IndexSet<String>,
}

impl RelationshipGroup {
    fn new(relationship: Arc<Relationship>) -> Self {
        Self {
            relationship,
            left: IndexSet::new(),
            right: IndexSet::new(),
        }
    }

    /// Returns the relationship, declared on the previous layer's type.
    #[must_use]
    pub fn relationship(&self) -> &Arc<Relationship> {
        &self.relationship
    }

    /// Returns the parents whose slot references this layer.
    pub fn left(&self) -> impl Iterator<Item = &ResourceKey> {
        self.left.iter()
    }

    /// Returns the ids this relationship reached, including ones skipped as
    /// already visited.
    pub fn right(&self) -> impl Iterator<Item = &str> {
        self.right.iter().map(String::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NodeLayer
// ─────────────────────────────────────────────────────────────────────────────

/// The nodes of one resource type found at one depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayer {
    resource_type: ResourceType,
    depth: usize,
    nodes: IndexMap<String, ResourceNode>,
    groups: Vec<RelationshipGroup>,
    relationships_to_next: Vec<Arc<Relationship>>,
    pruned: IndexSet<String>,
}

impl NodeLayer {
    fn new(resource_type: ResourceType, depth: usize) -> Self {
        Self {
            resource_type,
            depth,
            nodes: IndexMap::new(),
            groups: Vec::new(),
            relationships_to_next: Vec::new(),
            pruned: IndexSet::new(),
        }
    }

    /// Returns the resource type of every node.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the depth; roots are at depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true for the root layer.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Returns the nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Returns the node with `id`.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Returns the node ids in discovery order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Returns the node keys in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.nodes.values().map(ResourceNode::key)
    }

    /// Returns whether a node with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the layer has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the relationships of the previous layer that reached this one.
    #[must_use]
    pub fn relationships_from_previous(&self) -> &[RelationshipGroup] {
        &self.groups
    }

    /// Returns the relationships populated on this layer's nodes.
    #[must_use]
    pub fn relationships_to_next(&self) -> &[Arc<Relationship>] {
        &self.relationships_to_next
    }

    /// Returns the ids removed by [`retain_ids`](Self::retain_ids).
    pub fn pruned(&self) -> impl Iterator<Item = &str> {
        self.pruned.iter().map(String::as_str)
    }

    /// Returns whether `id` was pruned from this layer.
    #[must_use]
    pub fn is_pruned(&self, id: &str) -> bool {
        self.pruned.contains(id)
    }

    /// Keeps only the nodes whose id is accepted and records the others as
    /// pruned. Returns the number of nodes removed.
    pub fn retain_ids(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.nodes.len();
        let pruned = &mut self.pruned;
        self.nodes.retain(|id, _| {
            let kept = keep(id.as_str());
            if !kept {
                pruned.insert(id.clone());
            }
            kept
        });
        before - self.nodes.len()
    }

    /// Ignores populated relationships not named in `names`.
    pub fn restrict_relationships(&mut self, names: &[String]) {
        self.relationships_to_next
            .retain(|relationship| names.iter().any(|name| name == relationship.name()));
    }

    /// Builds the hook set of this layer from the tree.
    ///
    /// Nodes whose resource is not stored in the tree are represented by an
    /// identifier-only resource.
    #[must_use]
    pub fn resource_set(&self, tree: &ResourceTree) -> ResourceHashSet {
        let affected = self
            .relationships_to_next
            .iter()
            .map(|relationship| {
                let ids = self
                    .nodes
                    .values()
                    .filter(|node| tree.relationship(&node.key, relationship.name()).is_some())
                    .map(|node| node.id().to_owned())
                    .collect();
                (Arc::clone(relationship), ids)
            })
            .collect();
        ResourceHashSet::new(self.resource_type.clone(), self.resources(tree))
            .with_affected_relationships(affected)
    }

    /// Returns the resources of the nodes, in order.
    #[must_use]
    pub fn resources(&self, tree: &ResourceTree) -> Vec<Resource> {
        self.nodes
            .values()
            .map(|node| {
                tree.get(&node.key)
                    .cloned()
                    .unwrap_or_else(|| Resource::from_key(node.key.clone()))
            })
            .collect()
    }

    /// Returns, per relationship of the previous layer, the node ids it
    /// reached that are still part of this layer.
    #[must_use]
    pub fn ids_by_relationship(&self) -> Vec<(&Arc<Relationship>, Vec<&str>)> {
        self.groups
            .iter()
            .map(|group| {
                let ids = group
                    .right
                    .iter()
                    .filter(|id| self.nodes.contains_key(id.as_str()))
                    .map(String::as_str)
                    .collect();
                (&group.relationship, ids)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traversal
// ─────────────────────────────────────────────────────────────────────────────

/// One breadth-first walk over a resource tree.
///
/// A traversal remembers which resources it already visited; create a new one
/// for every walk.
#[derive(Debug)]
pub struct Traversal<'g> {
    graph: &'g ResourceGraph,
    visited: HashMap<ResourceType, HashSet<String>>,
    pruned: HashMap<ResourceType, HashSet<String>>,
}

impl<'g> Traversal<'g> {
    /// Creates a traversal over `graph`.
    #[must_use]
    pub fn new(graph: &'g ResourceGraph) -> Self {
        Self {
            graph,
            visited: HashMap::new(),
            pruned: HashMap::new(),
        }
    }

    /// Builds the root layer and marks the roots visited.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when a root is not of `resource_type`,
    /// the type is unknown, or a populated slot names an undeclared
    /// relationship.
    pub fn create_layer(
        &mut self,
        tree: &ResourceTree,
        resource_type: &ResourceType,
        roots: &[ResourceKey],
    ) -> Result<NodeLayer, ConfigurationError> {
        if !self.graph.contains(resource_type) {
            return Err(ConfigurationError::UnknownResourceType(resource_type.clone()));
        }

        let mut layer = NodeLayer::new(resource_type.clone(), 0);
        for key in roots {
            if key.resource_type() != resource_type {
                return Err(ConfigurationError::MixedResourceTypes {
                    expected: resource_type.clone(),
                    found: key.clone(),
                });
            }
            layer
                .nodes
                .entry(key.id().to_owned())
                .or_insert_with(|| ResourceNode::new(key.clone()));
        }

        self.mark_visited(&layer);
        layer.relationships_to_next = self.populated_relationships(tree, &layer)?;
        tracing::trace!(
            resource_type = %resource_type,
            nodes = layer.len(),
            relationships = layer.relationships_to_next.len(),
            "created root layer"
        );
        Ok(layer)
    }

    /// Builds the layers one depth below `layers`.
    ///
    /// Returns an empty vector when the traversal is finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when a slot references a resource of
    /// the wrong type or names an undeclared relationship.
    pub fn next_layers(
        &mut self,
        tree: &ResourceTree,
        layers: &[NodeLayer],
    ) -> Result<Vec<NodeLayer>, ConfigurationError> {
        let depth = layers.iter().map(NodeLayer::depth).max().map_or(0, |d| d + 1);
        let mut drafts: IndexMap<ResourceType, NodeLayer> = IndexMap::new();

        for layer in layers {
            for relationship in &layer.relationships_to_next {
                for node in layer.nodes.values() {
                    let Some(value) = tree.relationship(&node.key, relationship.name()) else {
                        continue;
                    };
                    for target in value.keys() {
                        if target.resource_type() != relationship.right_type() {
                            return Err(ConfigurationError::UnexpectedTarget {
                                resource_type: relationship.left_type().clone(),
                                relationship: relationship.name().to_owned(),
                                target: target.clone(),
                            });
                        }

                        let draft = drafts
                            .entry(target.resource_type().clone())
                            .or_insert_with(|| {
                                NodeLayer::new(target.resource_type().clone(), depth)
                            });
                        let group = match draft
                            .groups
                            .iter()
                            .position(|group| &group.relationship == relationship)
                        {
                            Some(index) => &mut draft.groups[index],
                            None => {
                                draft.groups.push(RelationshipGroup::new(Arc::clone(relationship)));
                                let last = draft.groups.len() - 1;
                                &mut draft.groups[last]
                            }
                        };
                        group.left.insert(node.key.clone());
                        group.right.insert(target.id().to_owned());

                        if self.is_visited(target) {
                            continue;
                        }
                        draft
                            .nodes
                            .entry(target.id().to_owned())
                            .or_insert_with(|| ResourceNode::new(target.clone()))
                            .parents
                            .push(ParentLink {
                                parent: node.key.clone(),
                                relationship: Arc::clone(relationship),
                            });
                    }
                }
            }
        }

        let mut next = Vec::with_capacity(drafts.len());
        for (_, mut layer) in drafts {
            if layer.nodes.is_empty() {
                continue;
            }
            self.mark_visited(&layer);
            layer.relationships_to_next = self.populated_relationships(tree, &layer)?;
            tracing::trace!(
                resource_type = %layer.resource_type,
                depth,
                nodes = layer.len(),
                "created nested layer"
            );
            next.push(layer);
        }
        Ok(next)
    }

    /// Removes references to the layer's pruned ids from its parents and
    /// remembers them as pruned for the rest of the walk.
    ///
    /// To-many slots drop the element, to-one slots become null. Returns the
    /// number of slots changed; a second call with the same layer changes
    /// nothing.
    pub fn reassemble(&mut self, tree: &mut ResourceTree, layer: &NodeLayer) -> usize {
        if layer.pruned.is_empty() {
            return 0;
        }
        self.pruned
            .entry(layer.resource_type.clone())
            .or_default()
            .extend(layer.pruned.iter().cloned());

        let mut changed = 0;
        for group in &layer.groups {
            for parent in &group.left {
                let Some(value) = tree.relationship_mut(parent, group.relationship.name()) else {
                    continue;
                };
                let removed = value.retain(|key| {
                    key.resource_type() != &layer.resource_type || !layer.pruned.contains(key.id())
                });
                if removed {
                    changed += 1;
                }
            }
        }
        tracing::trace!(
            resource_type = %layer.resource_type,
            pruned = layer.pruned.len(),
            changed,
            "reassembled layer into parents"
        );
        changed
    }

    /// Removes references from `layers` to resources pruned earlier in the
    /// walk, so the next depth never reaches them again.
    ///
    /// Returns the number of slots changed.
    pub fn detach_pruned(&self, tree: &mut ResourceTree, layers: &[NodeLayer]) -> usize {
        if self.pruned.is_empty() {
            return 0;
        }
        let mut changed = 0;
        for layer in layers {
            for relationship in &layer.relationships_to_next {
                let Some(pruned) = self.pruned.get(relationship.right_type()) else {
                    continue;
                };
                for node in layer.nodes.values() {
                    let Some(value) = tree.relationship_mut(&node.key, relationship.name()) else {
                        continue;
                    };
                    let removed = value.retain(|key| {
                        key.resource_type() != relationship.right_type()
                            || !pruned.contains(key.id())
                    });
                    if removed {
                        changed += 1;
                    }
                }
            }
        }
        if changed > 0 {
            tracing::trace!(changed, "detached references to pruned resources");
        }
        changed
    }

    /// Returns whether `key` was pruned by an earlier layer of this walk.
    #[must_use]
    pub fn is_pruned(&self, key: &ResourceKey) -> bool {
        self.pruned
            .get(key.resource_type())
            .is_some_and(|ids| ids.contains(key.id()))
    }

    /// Returns whether `key` was visited by an earlier layer.
    #[must_use]
    pub fn is_visited(&self, key: &ResourceKey) -> bool {
        self.visited
            .get(key.resource_type())
            .is_some_and(|ids| ids.contains(key.id()))
    }

    fn mark_visited(&mut self, layer: &NodeLayer) {
        let visited = self
            .visited
            .entry(layer.resource_type.clone())
            .or_default();
        visited.extend(layer.nodes.keys().cloned());
    }

    fn populated_relationships(
        &self,
        tree: &ResourceTree,
        layer: &NodeLayer,
    ) -> Result<Vec<Arc<Relationship>>, ConfigurationError> {
        let mut populated: Vec<Arc<Relationship>> = Vec::new();
        for node in layer.nodes.values() {
            for (name, _) in tree.relationships_of(&node.key) {
                let relationship = self
                    .graph
                    .relationship(&layer.resource_type, name)
                    .ok_or_else(|| ConfigurationError::UnknownRelationship {
                        resource_type: layer.resource_type.clone(),
                        relationship: name.to_owned(),
                    })?;
                if !populated.contains(relationship) {
                    populated.push(Arc::clone(relationship));
                }
            }
        }
        Ok(populated)
    }
}
