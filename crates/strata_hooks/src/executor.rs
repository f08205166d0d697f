//! Lifecycle hook orchestration.
//!
//! [`ResourceHookExecutor`] is called by the service layer around every
//! persistence step. It walks the request's [`ResourceTree`] layer by layer and
//! calls each resource definition once per layer with every affected resource.
//!
//! # Ordering
//!
//! For a write:
//!
//! 1. the root before-hook (`BeforeCreate`, `BeforeUpdate` or `BeforeDelete`),
//!    whose result replaces the root set,
//! 2. `BeforeImplicitUpdateRelationship` for persisted resources losing a
//!    relationship to the roots,
//! 3. per nested depth: `BeforeUpdateRelationship` (which may prune the
//!    layer), then implicit updates caused by that layer,
//! 4. persistence (outside the executor),
//! 5. the root after-hook, then `AfterUpdateRelationship` per nested layer,
//! 6. `OnReturn` for the root layer and every nested layer.
//!
//! A type without a definition, or whose definition does not declare a hook,
//! is skipped silently. Errors returned by hooks stop the walk and reach the
//! caller unchanged.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use strata_hooks::prelude::*;
//! use strata_resource::{Resource, ResourceGraph, ResourceTree};
//!
//! struct Articles;
//!
//! impl ResourceDefinition for Articles {
//!     fn capabilities(&self) -> HookCapabilities {
//!         HookCapabilities::none().with(ResourceHook::BeforeCreate)
//!     }
//!
//!     fn before_create(
//!         &self,
//!         resources: &ResourceHashSet,
//!         _pipeline: ResourcePipeline,
//!     ) -> Result<Vec<Resource>, HookError> {
//!         Ok(resources
//!             .iter()
//!             .map(|article| article.clone().with_attribute("status", "draft"))
//!             .collect())
//!     }
//! }
//!
//! let graph = ResourceGraph::builder()
//!     .add_resource("articles", |r| {
//!         r.attribute("title").attribute("status");
//!     })
//!     .build()
//!     .unwrap();
//! let definitions = ResourceDefinitions::new();
//! definitions.register("articles", Articles).unwrap();
//!
//! let executor = ResourceHookExecutor::new(Arc::new(graph), Arc::new(definitions));
//! let mut tree = ResourceTree::from_roots([Resource::new("articles", "1")]);
//! executor.before_create(&mut tree, ResourcePipeline::Post).unwrap();
//!
//! let article = tree.root_resources().next().unwrap();
//! assert_eq!(article.attribute("status"), Some(&serde_json::json!("draft")));
//! ```

use std::sync::Arc;

use hashbrown::HashSet;
use indexmap::IndexMap;
use strata_resource::{
    Relationship, Resource, ResourceGraph, ResourceKey, ResourceLoader, ResourceTree, ResourceType,
};

use crate::definition::ResourceDefinitions;
use crate::error::{ConfigurationError, HookError};
use crate::helper::HookExecutorHelper;
use crate::hook::{ResourceHook, ResourcePipeline};
use crate::options::HooksOptions;
use crate::sets::{
    DatabaseValues, DiffableResourceHashSet, RelationshipsDictionary, ResourceHashSet,
    TargetedFields,
};
use crate::traversal::{NodeLayer, Traversal};

/// Implicitly affected resources collected for one depth, per affected type.
type ImplicitUpdates = IndexMap<ResourceType, RelationshipsDictionary>;

/// Executes resource definition hooks around persistence.
#[derive(Debug)]
pub struct ResourceHookExecutor {
    graph: Arc<ResourceGraph>,
    helper: HookExecutorHelper,
}

impl ResourceHookExecutor {
    /// Creates an executor with default options and no loader.
    #[must_use]
    pub fn new(graph: Arc<ResourceGraph>, definitions: Arc<ResourceDefinitions>) -> Self {
        Self {
            graph,
            helper: HookExecutorHelper::new(definitions, HooksOptions::default()),
        }
    }

    /// Sets the loader used for persisted values.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.helper = self.helper.with_loader(loader);
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: HooksOptions) -> Self {
        self.helper = self.helper.with_options(options);
        self
    }

    /// Returns the resource graph.
    #[must_use]
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Returns the helper.
    #[must_use]
    pub fn helper(&self) -> &HookExecutorHelper {
        &self.helper
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read
    // ─────────────────────────────────────────────────────────────────────────

    /// Fires `BeforeRead` on the root type, then once per distinct type along
    /// the include chains.
    ///
    /// Each chain is a path of relationship names starting at `resource_type`,
    /// e.g. `["author", "articles"]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown type or include
    /// relationship; otherwise the first hook error.
    pub fn before_read(
        &self,
        resource_type: &ResourceType,
        pipeline: ResourcePipeline,
        id: Option<&str>,
        includes: &[Vec<String>],
    ) -> Result<(), HookError> {
        if !self.graph.contains(resource_type) {
            return Err(ConfigurationError::UnknownResourceType(resource_type.clone()).into());
        }

        let mut included: Vec<ResourceType> = Vec::new();
        for chain in includes {
            let mut current = resource_type.clone();
            for name in chain {
                let relationship = self.graph.relationship(&current, name).ok_or_else(|| {
                    ConfigurationError::UnknownRelationship {
                        resource_type: current.clone(),
                        relationship: name.clone(),
                    }
                })?;
                current = relationship.right_type().clone();
                if &current != resource_type && !included.contains(&current) {
                    included.push(current.clone());
                }
            }
        }

        if let Some(container) = self.helper.container(resource_type, ResourceHook::BeforeRead)? {
            log_dispatch(resource_type, ResourceHook::BeforeRead, pipeline, 0);
            container.definition().before_read(pipeline, false, id)?;
        }
        for included_type in &included {
            if let Some(container) = self.helper.container(included_type, ResourceHook::BeforeRead)? {
                log_dispatch(included_type, ResourceHook::BeforeRead, pipeline, 0);
                container.definition().before_read(pipeline, true, None)?;
            }
        }
        Ok(())
    }

    /// Fires `AfterRead` on the roots, then on every nested layer.
    ///
    /// # Errors
    ///
    /// Returns the first hook or configuration error.
    pub fn after_read(&self, tree: &ResourceTree, pipeline: ResourcePipeline) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut traversal = Traversal::new(&self.graph);
        let root = traversal.create_layer(tree, &root_type, tree.roots())?;

        if let Some(container) = self.helper.container(&root_type, ResourceHook::AfterRead)? {
            let set = root.resource_set(tree);
            log_dispatch(&root_type, ResourceHook::AfterRead, pipeline, set.len());
            container.definition().after_read(&set, pipeline, false)?;
        }

        self.walk(tree, &mut traversal, root, |tree, layer| {
            if let Some(container) = self.helper.container(layer.resource_type(), ResourceHook::AfterRead)? {
                let set = layer.resource_set(tree);
                log_dispatch(layer.resource_type(), ResourceHook::AfterRead, pipeline, set.len());
                container.definition().after_read(&set, pipeline, true)?;
            }
            Ok(())
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Fires `BeforeCreate` on the roots, then relationship hooks on nested
    /// layers.
    ///
    /// The set returned by `BeforeCreate` replaces the roots; resources pruned
    /// by `BeforeUpdateRelationship` are removed from their parents.
    ///
    /// # Errors
    ///
    /// Returns the first hook, loader or configuration error.
    pub fn before_create(
        &self,
        tree: &mut ResourceTree,
        pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut traversal = Traversal::new(&self.graph);
        let mut root = traversal.create_layer(tree, &root_type, tree.roots())?;

        if let Some(container) = self.helper.container(&root_type, ResourceHook::BeforeCreate)? {
            let set = root.resource_set(tree);
            log_dispatch(&root_type, ResourceHook::BeforeCreate, pipeline, set.len());
            let updated = container.definition().before_create(&set, pipeline)?;
            self.check_response(&root_type, ResourceHook::BeforeCreate, &updated)?;
            tree.replace_roots(updated);

            traversal = Traversal::new(&self.graph);
            root = traversal.create_layer(tree, &root_type, tree.roots())?;
        }

        self.propagate_relationship_updates(tree, &mut traversal, root, pipeline)
    }

    /// Fires `AfterCreate` on the roots, then `AfterUpdateRelationship` on
    /// nested layers.
    ///
    /// # Errors
    ///
    /// Returns the first hook or configuration error.
    pub fn after_create(&self, tree: &ResourceTree, pipeline: ResourcePipeline) -> Result<(), HookError> {
        self.after_write(tree, pipeline, ResourceHook::AfterCreate)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update
    // ─────────────────────────────────────────────────────────────────────────

    /// Fires `BeforeUpdate` on the roots, implicit relationship updates, and
    /// relationship hooks on nested layers.
    ///
    /// # Errors
    ///
    /// Returns the first hook, loader or configuration error.
    pub fn before_update(
        &self,
        tree: &mut ResourceTree,
        pipeline: ResourcePipeline,
        targeted: &TargetedFields,
    ) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut traversal = Traversal::new(&self.graph);
        let mut root = self.update_root_layer(&mut traversal, tree, &root_type, targeted)?;

        if let Some(container) = self.helper.container(&root_type, ResourceHook::BeforeUpdate)? {
            let database_values = self.helper.load_db_values(
                &root_type,
                &root.ids(),
                ResourceHook::BeforeUpdate,
                root.relationships_to_next(),
            )?;
            let diffable = DiffableResourceHashSet::new(
                root.resource_set(tree),
                database_values,
                targeted.attributes(),
            );
            log_dispatch(&root_type, ResourceHook::BeforeUpdate, pipeline, diffable.len());
            let updated = container.definition().before_update(&diffable, pipeline)?;
            self.check_response(&root_type, ResourceHook::BeforeUpdate, &updated)?;
            tree.replace_roots(updated);

            traversal = Traversal::new(&self.graph);
            root = self.update_root_layer(&mut traversal, tree, &root_type, targeted)?;
        }

        self.propagate_relationship_updates(tree, &mut traversal, root, pipeline)
    }

    /// Fires `AfterUpdate` on the roots, then `AfterUpdateRelationship` on
    /// nested layers.
    ///
    /// # Errors
    ///
    /// Returns the first hook or configuration error.
    pub fn after_update(&self, tree: &ResourceTree, pipeline: ResourcePipeline) -> Result<(), HookError> {
        self.after_write(tree, pipeline, ResourceHook::AfterUpdate)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delete
    // ─────────────────────────────────────────────────────────────────────────

    /// Fires `BeforeDelete` on the roots, then
    /// `BeforeImplicitUpdateRelationship` for every persisted resource related
    /// to a deleted root.
    ///
    /// The set handed to `BeforeDelete` holds persisted values where loaded,
    /// requested values otherwise.
    ///
    /// # Errors
    ///
    /// Returns the first hook, loader or configuration error.
    pub fn before_delete(
        &self,
        tree: &mut ResourceTree,
        pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut root = Traversal::new(&self.graph).create_layer(tree, &root_type, tree.roots())?;

        if let Some(container) = self.helper.container(&root_type, ResourceHook::BeforeDelete)? {
            let database_values =
                self.helper
                    .load_db_values(&root_type, &root.ids(), ResourceHook::BeforeDelete, &[])?;
            let resources = root
                .resources(tree)
                .into_iter()
                .map(|resource| persisted_or(database_values.as_ref(), resource));
            let set = ResourceHashSet::new(root_type.clone(), resources);
            log_dispatch(&root_type, ResourceHook::BeforeDelete, pipeline, set.len());
            let updated = container.definition().before_delete(&set, pipeline)?;
            self.check_response(&root_type, ResourceHook::BeforeDelete, &updated)?;
            tree.replace_roots(updated);

            root = Traversal::new(&self.graph).create_layer(tree, &root_type, tree.roots())?;
        }

        let ids = root.ids();
        let deleted: HashSet<ResourceKey> = root.keys().cloned().collect();
        let mut implicit = ImplicitUpdates::new();
        for relationship in self.graph.relationships(&root_type) {
            let affected_type = relationship.right_type();
            if self
                .helper
                .container(affected_type, ResourceHook::BeforeImplicitUpdateRelationship)?
                .is_none()
            {
                continue;
            }
            let affected = self
                .helper
                .load_implicitly_affected(relationship, &ids, &deleted)?;
            let key = self.as_seen_from_right(relationship);
            implicit_entry(&mut implicit, affected_type)
                .extend(&key, affected.into_values().map(|(resource, _)| resource));
        }
        self.fire_implicit_updates(implicit, pipeline)
    }

    /// Fires `AfterDelete` on the roots with the outcome of the delete.
    ///
    /// # Errors
    ///
    /// Returns the hook's error.
    pub fn after_delete(
        &self,
        tree: &ResourceTree,
        pipeline: ResourcePipeline,
        succeeded: bool,
    ) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        if let Some(container) = self.helper.container(&root_type, ResourceHook::AfterDelete)? {
            let root = Traversal::new(&self.graph).create_layer(tree, &root_type, tree.roots())?;
            let set = root.resource_set(tree);
            log_dispatch(&root_type, ResourceHook::AfterDelete, pipeline, set.len());
            container.definition().after_delete(&set, pipeline, succeeded)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Return
    // ─────────────────────────────────────────────────────────────────────────

    /// Fires `OnReturn` on the roots and on every nested layer, merging the
    /// returned sets back into the tree.
    ///
    /// The root result replaces the roots. A nested result filters its layer
    /// and overwrites the attributes of the resources it keeps. Resources no
    /// longer reachable from the roots are dropped from the tree.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::InvalidHookResponse`] when a `GetSingle` root hook
    /// returns more than one resource; otherwise the first hook or
    /// configuration error.
    pub fn on_return(&self, tree: &mut ResourceTree, pipeline: ResourcePipeline) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut traversal = Traversal::new(&self.graph);
        let mut root = traversal.create_layer(tree, &root_type, tree.roots())?;

        if let Some(container) = self.helper.container(&root_type, ResourceHook::OnReturn)? {
            let set = root.resource_set(tree);
            log_dispatch(&root_type, ResourceHook::OnReturn, pipeline, set.len());
            let updated = container.definition().on_return(&set, pipeline)?;
            self.check_response(&root_type, ResourceHook::OnReturn, &updated)?;
            if pipeline.expects_single() && updated.len() > 1 {
                return Err(HookError::invalid_response(
                    &root_type,
                    ResourceHook::OnReturn,
                    format!(
                        "returned {} resources for a single-resource request",
                        updated.len()
                    ),
                ));
            }
            tree.replace_roots(updated);

            traversal = Traversal::new(&self.graph);
            root = traversal.create_layer(tree, &root_type, tree.roots())?;
        }

        let mut current = vec![root];
        loop {
            let mut next = traversal.next_layers(tree, &current)?;
            if next.is_empty() {
                let removed = tree.prune_unreachable();
                if removed > 0 {
                    tracing::debug!(removed, "dropped resources no longer returned");
                }
                return Ok(());
            }
            for layer in &mut next {
                let Some(container) = self.helper.container(layer.resource_type(), ResourceHook::OnReturn)? else {
                    continue;
                };
                let set = layer.resource_set(tree);
                log_dispatch(layer.resource_type(), ResourceHook::OnReturn, pipeline, set.len());
                let updated = container.definition().on_return(&set, pipeline)?;
                self.check_response(layer.resource_type(), ResourceHook::OnReturn, &updated)?;

                let kept: Vec<Resource> = updated
                    .into_iter()
                    .filter(|resource| resource.resource_type() == layer.resource_type())
                    .collect();
                let allowed: Vec<String> = kept.iter().map(|resource| resource.id().to_owned()).collect();
                self.helper.filter(layer, &allowed);
                for resource in kept {
                    if layer.contains(resource.id()) {
                        tree.insert(resource);
                    }
                }
                traversal.reassemble(tree, layer);
            }
            traversal.detach_pruned(tree, &next);
            current = next;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Full cycles
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs a read: `BeforeRead`, `fetch`, `AfterRead`, `OnReturn`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step; later steps do not run.
    pub fn run_read<F>(
        &self,
        resource_type: &ResourceType,
        pipeline: ResourcePipeline,
        id: Option<&str>,
        includes: &[Vec<String>],
        fetch: F,
    ) -> Result<ResourceTree, HookError>
    where
        F: FnOnce() -> Result<ResourceTree, HookError>,
    {
        self.before_read(resource_type, pipeline, id, includes)?;
        let mut tree = fetch()?;
        self.after_read(&tree, pipeline)?;
        self.on_return(&mut tree, pipeline)?;
        Ok(tree)
    }

    /// Runs a create: before-hooks, `persist`, after-hooks, `OnReturn`.
    ///
    /// `persist` receives the tree as filtered by the before-hooks and returns
    /// the tree as stored.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step; later steps do not run.
    pub fn run_create<F>(
        &self,
        mut tree: ResourceTree,
        pipeline: ResourcePipeline,
        persist: F,
    ) -> Result<ResourceTree, HookError>
    where
        F: FnOnce(&ResourceTree) -> Result<ResourceTree, HookError>,
    {
        self.before_create(&mut tree, pipeline)?;
        let mut persisted = persist(&tree)?;
        self.after_create(&persisted, pipeline)?;
        self.on_return(&mut persisted, pipeline)?;
        Ok(persisted)
    }

    /// Runs an update: before-hooks, `persist`, after-hooks, `OnReturn`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step; later steps do not run.
    pub fn run_update<F>(
        &self,
        mut tree: ResourceTree,
        pipeline: ResourcePipeline,
        targeted: &TargetedFields,
        persist: F,
    ) -> Result<ResourceTree, HookError>
    where
        F: FnOnce(&ResourceTree) -> Result<ResourceTree, HookError>,
    {
        self.before_update(&mut tree, pipeline, targeted)?;
        let mut persisted = persist(&tree)?;
        self.after_update(&persisted, pipeline)?;
        self.on_return(&mut persisted, pipeline)?;
        Ok(persisted)
    }

    /// Runs a delete: before-hooks, `delete`, `AfterDelete`.
    ///
    /// `AfterDelete` runs even when `delete` fails, with `succeeded = false`;
    /// the delete error is then returned.
    ///
    /// # Errors
    ///
    /// Returns the delete error if any, otherwise the first hook error.
    pub fn run_delete<F>(
        &self,
        mut tree: ResourceTree,
        pipeline: ResourcePipeline,
        delete: F,
    ) -> Result<ResourceTree, HookError>
    where
        F: FnOnce(&ResourceTree) -> Result<(), HookError>,
    {
        self.before_delete(&mut tree, pipeline)?;
        let outcome = delete(&tree);
        let after = self.after_delete(&tree, pipeline, outcome.is_ok());
        outcome?;
        after?;
        Ok(tree)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn update_root_layer(
        &self,
        traversal: &mut Traversal<'_>,
        tree: &ResourceTree,
        root_type: &ResourceType,
        targeted: &TargetedFields,
    ) -> Result<NodeLayer, HookError> {
        let mut root = traversal.create_layer(tree, root_type, tree.roots())?;
        if !targeted.relationships().is_empty() {
            root.restrict_relationships(targeted.relationships());
        }
        Ok(root)
    }

    fn after_write(
        &self,
        tree: &ResourceTree,
        pipeline: ResourcePipeline,
        hook: ResourceHook,
    ) -> Result<(), HookError> {
        let Some(root_type) = tree.root_type().cloned() else {
            return Ok(());
        };
        let mut traversal = Traversal::new(&self.graph);
        let root = traversal.create_layer(tree, &root_type, tree.roots())?;

        if let Some(container) = self.helper.container(&root_type, hook)? {
            let set = root.resource_set(tree);
            log_dispatch(&root_type, hook, pipeline, set.len());
            if hook == ResourceHook::AfterCreate {
                container.definition().after_create(&set, pipeline)?;
            } else {
                container.definition().after_update(&set, pipeline)?;
            }
        }

        self.walk(tree, &mut traversal, root, |tree, layer| {
            let nested = ResourceHook::AfterUpdateRelationship;
            if let Some(container) = self.helper.container(layer.resource_type(), nested)? {
                let dictionary = self.relationships_dictionary(tree, layer, None);
                log_dispatch(layer.resource_type(), nested, pipeline, layer.len());
                container
                    .definition()
                    .after_update_relationship(&dictionary, pipeline)?;
            }
            Ok(())
        })
    }

    /// Runs relationship hooks below `root`, pruning and reassembling as it
    /// descends.
    fn propagate_relationship_updates(
        &self,
        tree: &mut ResourceTree,
        traversal: &mut Traversal<'_>,
        root: NodeLayer,
        pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        // Roots of a create have no persisted relationships to replace.
        if !pipeline.is_create() {
            let mut implicit = ImplicitUpdates::new();
            self.collect_replaced(tree, &root, &mut implicit)?;
            self.fire_implicit_updates(implicit, pipeline)?;
        }

        let mut current = vec![root];
        loop {
            let mut next = traversal.next_layers(tree, &current)?;
            if next.is_empty() {
                return Ok(());
            }
            for layer in &mut next {
                self.fire_before_update_relationship(tree, layer, pipeline)?;
                traversal.reassemble(tree, layer);
            }
            traversal.detach_pruned(tree, &next);

            let mut implicit = ImplicitUpdates::new();
            for layer in &next {
                self.collect_stolen(layer, &mut implicit)?;
                self.collect_replaced(tree, layer, &mut implicit)?;
            }
            self.fire_implicit_updates(implicit, pipeline)?;
            current = next;
        }
    }

    fn fire_before_update_relationship(
        &self,
        tree: &ResourceTree,
        layer: &mut NodeLayer,
        pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        let hook = ResourceHook::BeforeUpdateRelationship;
        let Some(container) = self.helper.container(layer.resource_type(), hook)? else {
            return Ok(());
        };
        let ids = layer.ids();
        let database_values = self.helper.load_db_values(
            layer.resource_type(),
            &ids,
            hook,
            layer.relationships_to_next(),
        )?;
        let dictionary = self.relationships_dictionary(tree, layer, database_values.as_ref());
        log_dispatch(layer.resource_type(), hook, pipeline, ids.len());
        let allowed = container
            .definition()
            .before_update_relationship(&ids, &dictionary, pipeline)?;
        self.helper.filter(layer, &allowed);
        Ok(())
    }

    /// Persisted right-side resources that a populated slot on `layer`
    /// replaces.
    fn collect_replaced(
        &self,
        tree: &ResourceTree,
        layer: &NodeLayer,
        implicit: &mut ImplicitUpdates,
    ) -> Result<(), HookError> {
        for relationship in layer.relationships_to_next() {
            let affected_type = relationship.right_type();
            if self
                .helper
                .container(affected_type, ResourceHook::BeforeImplicitUpdateRelationship)?
                .is_none()
            {
                continue;
            }

            let mut left_ids = Vec::new();
            let mut requested: HashSet<ResourceKey> = HashSet::new();
            for node in layer.nodes() {
                let Some(value) = tree.relationship(node.key(), relationship.name()) else {
                    continue;
                };
                left_ids.push(node.id().to_owned());
                requested.extend(value.keys().cloned());
            }

            let affected = self
                .helper
                .load_implicitly_affected(relationship, &left_ids, &requested)?;
            if affected.is_empty() {
                continue;
            }
            let key = self.as_seen_from_right(relationship);
            implicit_entry(implicit, affected_type)
                .extend(&key, affected.into_values().map(|(resource, _)| resource));
        }
        Ok(())
    }

    /// Persisted left-side resources that lose a right resource newly
    /// assigned through a relationship whose inverse is to-one.
    fn collect_stolen(&self, layer: &NodeLayer, implicit: &mut ImplicitUpdates) -> Result<(), HookError> {
        for group in layer.relationships_from_previous() {
            let relationship = group.relationship();
            let Some(inverse) = self.graph.inverse(relationship) else {
                continue;
            };
            if !inverse.is_to_one() {
                continue;
            }
            let affected_type = relationship.left_type();
            if self
                .helper
                .container(affected_type, ResourceHook::BeforeImplicitUpdateRelationship)?
                .is_none()
            {
                continue;
            }

            let right_ids: Vec<String> = group
                .right()
                .filter(|id| !layer.is_pruned(id))
                .map(str::to_owned)
                .collect();
            let requesters: HashSet<ResourceKey> = group.left().cloned().collect();
            let affected = self
                .helper
                .load_implicitly_affected(inverse, &right_ids, &requesters)?;
            if affected.is_empty() {
                continue;
            }
            implicit_entry(implicit, affected_type)
                .extend(relationship, affected.into_values().map(|(resource, _)| resource));
        }
        Ok(())
    }

    fn fire_implicit_updates(
        &self,
        implicit: ImplicitUpdates,
        pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        let hook = ResourceHook::BeforeImplicitUpdateRelationship;
        for (resource_type, dictionary) in implicit {
            if dictionary.is_empty() {
                continue;
            }
            let Some(container) = self.helper.container(&resource_type, hook)? else {
                continue;
            };
            log_dispatch(&resource_type, hook, pipeline, dictionary.resources().len());
            container
                .definition()
                .before_implicit_update_relationship(&dictionary, pipeline)?;
        }
        Ok(())
    }

    /// Groups a nested layer's nodes by the relationship that reached them,
    /// keyed as seen from the layer's type.
    fn relationships_dictionary(
        &self,
        tree: &ResourceTree,
        layer: &NodeLayer,
        database_values: Option<&DatabaseValues>,
    ) -> RelationshipsDictionary {
        let mut dictionary = RelationshipsDictionary::new(layer.resource_type().clone());
        for (relationship, ids) in layer.ids_by_relationship() {
            let key = self.as_seen_from_right(relationship);
            for id in ids {
                let requested = tree
                    .get(&ResourceKey::new(layer.resource_type().clone(), id))
                    .cloned()
                    .unwrap_or_else(|| Resource::new(layer.resource_type().clone(), id));
                dictionary.insert(Arc::clone(&key), persisted_or(database_values, requested));
            }
        }
        dictionary
    }

    fn as_seen_from_right(&self, relationship: &Arc<Relationship>) -> Arc<Relationship> {
        self.graph
            .inverse(relationship)
            .map_or_else(|| Arc::clone(relationship), Arc::clone)
    }

    fn check_response(
        &self,
        resource_type: &ResourceType,
        hook: ResourceHook,
        resources: &[Resource],
    ) -> Result<(), HookError> {
        if !self.helper.options().validate_responses {
            return Ok(());
        }
        match resources
            .iter()
            .find(|resource| resource.resource_type() != resource_type)
        {
            Some(foreign) => Err(HookError::invalid_response(
                resource_type,
                hook,
                format!("returned '{}', which is not a '{resource_type}'", foreign.key()),
            )),
            None => Ok(()),
        }
    }

    /// Visits every nested layer below `root` without changing the tree.
    fn walk<F>(
        &self,
        tree: &ResourceTree,
        traversal: &mut Traversal<'_>,
        root: NodeLayer,
        mut visit: F,
    ) -> Result<(), HookError>
    where
        F: FnMut(&ResourceTree, &NodeLayer) -> Result<(), HookError>,
    {
        let mut current = vec![root];
        loop {
            let next = traversal.next_layers(tree, &current)?;
            if next.is_empty() {
                return Ok(());
            }
            for layer in &next {
                visit(tree, layer)?;
            }
            current = next;
        }
    }
}

fn implicit_entry<'a>(
    implicit: &'a mut ImplicitUpdates,
    resource_type: &ResourceType,
) -> &'a mut RelationshipsDictionary {
    implicit
        .entry(resource_type.clone())
        .or_insert_with(|| RelationshipsDictionary::new(resource_type.clone()))
}

fn persisted_or(database_values: Option<&DatabaseValues>, requested: Resource) -> Resource {
    database_values
        .and_then(|values| values.get(requested.id()))
        .cloned()
        .unwrap_or(requested)
}

fn log_dispatch(resource_type: &ResourceType, hook: ResourceHook, pipeline: ResourcePipeline, count: usize) {
    tracing::debug!(
        resource_type = %resource_type,
        hook = %hook,
        pipeline = ?pipeline,
        count,
        "firing resource hook"
    );
}
