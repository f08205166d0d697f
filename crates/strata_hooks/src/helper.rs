//! Capability lookup and persisted-value loading for the executor.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use parking_lot::RwLock;
use strata_resource::{Relationship, Resource, ResourceKey, ResourceLoader, ResourceType};

use crate::definition::{HookContainer, ResourceDefinitions};
use crate::error::HookError;
use crate::hook::ResourceHook;
use crate::options::HooksOptions;
use crate::sets::DatabaseValues;
use crate::traversal::NodeLayer;

/// Resolves which hooks apply and loads what they need.
///
/// Containers are looked up once per resource type and cached for the life of
/// the helper.
pub struct HookExecutorHelper {
    definitions: Arc<ResourceDefinitions>,
    loader: Option<Arc<dyn ResourceLoader>>,
    options: HooksOptions,
    containers: RwLock<HashMap<ResourceType, Option<Arc<HookContainer>>>>,
}

impl HookExecutorHelper {
    /// Creates a helper without a loader; persisted values are never loaded.
    #[must_use]
    pub fn new(definitions: Arc<ResourceDefinitions>, options: HooksOptions) -> Self {
        Self {
            definitions,
            loader: None,
            options,
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the loader used for persisted values.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replaces the options. Cached containers are kept.
    #[must_use]
    pub fn with_options(mut self, options: HooksOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &HooksOptions {
        &self.options
    }

    /// Returns the container of `resource_type` if it implements `hook`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the definition's capabilities set a
    /// database-value override on a hook that does not support one.
    pub fn container(
        &self,
        resource_type: &ResourceType,
        hook: ResourceHook,
    ) -> Result<Option<Arc<HookContainer>>, HookError> {
        let container = self.lookup(resource_type)?;
        Ok(container.filter(|container| container.implements(hook)))
    }

    /// Returns whether `resource_type` implements `hook`.
    ///
    /// Unknown types and invalid capabilities answer `false`; the latter is
    /// logged at `warn`. Use [`container`](Self::container) to receive the
    /// configuration error instead.
    #[must_use]
    pub fn should_execute_hook(&self, resource_type: &ResourceType, hook: ResourceHook) -> bool {
        match self.container(resource_type, hook) {
            Ok(container) => container.is_some(),
            Err(err) => {
                tracing::warn!(
                    resource_type = %resource_type,
                    hook = %hook,
                    error = %err,
                    "invalid hook capabilities"
                );
                false
            }
        }
    }

    /// Returns whether persisted values should be loaded for `hook`.
    ///
    /// A per-hook override wins over the global option.
    #[must_use]
    pub fn should_load_db_values(&self, resource_type: &ResourceType, hook: ResourceHook) -> bool {
        if !hook.supports_database_values() {
            return false;
        }
        match self.container(resource_type, hook) {
            Ok(Some(container)) => container
                .capabilities()
                .database_values(hook)
                .unwrap_or(self.options.load_database_values),
            _ => false,
        }
    }

    /// Loads persisted counterparts for `ids` when `hook` wants them.
    ///
    /// Only `relationships` are included in the load. Returns `None` when the
    /// hook does not want persisted values or no loader is configured.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Loader`] if the loader fails.
    pub fn load_db_values(
        &self,
        resource_type: &ResourceType,
        ids: &[String],
        hook: ResourceHook,
        relationships: &[Arc<Relationship>],
    ) -> Result<Option<DatabaseValues>, HookError> {
        if !self.should_load_db_values(resource_type, hook) {
            return Ok(None);
        }
        let Some(loader) = &self.loader else {
            tracing::warn!(
                resource_type = %resource_type,
                hook = %hook,
                "database values requested but no loader is configured"
            );
            return Ok(None);
        };
        let tree = loader.load(resource_type, ids, relationships)?;
        if tree.roots().len() < ids.len() {
            tracing::debug!(
                resource_type = %resource_type,
                requested = ids.len(),
                found = tree.roots().len(),
                "some resources have no persisted counterpart"
            );
        }
        Ok(Some(DatabaseValues::new(resource_type.clone(), tree)))
    }

    /// Loads the resources currently on the right side of `relationship` for
    /// `left_ids`, minus `exclude`.
    ///
    /// Each affected resource is paired with the left keys that currently hold
    /// it. Returns nothing when no loader is configured.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Loader`] if the loader fails.
    pub fn load_implicitly_affected(
        &self,
        relationship: &Arc<Relationship>,
        left_ids: &[String],
        exclude: &HashSet<ResourceKey>,
    ) -> Result<IndexMap<ResourceKey, (Resource, Vec<ResourceKey>)>, HookError> {
        let mut affected: IndexMap<ResourceKey, (Resource, Vec<ResourceKey>)> = IndexMap::new();
        let Some(loader) = &self.loader else {
            return Ok(affected);
        };
        if left_ids.is_empty() {
            return Ok(affected);
        }

        let tree = loader.load(
            relationship.left_type(),
            left_ids,
            core::slice::from_ref(relationship),
        )?;
        for left in tree.roots() {
            let Some(value) = tree.relationship(left, relationship.name()) else {
                continue;
            };
            for target in value.keys().filter(|target| !exclude.contains(*target)) {
                let resource = tree
                    .get(target)
                    .cloned()
                    .unwrap_or_else(|| Resource::from_key(target.clone()));
                affected
                    .entry(target.clone())
                    .or_insert_with(|| (resource, Vec::new()))
                    .1
                    .push(left.clone());
            }
        }
        tracing::trace!(
            relationship = %relationship,
            left = left_ids.len(),
            affected = affected.len(),
            "loaded implicitly affected resources"
        );
        Ok(affected)
    }

    /// Prunes the nodes of `layer` whose id is not in `allowed`.
    ///
    /// Returns the number of nodes removed.
    pub fn filter(&self, layer: &mut NodeLayer, allowed: &[String]) -> usize {
        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        let removed = layer.retain_ids(|id| allowed.contains(id));
        if removed > 0 {
            tracing::debug!(
                resource_type = %layer.resource_type(),
                depth = layer.depth(),
                removed,
                "hook removed resources from layer"
            );
        }
        removed
    }

    fn lookup(&self, resource_type: &ResourceType) -> Result<Option<Arc<HookContainer>>, HookError> {
        if let Some(cached) = self.containers.read().get(resource_type) {
            return Ok(cached.clone());
        }

        let container = match self.definitions.get(resource_type) {
            Some(definition) => {
                let container = HookContainer::new(resource_type.clone(), definition);
                container.capabilities().validate(resource_type)?;
                Some(Arc::new(container))
            }
            None => None,
        };
        Ok(self
            .containers
            .write()
            .entry(resource_type.clone())
            .or_insert(container)
            .clone())
    }
}

impl core::fmt::Debug for HookExecutorHelper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookExecutorHelper")
            .field("options", &self.options)
            .field("has_loader", &self.loader.is_some())
            .field("cached", &self.containers.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use strata_resource::{Cardinality, MemoryStore, RelationshipValue};

    use super::*;
    use crate::definition::ResourceDefinition;
    use crate::hook::HookCapabilities;

    struct Declares(HookCapabilities);

    impl ResourceDefinition for Declares {
        fn capabilities(&self) -> HookCapabilities {
            self.0
        }
    }

    fn helper(capabilities: HookCapabilities, options: HooksOptions) -> HookExecutorHelper {
        let definitions = ResourceDefinitions::new();
        definitions.register("articles", Declares(capabilities)).unwrap();
        HookExecutorHelper::new(Arc::new(definitions), options)
    }

    #[test]
    fn unknown_types_never_execute() {
        let helper = helper(HookCapabilities::none(), HooksOptions::default());
        assert!(!helper.should_execute_hook(&"ghosts".into(), ResourceHook::BeforeCreate));
        assert!(!helper.should_execute_hook(&"articles".into(), ResourceHook::BeforeCreate));
    }

    #[test]
    fn override_wins_over_global_option() {
        let capabilities = HookCapabilities::none()
            .with(ResourceHook::BeforeUpdate)
            .with(ResourceHook::BeforeDelete)
            .load_database_values(ResourceHook::BeforeDelete, false);
        let helper = helper(
            capabilities,
            HooksOptions::default().with_load_database_values(true),
        );

        let articles = ResourceType::new("articles");
        assert!(helper.should_load_db_values(&articles, ResourceHook::BeforeUpdate));
        assert!(!helper.should_load_db_values(&articles, ResourceHook::BeforeDelete));
    }

    #[test]
    fn invalid_override_surfaces_as_configuration_error() {
        let capabilities = HookCapabilities::none()
            .with(ResourceHook::AfterRead)
            .load_database_values(ResourceHook::AfterRead, true);
        let helper = helper(capabilities, HooksOptions::default());

        let err = helper
            .container(&"articles".into(), ResourceHook::AfterRead)
            .unwrap_err();
        assert!(matches!(err, HookError::Configuration(_)));
        assert!(!helper.should_execute_hook(&"articles".into(), ResourceHook::AfterRead));
        assert!(!helper.should_load_db_values(&"articles".into(), ResourceHook::AfterRead));

        // Not cached as absent: every lookup reports the error again.
        assert!(matches!(
            helper.container(&"articles".into(), ResourceHook::BeforeRead),
            Err(HookError::Configuration(_))
        ));
    }

    #[test]
    fn missing_counterparts_are_absent() {
        let store = MemoryStore::new();
        store.insert(Resource::new("articles", "1").with_attribute("title", "stored"));
        let capabilities = HookCapabilities::none()
            .with(ResourceHook::BeforeUpdate)
            .load_database_values(ResourceHook::BeforeUpdate, true);
        let helper = helper(capabilities, HooksOptions::default()).with_loader(Arc::new(store));

        let values = helper
            .load_db_values(
                &"articles".into(),
                &["1".to_owned(), "2".to_owned()],
                ResourceHook::BeforeUpdate,
                &[],
            )
            .unwrap()
            .unwrap();

        assert!(values.get("1").is_some());
        assert!(values.get("2").is_none());
    }

    #[test]
    fn implicitly_affected_excludes_requested_resources() {
        let store = MemoryStore::new();
        store.set_relationship(
            &ResourceKey::new("people", "1"),
            "articles",
            RelationshipValue::ToMany(vec![
                ResourceKey::new("articles", "a"),
                ResourceKey::new("articles", "b"),
            ]),
        );
        let helper = helper(HookCapabilities::none(), HooksOptions::default())
            .with_loader(Arc::new(store));
        let relationship = Arc::new(Relationship::new(
            "articles",
            "people",
            "articles",
            Cardinality::ToMany,
        ));
        let exclude = HashSet::from([ResourceKey::new("articles", "a")]);

        let affected = helper
            .load_implicitly_affected(&relationship, &["1".to_owned()], &exclude)
            .unwrap();

        assert_eq!(affected.len(), 1);
        let (resource, holders) = &affected[&ResourceKey::new("articles", "b")];
        assert_eq!(resource.id(), "b");
        assert_eq!(holders, &[ResourceKey::new("people", "1")]);
    }
}
