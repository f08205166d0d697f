//! Resource definitions: the user extension point.
//!
//! A [`ResourceDefinition`] holds the lifecycle hooks of one resource type.
//! Every hook has a default implementation that passes resources through
//! untouched, so a definition only overrides what it needs. The set of hooks
//! it actually implements is declared by
//! [`capabilities`](ResourceDefinition::capabilities); the executor never
//! calls a hook that is not declared there.
//!
//! Definitions are registered in a [`ResourceDefinitions`] registry, one per
//! resource type.
//!
//! # Example
//!
//! ```
//! use strata_hooks::prelude::*;
//! use strata_resource::Resource;
//!
//! struct Articles;
//!
//! impl ResourceDefinition for Articles {
//!     fn capabilities(&self) -> HookCapabilities {
//!         HookCapabilities::none().with(ResourceHook::OnReturn)
//!     }
//!
//!     fn on_return(
//!         &self,
//!         resources: &ResourceHashSet,
//!         _pipeline: ResourcePipeline,
//!     ) -> Result<Vec<Resource>, HookError> {
//!         Ok(resources
//!             .iter()
//!             .filter(|article| article.attribute("draft").is_none())
//!             .cloned()
//!             .collect())
//!     }
//! }
//!
//! let definitions = ResourceDefinitions::new();
//! definitions.register("articles", Articles).unwrap();
//! assert!(definitions.contains(&"articles".into()));
//! ```

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use strata_resource::{Resource, ResourceType};

use crate::error::HookError;
use crate::hook::{HookCapabilities, ResourceHook, ResourcePipeline};
use crate::sets::{DiffableResourceHashSet, RelationshipsDictionary, ResourceHashSet};

// ─────────────────────────────────────────────────────────────────────────────
// ResourceDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle hooks of one resource type.
///
/// Before-hooks that return resources may filter, reorder or transform the
/// set they receive; the returned set replaces it. Returning an error aborts
/// the operation and the error reaches the caller unchanged.
pub trait ResourceDefinition: Send + Sync + 'static {
    /// Declares which hooks this definition implements.
    fn capabilities(&self) -> HookCapabilities;

    /// Called before the root resources of a create are persisted.
    ///
    /// # Errors
    ///
    /// Any error aborts the create.
    fn before_create(
        &self,
        resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<Resource>, HookError> {
        Ok(resources.to_vec())
    }

    /// Called after the root resources of a create were persisted.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller.
    fn after_create(
        &self,
        _resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before resources are read.
    ///
    /// `is_included` is true when the type is read as part of an include
    /// chain; `id` is set for single-resource reads of the root type.
    ///
    /// # Errors
    ///
    /// Any error aborts the read.
    fn before_read(
        &self,
        _pipeline: ResourcePipeline,
        _is_included: bool,
        _id: Option<&str>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after resources were read.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller.
    fn after_read(
        &self,
        _resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
        _is_included: bool,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before the root resources of an update are persisted.
    ///
    /// # Errors
    ///
    /// Any error aborts the update.
    fn before_update(
        &self,
        resources: &DiffableResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<Resource>, HookError> {
        Ok(resources.as_set().to_vec())
    }

    /// Called after the root resources of an update were persisted.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller.
    fn after_update(
        &self,
        _resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before the root resources of a delete are removed.
    ///
    /// # Errors
    ///
    /// Any error aborts the delete.
    fn before_delete(
        &self,
        resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<Resource>, HookError> {
        Ok(resources.to_vec())
    }

    /// Called after a delete, with whether it succeeded.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller.
    fn after_delete(
        &self,
        _resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
        _succeeded: bool,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before resources of this type are assigned to a relationship of
    /// another resource.
    ///
    /// Returns the ids that may be assigned; the others are removed from the
    /// request.
    ///
    /// # Errors
    ///
    /// Any error aborts the operation.
    fn before_update_relationship(
        &self,
        ids: &[String],
        _resources_by_relationship: &RelationshipsDictionary,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<String>, HookError> {
        Ok(ids.to_vec())
    }

    /// Called before persisted resources of this type lose or change a
    /// relationship as a side effect of the operation.
    ///
    /// # Errors
    ///
    /// Any error aborts the operation.
    fn before_implicit_update_relationship(
        &self,
        _resources_by_relationship: &RelationshipsDictionary,
        _pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after resources of this type were assigned to a relationship of
    /// another resource.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller.
    fn after_update_relationship(
        &self,
        _resources_by_relationship: &RelationshipsDictionary,
        _pipeline: ResourcePipeline,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before resources of this type leave the server.
    ///
    /// # Errors
    ///
    /// Any error aborts the response.
    fn on_return(
        &self,
        resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<Resource>, HookError> {
        Ok(resources.to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookContainer
// ─────────────────────────────────────────────────────────────────────────────

/// A registered definition together with its validated capabilities.
pub struct HookContainer {
    resource_type: ResourceType,
    definition: Arc<dyn ResourceDefinition>,
    capabilities: HookCapabilities,
}

impl HookContainer {
    pub(crate) fn new(resource_type: ResourceType, definition: Arc<dyn ResourceDefinition>) -> Self {
        let capabilities = definition.capabilities();
        Self {
            resource_type,
            definition,
            capabilities,
        }
    }

    /// Returns the resource type this container serves.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the definition.
    #[must_use]
    pub fn definition(&self) -> &dyn ResourceDefinition {
        self.definition.as_ref()
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub fn capabilities(&self) -> HookCapabilities {
        self.capabilities
    }

    /// Returns whether `hook` is implemented.
    #[must_use]
    pub fn implements(&self, hook: ResourceHook) -> bool {
        self.capabilities.contains(hook)
    }
}

impl fmt::Debug for HookContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContainer")
            .field("resource_type", &self.resource_type)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DefinitionRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during definition registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionRegistrationError {
    /// A definition for this resource type is already registered.
    Duplicate(ResourceType),
}

impl fmt::Display for DefinitionRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionRegistrationError::Duplicate(resource_type) => {
                write!(
                    f,
                    "a resource definition is already registered for '{resource_type}'"
                )
            }
        }
    }
}

impl core::error::Error for DefinitionRegistrationError {}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceDefinitions
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of resource definitions, keyed by resource type.
///
/// Uses interior mutability via [`RwLock`] so definitions can be registered
/// through a shared reference while executors read from it.
#[derive(Default)]
pub struct ResourceDefinitions {
    definitions: RwLock<HashMap<ResourceType, Arc<dyn ResourceDefinition>>>,
}

impl ResourceDefinitions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers the definition of `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionRegistrationError::Duplicate`] if the type already
    /// has a definition.
    pub fn register(
        &self,
        resource_type: impl Into<ResourceType>,
        definition: impl ResourceDefinition,
    ) -> Result<&Self, DefinitionRegistrationError> {
        self.register_arc(resource_type, Arc::new(definition))
    }

    /// Registers a shared definition of `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionRegistrationError::Duplicate`] if the type already
    /// has a definition.
    pub fn register_arc(
        &self,
        resource_type: impl Into<ResourceType>,
        definition: Arc<dyn ResourceDefinition>,
    ) -> Result<&Self, DefinitionRegistrationError> {
        let resource_type = resource_type.into();
        let mut definitions = self.definitions.write();
        if definitions.contains_key(&resource_type) {
            return Err(DefinitionRegistrationError::Duplicate(resource_type));
        }
        tracing::debug!(
            resource_type = %resource_type,
            capabilities = ?definition.capabilities(),
            "registered resource definition"
        );
        definitions.insert(resource_type, definition);
        Ok(self)
    }

    /// Returns the definition of `resource_type`.
    #[must_use]
    pub fn get(&self, resource_type: &ResourceType) -> Option<Arc<dyn ResourceDefinition>> {
        self.definitions.read().get(resource_type).cloned()
    }

    /// Returns whether `resource_type` has a definition.
    #[must_use]
    pub fn contains(&self, resource_type: &ResourceType) -> bool {
        self.definitions.read().contains_key(resource_type)
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

impl fmt::Debug for ResourceDefinitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definitions = self.definitions.read();
        f.debug_struct("ResourceDefinitions")
            .field("resource_types", &definitions.keys().collect::<Vec<_>>())
            .finish()
    }
}
