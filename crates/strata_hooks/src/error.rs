//! Error types for hook execution.

use std::error::Error;

use strata_resource::{LoadError, ResourceKey, ResourceType};

use crate::hook::ResourceHook;

/// A mismatch between the resource graph, the registered definitions, and the
/// data handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A resource type is not part of the resource graph.
    #[error("resource type '{0}' is not registered in the resource graph")]
    UnknownResourceType(ResourceType),

    /// A relationship name is not declared on a resource type.
    #[error("relationship '{relationship}' is not declared on '{resource_type}'")]
    UnknownRelationship {
        /// The type that was expected to declare the relationship.
        resource_type: ResourceType,
        /// The undeclared name.
        relationship: String,
    },

    /// A relationship slot references a resource of the wrong type.
    #[error("relationship '{resource_type}.{relationship}' references '{target}'")]
    UnexpectedTarget {
        /// The type declaring the relationship.
        resource_type: ResourceType,
        /// The relationship name.
        relationship: String,
        /// The offending target.
        target: ResourceKey,
    },

    /// A layer was asked to hold resources of more than one type.
    #[error("expected resources of type '{expected}', found '{found}'")]
    MixedResourceTypes {
        /// The type of the layer.
        expected: ResourceType,
        /// The key that does not belong to it.
        found: ResourceKey,
    },

    /// A database-value override was set on a hook that cannot use it.
    #[error("hook {hook} on '{resource_type}' does not support loading database values")]
    DatabaseValuesNotSupported {
        /// The type whose capabilities are invalid.
        resource_type: ResourceType,
        /// The hook carrying the override.
        hook: ResourceHook,
    },

    /// Persisted values were requested but not loaded for this hook.
    #[error(
        "database values were not loaded for '{resource_type}'; enable them for {hook} to use diffs"
    )]
    DatabaseValuesNotLoaded {
        /// The type whose set was diffed.
        resource_type: ResourceType,
        /// The hook that received the set.
        hook: ResourceHook,
    },
}

/// Errors raised while executing resource hooks.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The graph, the definitions or the request tree disagree.
    #[error("hook configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A hook returned something the executor cannot merge back.
    #[error("invalid response from {hook} on '{resource_type}': {reason}")]
    InvalidHookResponse {
        /// The type whose definition returned the value.
        resource_type: ResourceType,
        /// The hook that returned it.
        hook: ResourceHook,
        /// What was wrong with it.
        reason: String,
    },

    /// Loading persisted values failed.
    #[error("failed to load persisted values: {0}")]
    Loader(#[from] LoadError),

    /// An error raised by a resource definition, passed through unchanged.
    #[error(transparent)]
    User(Box<dyn Error + Send + Sync + 'static>),
}

impl HookError {
    /// Wraps an error raised inside a resource definition.
    ///
    /// ```
    /// use strata_hooks::HookError;
    ///
    /// let err = HookError::user("articles cannot be published on Sundays");
    /// assert!(err.is_user());
    /// assert_eq!(err.to_string(), "articles cannot be published on Sundays");
    /// ```
    pub fn user(err: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::User(err.into())
    }

    /// Returns true if the error was raised by a resource definition.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Returns the user error as `T`, if it is one.
    #[must_use]
    pub fn downcast_user_ref<T: Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::User(err) => err.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub(crate) fn invalid_response(
        resource_type: &ResourceType,
        hook: ResourceHook,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidHookResponse {
            resource_type: resource_type.clone(),
            hook,
            reason: reason.into(),
        }
    }
}
