//! Resource lifecycle hooks for Strata (Layer 2).
//!
//! `strata_hooks` runs user-defined hooks around the persistence of resource
//! trees. Given a request tree (roots plus nested relationships, possibly
//! cyclic) it walks the tree layer by layer, decides which hooks apply to
//! which resources, calls them in a fixed before/after order and merges their
//! results back into the tree.
//!
//! # Core Concepts
//!
//! - [`ResourceDefinition`] - The hooks of one resource type
//! - [`ResourceDefinitions`] - Registry of definitions, keyed by type
//! - [`ResourceHookExecutor`] - Orchestrates hooks for reads, creates, updates and deletes
//! - [`Traversal`] - Layered walk with cycle detection and reassembly
//! - [`HookExecutorHelper`] - Capability cache and persisted-value loading
//!
//! # Architecture
//!
//! - **Layer 1** (`strata_resource`): Resource model
//! - **Layer 2** (`strata_hooks`): Traversal and lifecycle hook execution (this crate)
//! - **Infrastructure** (`strata_core`): Tracing configuration

/// Resource definitions and their registry.
pub mod definition;

/// Error types.
pub mod error;

/// Hook orchestration.
pub mod executor;

/// Capability lookup and persisted-value loading.
pub mod helper;

/// Hook kinds, pipelines and capabilities.
pub mod hook;

/// Executor configuration.
pub mod options;

/// Resource sets handed to hooks.
pub mod sets;

/// Layered traversal of resource trees.
pub mod traversal;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::definition::{
        DefinitionRegistrationError, HookContainer, ResourceDefinition, ResourceDefinitions,
    };
    pub use crate::error::{ConfigurationError, HookError};
    pub use crate::executor::ResourceHookExecutor;
    pub use crate::helper::HookExecutorHelper;
    pub use crate::hook::{HookCapabilities, ResourceHook, ResourcePipeline};
    pub use crate::options::HooksOptions;
    pub use crate::sets::{
        DatabaseValues, DiffableResourceHashSet, RelationshipsDictionary, ResourceDiffPair,
        ResourceHashSet, TargetedFields,
    };
    pub use crate::traversal::{NodeLayer, ParentLink, RelationshipGroup, ResourceNode, Traversal};
}

pub use definition::{DefinitionRegistrationError, ResourceDefinition, ResourceDefinitions};
pub use error::{ConfigurationError, HookError};
pub use executor::ResourceHookExecutor;
pub use helper::HookExecutorHelper;
pub use hook::{HookCapabilities, ResourceHook, ResourcePipeline};
pub use options::HooksOptions;
pub use sets::{
    DatabaseValues, DiffableResourceHashSet, RelationshipsDictionary, ResourceHashSet,
    TargetedFields,
};
pub use traversal::{NodeLayer, Traversal};
