//! Resource model for Strata (Layer 1).
//!
//! `strata_resource` describes *what* a JSON:API server exposes and holds the
//! resources that take part in a single operation:
//!
//! - [`resource`] - Resource identity ([`ResourceType`], [`ResourceKey`]) and values ([`Resource`])
//! - [`graph`] - The static [`ResourceGraph`] of types, attributes and relationships
//! - [`tree`] - Per-operation [`ResourceTree`] arenas with explicit relationship slots
//! - [`loader`] - The [`ResourceLoader`] collaborator and an in-memory [`MemoryStore`]
//!
//! # Architecture
//!
//! - **Layer 1** (`strata_resource`): Resource model (this crate)
//! - **Layer 2** (`strata_hooks`): Traversal and lifecycle hook execution
//! - **Infrastructure** (`strata_core`): Tracing configuration

/// Resource graph registry and builder API.
pub mod graph;

/// Persisted-value loading.
pub mod loader;

/// Resource identity and values.
pub mod resource;

/// Per-operation resource trees.
pub mod tree;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::graph::{Cardinality, Relationship, ResourceGraph, ValidationError};
    pub use crate::loader::{LoadError, MemoryStore, ResourceLoader};
    pub use crate::resource::{Resource, ResourceKey, ResourceType};
    pub use crate::tree::{Edge, RelationshipValue, ResourceTree};
}

pub use graph::{Cardinality, Relationship, ResourceGraph};
pub use loader::{LoadError, MemoryStore, ResourceLoader};
pub use resource::{Resource, ResourceKey, ResourceType};
pub use tree::{RelationshipValue, ResourceTree};
