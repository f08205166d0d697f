//! # Strata Internal Library
//!
//! Re-exports the core Strata crates for convenience.

/// Layer 1: resource model, resource graph and resource trees.
pub use strata_resource;

/// Layer 2: resource lifecycle hook execution.
pub use strata_hooks;

/// Tracing setup.
pub use strata_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_core::{TracingConfig, TracingFormat};
    pub use strata_hooks::prelude::*;
    pub use strata_resource::prelude::*;
}
