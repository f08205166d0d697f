//! # Strata Core
//!
//! Infrastructure shared by the Strata crates that is not part of the resource
//! model or the hook engine itself.
//!
//! - [`TracingConfig`] installs the `tracing` subscriber that the other crates
//!   log through.

pub mod logging;

pub use logging::{TracingConfig, TracingFormat};
