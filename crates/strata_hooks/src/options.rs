//! Executor configuration.

use serde::{Deserialize, Serialize};

/// Global switches for hook execution.
///
/// Deserializes from a host configuration section; missing fields take their
/// defaults.
///
/// ```
/// use strata_hooks::HooksOptions;
///
/// let options: HooksOptions = serde_json::from_str(r#"{ "load_database_values": true }"#).unwrap();
/// assert!(options.load_database_values);
/// assert!(options.validate_responses);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksOptions {
    /// Load persisted values for hooks that have no per-hook override.
    pub load_database_values: bool,
    /// Reject hook responses containing resources of another type.
    pub validate_responses: bool,
}

impl Default for HooksOptions {
    fn default() -> Self {
        Self {
            load_database_values: false,
            validate_responses: true,
        }
    }
}

impl HooksOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global database-value default.
    #[must_use]
    pub fn with_load_database_values(mut self, enabled: bool) -> Self {
        self.load_database_values = enabled;
        self
    }

    /// Sets whether hook responses are type-checked.
    #[must_use]
    pub fn with_validate_responses(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }
}
