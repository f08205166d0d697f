//! Tracing subscriber setup.
//!
//! The Strata crates only emit events through the [`tracing`] macros; nothing
//! is printed until the host installs a subscriber. [`TracingConfig`] is the
//! standard way to do that:
//!
//! ```
//! use strata_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! TracingConfig::default()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("strata_hooks=debug,strata_resource=info")
//!     .init();
//! ```
//!
//! The configuration also deserializes, so it can sit next to the hook options
//! in a host's config file:
//!
//! ```
//! use strata_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! let config: TracingConfig =
//!     serde_json::from_str(r#"{ "level": "debug", "format": "json" }"#).unwrap();
//! assert_eq!(config.level, Level::DEBUG);
//! assert_eq!(config.format, TracingFormat::Json);
//! ```

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing subscriber configuration.
///
/// Missing fields take their defaults when deserializing: `INFO`, pretty
/// output, no target filter, no span events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Maximum log level, used when no env filter is set or it fails to parse.
    #[serde(with = "level_name")]
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Target-specific filter, e.g. `strata_hooks=debug,strata_resource=warn`.
    pub env_filter: Option<String>,
    /// Whether span enter/exit events are written.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a target filter.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Builds the filter: the configured env filter if it parses, otherwise
    /// the level alone.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|err| {
                tracing::warn!(filter = %filter, error = %err, "invalid env filter, using level");
                EnvFilter::new(self.level.as_str())
            }),
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false` without changing anything if a global subscriber is
    /// already installed, so calling it more than once is harmless.
    pub fn init(&self) -> bool {
        let filter = self.filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let installed = match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            tracing::info!(
                level = %self.level,
                format = ?self.format,
                "tracing initialized"
            );
        }
        installed
    }
}

/// Serializes a [`Level`] by name; parsing is case-insensitive.
mod level_name {
    use core::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub(super) fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(level.as_str())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        Level::from_str(&name).map_err(serde::de::Error::custom)
    }
}
