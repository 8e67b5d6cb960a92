//! Logging setup.
//!
//! Library code only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_logging`] once at startup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

fn default_level() -> String {
    "info".to_string()
}

/// How log output is formatted and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `txexplain=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
    /// Include the event target (module path).
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Sets the default filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new(default_level()))
    }
}

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is left in place.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.with_target);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
