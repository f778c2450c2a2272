//! Configuration for opflow, read from `opflow.toml`.
//!
//! ```toml
//! [classification]
//! rules = [
//!   { kind = "activation", keywords = ["activation"] },
//!   { kind = "unlink_link", keywords = ["unlink", "link"] },
//!   { kind = "qc", keywords = ["qc", "quality"] },
//!   { kind = "count", keywords = ["count"] },
//!   { kind = "production", keywords = ["production", "manufacturing"] },
//! ]
//!
//! [terminal]
//! multiple_terminal_components = "error"
//! report_predecessor_for = ["unlink"]
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Every section is optional; a missing file means defaults throughout.

use crate::flow::{KindTable, TerminalPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "opflow.toml";

/// Environment variable overriding the log filter.
pub const LOG_ENV_VAR: &str = "OPFLOW_LOG";

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "opflow=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Parsed `opflow.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpflowConfig {
    /// Keyword table for operation kinds
    #[serde(default)]
    pub classification: KindTable,
    /// Terminal-operation rules
    #[serde(default)]
    pub terminal: TerminalPolicy,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OpflowConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse opflow.toml")
    }

    /// Load from `path`, or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize opflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Log filter directive (env → file → default).
    pub fn log_filter(&self) -> String {
        std::env::var(LOG_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.logging.level.clone())
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.classification.validate();

        if self.classification.rules.is_empty() {
            warnings.push(
                "classification has no rules; every operation will be classified as Other"
                    .to_string(),
            );
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "logging.level '{}' is not a valid filter directive",
                self.logging.level
            ));
        }

        warnings
    }
}
