//! Engine configuration.
//!
//! Configuration is loaded from a TOML or JSON file, then overridden from
//! `DATAPOINT_*` environment variables. Entities declared in the file are
//! a convenience over the programmatic registration surface; hooks can
//! only be attached in code.

use crate::entity::EntityKey;
use crate::error::{DataPointError, DataPointResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DATAPOINT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Network settings for source entities
    pub http: HttpConfig,
    /// Resolution limits
    pub resolution: ResolutionConfig,
    /// Logger settings used by the binary
    pub logging: LoggingConfig,
    /// Global static values, visible to templates as `values`
    pub values: BTreeMap<String, JsonValue>,
    /// Entity options keyed by `kind:id`
    pub entities: BTreeMap<String, JsonValue>,
}

/// Settings for [`HttpFetcher`](crate::fetch::HttpFetcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Headers sent with every request unless the request overrides them
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("datapoint/{}", env!("CARGO_PKG_VERSION")),
            default_headers: BTreeMap::new(),
        }
    }
}

/// Limits applied while resolving pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Maximum number of nested re-entrant resolutions (hash/model
    /// expressions referencing further entities)
    pub max_nesting_depth: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 32,
        }
    }
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `datapoint=debug`
    pub level: String,
    /// `auto`, `always` or `never`
    pub write_style: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            write_style: "auto".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a `.toml` or `.json` file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> DataPointResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataPointError::configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: EngineConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                DataPointError::configuration(format!("Failed to parse TOML config: {}", e))
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                DataPointError::configuration(format!("Failed to parse JSON config: {}", e))
            })?,
            _ => {
                return Err(DataPointError::configuration(
                    "Unsupported config file format (only JSON and TOML supported)",
                ))
            }
        };

        info!(
            "Loaded configuration from {} ({} entities, {} values)",
            path.display(),
            config.entities.len(),
            config.values.len()
        );
        Ok(config)
    }

    /// Applies `DATAPOINT_*` environment variables on top of this config.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = |suffix: &str| format!("{}_{}", ENV_PREFIX, suffix);

        if let Some(val) = var(&name("HTTP_TIMEOUT_SECS")) {
            match val.parse::<u64>() {
                Ok(seconds) => self.http.timeout_secs = seconds,
                Err(_) => warn!("Ignoring invalid {}: '{}'", name("HTTP_TIMEOUT_SECS"), val),
            }
        }

        if let Some(val) = var(&name("HTTP_USER_AGENT")) {
            self.http.user_agent = val;
        }

        if let Some(val) = var(&name("MAX_NESTING_DEPTH")) {
            match val.parse::<usize>() {
                Ok(depth) => self.resolution.max_nesting_depth = depth,
                Err(_) => warn!("Ignoring invalid {}: '{}'", name("MAX_NESTING_DEPTH"), val),
            }
        }

        if let Some(val) = var(&name("LOG_LEVEL")) {
            self.logging.level = val;
        }

        debug!("Configuration after environment overrides: {:?}", self.resolution);
    }

    /// Validates limits and entity keys.
    pub fn validate(&self) -> DataPointResult<()> {
        if self.http.timeout_secs == 0 {
            return Err(DataPointError::configuration_with_key(
                "HTTP timeout must be greater than 0",
                "http.timeout_secs",
            ));
        }

        if self.resolution.max_nesting_depth == 0 {
            return Err(DataPointError::configuration_with_key(
                "Max nesting depth must be greater than 0",
                "resolution.max_nesting_depth",
            ));
        }

        for key in self.entities.keys() {
            EntityKey::parse(key)?;
        }

        Ok(())
    }
}
