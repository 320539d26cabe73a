//! Logger initialisation for the binary and for embedding applications.

use crate::config::LoggingConfig;
use crate::error::{DataPointError, DataPointResult};
use env_logger::Builder;

/// Builds an `env_logger` from the config. `RUST_LOG`, when set, replaces
/// the configured level.
pub fn builder(config: &LoggingConfig) -> Builder {
    let mut builder = Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(filters) if !filters.trim().is_empty() => builder.parse_filters(&filters),
        _ => builder.parse_filters(&config.level),
    };
    builder.parse_write_style(&config.write_style);
    builder
}

/// Installs the global logger. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> DataPointResult<()> {
    builder(config)
        .try_init()
        .map_err(|e| DataPointError::configuration(format!("Failed to initialise logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        // Another test may have installed a logger already; the second
        // call must fail either way.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
