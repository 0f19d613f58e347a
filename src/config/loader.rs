//! Configuration Loader
//!
//! Loads a [`RunConfig`] from a TOML/YAML/JSON file, layers `GRIDEXPORT__*`
//! environment overrides on top, validates the result and logs a sanitized copy.

use super::error::{ConfigResult, ConfigurationError};
use super::RunConfig;
use crate::constants::system;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loaded and validated run configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: RunConfig,
    environment: String,
    source_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from a file, applying environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<ConfigManager> {
        let environment = Self::detect_environment();
        Self::load_with_env_prefix(path, &environment, system::CONFIG_ENV_PREFIX)
    }

    /// Load configuration with an explicit environment name and override prefix.
    /// Tests use a unique prefix so they never race on shared environment variables.
    pub fn load_with_env_prefix(
        path: impl AsRef<Path>,
        environment: &str,
        env_prefix: &str,
    ) -> ConfigResult<ConfigManager> {
        let path = path.as_ref();
        let display_path = path.display().to_string();

        Self::check_config_file(path)?;

        debug!(
            "Loading run configuration for environment '{}' from {}",
            environment, display_path
        );

        let source = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator(system::CONFIG_ENV_SEPARATOR)
                    .separator(system::CONFIG_ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::from_source(&display_path, e))?;

        let config: RunConfig = source
            .try_deserialize()
            .map_err(|e| ConfigurationError::from_source(&display_path, e))?;

        config.validate()?;

        debug!(
            "Run configuration loaded: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = %environment,
            catalog_id = %config.catalog_id,
            output_location = %config.output_location,
            batch_size = config.batch_size_value(),
            "Run configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            source_path: path.to_path_buf(),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn into_config(self) -> RunConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Sanitized JSON view of the configuration for debugging
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn check_config_file(path: &Path) -> ConfigResult<()> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigurationError::ConfigFileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ConfigurationError::file_read_error(
                    path.display().to_string(),
                    e,
                ))
            }
        };

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        if metadata.len() > system::MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({} bytes > {} bytes limit)",
                    metadata.len(),
                    system::MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        Ok(())
    }

    /// Mask fields that look like credentials; the algorithm map is caller-supplied and
    /// may carry keys.
    fn sanitize_config_for_logging(config: &RunConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "key", "token", "credential"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        Self::environment_from(|name| env::var(name).ok())
    }

    /// First non-blank value among [`system::ENVIRONMENT_VARIABLES`], trimmed and
    /// lowercased, or the default environment.
    pub fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
        system::ENVIRONMENT_VARIABLES
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_lowercase())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| system::DEFAULT_ENVIRONMENT.to_string())
    }
}
