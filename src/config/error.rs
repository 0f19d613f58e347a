//! Configuration Error Types
//!
//! Error handling for run configuration loading and validation, with enough field
//! context that a bad value is rejected before any tile is touched.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration file not found at the given location
    #[error("Configuration file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    /// Unknown configuration field
    #[error("Unknown configuration field: {field}")]
    UnknownField { field: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// File I/O errors during configuration loading
    #[error("Failed to read configuration file '{file_path}': {error}")]
    FileReadError { file_path: String, error: String },

    #[error("Parse Error for file {file_path}: {reason}")]
    ParseError { file_path: String, reason: String },

    #[error("Environment override error for key {key}: {reason}")]
    EnvironmentOverrideError { key: String, reason: String },
}

impl ConfigurationError {
    /// Create a missing required field error
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create a file read error
    pub fn file_read_error<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::FileReadError {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    pub fn parse_error<P: Into<String>, E: std::fmt::Display>(file_path: P, reason: E) -> Self {
        Self::ParseError {
            file_path: file_path.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a `config` crate error into the closest variant. Serde's unknown-field and
    /// missing-field messages are surfaced as their own variants so callers can match on them.
    pub fn from_source<P: Into<String>>(file_path: P, error: config::ConfigError) -> Self {
        let file_path = file_path.into();
        let message = error.to_string();

        if let Some(field) = extract_backticked(&message, "unknown field `") {
            return Self::UnknownField { field };
        }
        if let Some(field) = extract_backticked(&message, "missing field `") {
            return Self::MissingRequiredField {
                field,
                context: file_path,
            };
        }

        match error {
            config::ConfigError::NotFound(key) => Self::missing_required_field(key, file_path),
            config::ConfigError::Foreign(inner) => Self::file_read_error(file_path, inner),
            other => Self::parse_error(file_path, other),
        }
    }
}

fn extract_backticked(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
