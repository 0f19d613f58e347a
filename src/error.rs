//! Error types for the grid export system.

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridExportError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Catalog unreadable: {0}")]
    CatalogError(String),
    #[error("Session unavailable: {0}")]
    SessionError(String),
    #[error("Artifact listing failed for {location}: {reason}")]
    ListingError { location: String, reason: String },
    #[error("Submission failed for tile {tile_identifier}: {reason}")]
    SubmissionError {
        tile_identifier: String,
        reason: String,
    },
    #[error("Geometry error: {0}")]
    GeometryError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Run interrupted before tile {next_tile:?}")]
    Interrupted { next_tile: Option<String> },
}

impl GridExportError {
    /// Whether this error invalidates the whole run rather than a single tile.
    pub fn is_run_fatal(&self) -> bool {
        match self {
            Self::SessionError(_)
            | Self::CatalogError(_)
            | Self::ListingError { .. }
            | Self::ConfigurationError(_)
            | Self::StateTransitionError(_)
            | Self::Interrupted { .. } => true,
            // A submission error only reaches the scheduler as an error when the
            // classifier flagged it fatal (e.g. auth expiry mid-run).
            Self::SubmissionError { .. } => true,
            Self::ValidationError(_) | Self::GeometryError(_) => false,
        }
    }
}

impl From<ConfigurationError> for GridExportError {
    fn from(error: ConfigurationError) -> Self {
        GridExportError::ConfigurationError(error.to_string())
    }
}

impl From<StateMachineError> for GridExportError {
    fn from(error: StateMachineError) -> Self {
        GridExportError::StateTransitionError(error.to_string())
    }
}

impl From<serde_json::Error> for GridExportError {
    fn from(error: serde_json::Error) -> Self {
        GridExportError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, GridExportError>;
