//! # Remote Error Classification
//!
//! Maps failures reported by remote collaborators to an [`ErrorCategory`] and decides
//! whether the failure is contained to one tile or invalidates the whole run.
//!
//! ## Fatality rules
//!
//! | Operation     | Unauthenticated | Anything else         |
//! |---------------|-----------------|-----------------------|
//! | session       | run-fatal       | run-fatal             |
//! | catalog fetch | run-fatal       | run-fatal             |
//! | listing       | run-fatal       | fallback to empty set |
//! | submission    | run-fatal       | tile failure          |
//!
//! Retry eligibility is reported for logging and audit; nothing is retried within a
//! run. Re-running the orchestrator is the retry mechanism: already exported tiles are
//! skipped through the artifact index.

use crate::remote::{RemoteError, RemoteErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Suggested wait after a transient failure
pub const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Suggested wait after a quota failure
pub const RATE_LIMIT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Remote operation during which an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    Session,
    CatalogFetch,
    Listing,
    Submission,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::CatalogFetch => write!(f, "catalog_fetch"),
            Self::Listing => write!(f, "listing"),
            Self::Submission => write!(f, "submission"),
        }
    }
}

/// Context information for error classification
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: RemoteOperation,
    /// Tile being processed, if any
    pub tile_identifier: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: RemoteOperation) -> Self {
        Self {
            operation,
            tile_identifier: None,
        }
    }

    pub fn for_tile(operation: RemoteOperation, tile_identifier: impl Into<String>) -> Self {
        Self {
            operation,
            tile_identifier: Some(tile_identifier.into()),
        }
    }
}

/// Primary error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network or service outage; may succeed later
    Transient,
    /// Quota exhausted; retry after backoff
    RateLimit,
    /// Will never succeed as submitted
    Permanent,
    /// Session invalid or expired
    Authentication,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transient => write!(f, "Transient"),
            ErrorCategory::RateLimit => write!(f, "Rate Limit"),
            ErrorCategory::Permanent => write!(f, "Permanent"),
            ErrorCategory::Authentication => write!(f, "Authentication"),
        }
    }
}

/// Result of error classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub error_category: ErrorCategory,
    /// Whether a later attempt could succeed
    pub is_retryable: bool,
    /// Suggested wait before a later attempt
    pub retry_delay: Option<Duration>,
    /// Whether the whole run must stop
    pub is_run_fatal: bool,
    pub error_code: String,
    pub error_message: String,
    pub remediation_suggestions: Vec<String>,
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    fn classify_error(&self, error: &RemoteError, context: &ErrorContext) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Standard classifier implementing the fatality table above
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardErrorClassifier;

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    fn category_for(kind: RemoteErrorKind) -> ErrorCategory {
        match kind {
            RemoteErrorKind::Unauthenticated => ErrorCategory::Authentication,
            RemoteErrorKind::QuotaExceeded => ErrorCategory::RateLimit,
            RemoteErrorKind::Unavailable => ErrorCategory::Transient,
            RemoteErrorKind::InvalidRequest
            | RemoteErrorKind::NotFound
            | RemoteErrorKind::Rejected => ErrorCategory::Permanent,
        }
    }

    fn is_fatal(category: ErrorCategory, operation: RemoteOperation) -> bool {
        match (category, operation) {
            (ErrorCategory::Authentication, _) => true,
            (_, RemoteOperation::Session | RemoteOperation::CatalogFetch) => true,
            (_, RemoteOperation::Listing | RemoteOperation::Submission) => false,
        }
    }

    fn suggestions(category: ErrorCategory) -> Vec<String> {
        let suggestions: &[&str] = match category {
            ErrorCategory::Authentication => &[
                "Re-authenticate and re-run; existing artifacts will be skipped",
            ],
            ErrorCategory::RateLimit => &[
                "Increase pacing_delay_ms or batch_pause_ms",
                "Check the concurrent task quota on the remote platform",
            ],
            ErrorCategory::Transient => &["Re-run later; the tile was left unexported"],
            ErrorCategory::Permanent => &[
                "Inspect the tile geometry and request parameters",
                "Verify the output location and collection exist",
            ],
        };
        suggestions.iter().map(|s| s.to_string()).collect()
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &RemoteError, context: &ErrorContext) -> ErrorClassification {
        let error_category = Self::category_for(error.kind);
        let (is_retryable, retry_delay) = match error_category {
            ErrorCategory::Transient => (true, Some(TRANSIENT_RETRY_DELAY)),
            ErrorCategory::RateLimit => (true, Some(RATE_LIMIT_RETRY_DELAY)),
            ErrorCategory::Authentication => (true, None),
            ErrorCategory::Permanent => (false, None),
        };

        let error_message = match &context.tile_identifier {
            Some(tile) => format!("{} failed for tile '{tile}': {error}", context.operation),
            None => format!("{} failed: {error}", context.operation),
        };

        ErrorClassification {
            error_category,
            is_retryable,
            retry_delay,
            is_run_fatal: Self::is_fatal(error_category, context.operation),
            error_code: format!(
                "{}_{}",
                context.operation.to_string().to_uppercase(),
                error.kind.to_string().to_uppercase()
            ),
            error_message,
            remediation_suggestions: Self::suggestions(error_category),
        }
    }

    fn classifier_name(&self) -> &'static str {
        "standard"
    }
}
