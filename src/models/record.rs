use crate::naming::ArtifactName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-tile outcome of one run attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Export job accepted by the remote service
    Submitted,
    /// Artifact already present in storage; no remote call made
    SkippedExists,
    /// Submission rejected or could not be built
    Failed,
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::SkippedExists => write!(f, "skipped_exists"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Immutable audit entry for one tile. `error_detail` is present iff the outcome is
/// `Failed`, and `remote_job_id` only for `Submitted`; the constructors enforce both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    tile_identifier: String,
    artifact_name: Option<ArtifactName>,
    outcome: SubmissionOutcome,
    error_detail: Option<String>,
    remote_job_id: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn submitted(
        tile_identifier: impl Into<String>,
        artifact_name: ArtifactName,
        remote_job_id: impl Into<String>,
    ) -> Self {
        Self {
            tile_identifier: tile_identifier.into(),
            artifact_name: Some(artifact_name),
            outcome: SubmissionOutcome::Submitted,
            error_detail: None,
            remote_job_id: Some(remote_job_id.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn skipped_exists(tile_identifier: impl Into<String>, artifact_name: ArtifactName) -> Self {
        Self {
            tile_identifier: tile_identifier.into(),
            artifact_name: Some(artifact_name),
            outcome: SubmissionOutcome::SkippedExists,
            error_detail: None,
            remote_job_id: None,
            recorded_at: Utc::now(),
        }
    }

    /// `artifact_name` is `None` when the name itself could not be derived.
    pub fn failed(
        tile_identifier: impl Into<String>,
        artifact_name: Option<ArtifactName>,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            tile_identifier: tile_identifier.into(),
            artifact_name,
            outcome: SubmissionOutcome::Failed,
            error_detail: Some(error_detail.into()),
            remote_job_id: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn tile_identifier(&self) -> &str {
        &self.tile_identifier
    }

    pub fn artifact_name(&self) -> Option<&ArtifactName> {
        self.artifact_name.as_ref()
    }

    pub fn outcome(&self) -> SubmissionOutcome {
        self.outcome
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn remote_job_id(&self) -> Option<&str> {
        self.remote_job_id.as_deref()
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == SubmissionOutcome::Failed
    }
}
