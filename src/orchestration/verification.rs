//! Optional post-run check that submitted artifacts have appeared in storage.
//!
//! Remote jobs finish out of band, so this is a separate pass run whenever the caller
//! likes, never a wait inside the scheduler. Unlike the artifact index, a listing
//! failure here is an error: a verification that silently saw nothing would report
//! every artifact as pending.

use crate::error::{GridExportError, Result};
use crate::models::{SubmissionOutcome, SubmissionRecord};
use crate::naming::ArtifactName;
use crate::remote::{ArtifactStorage, Session};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Artifacts found in storage
    pub present: Vec<ArtifactName>,
    /// Submitted or skipped artifacts not (yet) in storage
    pub pending: Vec<ArtifactName>,
    /// Failed records, which have nothing to verify
    pub failed_tiles: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl VerificationReport {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct VerificationPass {
    storage: Arc<dyn ArtifactStorage>,
    location: String,
}

impl VerificationPass {
    pub fn new(storage: Arc<dyn ArtifactStorage>, location: impl Into<String>) -> Self {
        Self {
            storage,
            location: location.into(),
        }
    }

    pub async fn verify(
        &self,
        session: &Session,
        records: &[SubmissionRecord],
    ) -> Result<VerificationReport> {
        let listed: HashSet<ArtifactName> = self
            .storage
            .list_artifacts(session, &self.location)
            .await
            .map_err(|e| GridExportError::ListingError {
                location: self.location.clone(),
                reason: e.to_string(),
            })?
            .iter()
            .map(|entry| ArtifactName::from_listing(entry))
            .collect();

        let mut report = VerificationReport {
            present: Vec::new(),
            pending: Vec::new(),
            failed_tiles: Vec::new(),
            checked_at: Utc::now(),
        };

        for record in records {
            match (record.outcome(), record.artifact_name()) {
                (SubmissionOutcome::Failed, _) | (_, None) => {
                    report.failed_tiles.push(record.tile_identifier().to_string())
                }
                (_, Some(name)) if listed.contains(name) => report.present.push(name.clone()),
                (_, Some(name)) => report.pending.push(name.clone()),
            }
        }

        info!(
            location = %self.location,
            present = report.present.len(),
            pending = report.pending.len(),
            failed = report.failed_tiles.len(),
            "Verification pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use crate::test_helpers::{MockPlatform, TEST_OUTPUT_LOCATION};

    fn name(tile: &str) -> ArtifactName {
        ArtifactName::from_listing(&format!("NDVI_{tile}_2024-01-01_2024-07-01"))
    }

    #[tokio::test]
    async fn splits_present_and_pending() {
        let platform = MockPlatform::new()
            .with_existing_artifacts([format!("{TEST_OUTPUT_LOCATION}/{}", name("A"))]);
        let pass = VerificationPass::new(Arc::new(platform), TEST_OUTPUT_LOCATION);
        let records = vec![
            SubmissionRecord::submitted("A", name("A"), "j1"),
            SubmissionRecord::submitted("B", name("B"), "j2"),
            SubmissionRecord::failed("C", Some(name("C")), "quota"),
        ];

        let report = pass.verify(&Session::new("t"), &records).await.unwrap();

        assert_eq!(report.present, vec![name("A")]);
        assert_eq!(report.pending, vec![name("B")]);
        assert_eq!(report.failed_tiles, vec!["C".to_string()]);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn listing_failure_is_an_error() {
        let platform = MockPlatform::new().with_listing_error(RemoteError::unavailable("503"));
        let pass = VerificationPass::new(Arc::new(platform), TEST_OUTPUT_LOCATION);
        let err = pass.verify(&Session::new("t"), &[]).await.unwrap_err();
        assert!(matches!(err, GridExportError::ListingError { .. }));
    }
}
