//! # Job Submitter
//!
//! Builds and submits one export request per tile, after consulting the
//! existing-artifact index.
//!
//! Per-tile problems (unnameable tile, degenerate geometry, rejected or timed-out
//! submission) come back as a `Failed` record. Only run-fatal conditions, such as an
//! invalid session, come back as `Err`; the tile then has no record and stays
//! unattempted.

use crate::config::{ArtifactVariant, ExportSettings, RunConfig};
use crate::error::{GridExportError, Result};
use crate::geometry::OverlapBuffer;
use crate::models::{ProcessingWindow, SubmissionRecord, Tile};
use crate::naming::ArtifactNamer;
use crate::orchestration::artifact_index::ExistingArtifactIndex;
use crate::orchestration::error_classifier::{
    ErrorClassifier, ErrorContext, RemoteOperation, StandardErrorClassifier,
};
use crate::remote::{ExportRequest, ExportService, RemoteError, Session};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct JobSubmitter {
    export_service: Arc<dyn ExportService>,
    classifier: Arc<dyn ErrorClassifier>,
    namer: ArtifactNamer,
    buffer: OverlapBuffer,
    window: ProcessingWindow,
    variant: ArtifactVariant,
    output_location: String,
    cloud_threshold: f64,
    export: ExportSettings,
    algorithm: serde_json::Map<String, serde_json::Value>,
    submission_timeout: Duration,
}

impl std::fmt::Debug for JobSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubmitter")
            .field("namer", &self.namer)
            .field("buffer", &self.buffer)
            .field("window", &self.window)
            .field("variant", &self.variant)
            .field("output_location", &self.output_location)
            .finish_non_exhaustive()
    }
}

impl JobSubmitter {
    pub fn from_config(config: &RunConfig, export_service: Arc<dyn ExportService>) -> Result<Self> {
        Ok(Self {
            export_service,
            classifier: Arc::new(StandardErrorClassifier::new()),
            namer: ArtifactNamer::from_config(config)?,
            buffer: OverlapBuffer::new(config.overlap_buffer_meters)?,
            window: config.window,
            variant: config.variant,
            output_location: config.output_location.clone(),
            cloud_threshold: config.cloud_threshold,
            export: config.export.clone(),
            algorithm: config.algorithm.clone(),
            submission_timeout: config.submission_timeout(),
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn namer(&self) -> &ArtifactNamer {
        &self.namer
    }

    /// Submit `tile` unless its artifact already exists.
    ///
    /// Makes at most one remote call.
    pub async fn submit(
        &self,
        tile: &Tile,
        session: &Session,
        index: &ExistingArtifactIndex,
    ) -> Result<SubmissionRecord> {
        let tile_id = tile.identifier();

        let artifact_name = match self.namer.name(tile_id, &self.window, self.variant) {
            Ok(name) => name,
            Err(e) => return Ok(SubmissionRecord::failed(tile_id, None, e.to_string())),
        };

        if index.exists(&artifact_name) {
            debug!(tile_id, artifact = %artifact_name, "Artifact exists, skipping");
            return Ok(SubmissionRecord::skipped_exists(tile_id, artifact_name));
        }

        let region = match self.buffer.apply(tile.geometry()) {
            Ok(region) => region,
            Err(e) => {
                return Ok(SubmissionRecord::failed(
                    tile_id,
                    Some(artifact_name),
                    e.to_string(),
                ))
            }
        };

        let request = ExportRequest {
            tile_identifier: tile_id.to_string(),
            target_path: artifact_name.full_path(&self.output_location),
            description: artifact_name.to_string(),
            artifact_name: artifact_name.clone(),
            region,
            window: self.window,
            cloud_threshold: self.cloud_threshold,
            scale_meters: self.export.scale_meters,
            max_pixels: self.export.max_pixels,
            algorithm: self.algorithm.clone(),
        };

        let outcome = tokio::time::timeout(
            self.submission_timeout,
            self.export_service.submit_export(session, request),
        )
        .await
        .unwrap_or_else(|_| {
            Err(RemoteError::unavailable(format!(
                "no acknowledgment within {}s",
                self.submission_timeout.as_secs()
            )))
        });

        match outcome {
            Ok(ack) => {
                debug!(tile_id, artifact = %artifact_name, job_id = %ack.job_id, "Export accepted");
                Ok(SubmissionRecord::submitted(tile_id, artifact_name, ack.job_id))
            }
            Err(error) => {
                let classification = self.classifier.classify_error(
                    &error,
                    &ErrorContext::for_tile(RemoteOperation::Submission, tile_id),
                );
                if classification.is_run_fatal {
                    error!(
                        tile_id,
                        error_code = %classification.error_code,
                        remediation = ?classification.remediation_suggestions,
                        "{}",
                        classification.error_message
                    );
                    return Err(GridExportError::SubmissionError {
                        tile_identifier: tile_id.to_string(),
                        reason: error.to_string(),
                    });
                }
                warn!(
                    tile_id,
                    artifact = %artifact_name,
                    category = %classification.error_category,
                    error_code = %classification.error_code,
                    retryable = classification.is_retryable,
                    retry_after_secs = classification.retry_delay.map(|d| d.as_secs()),
                    remediation = ?classification.remediation_suggestions,
                    error = %error,
                    "Export submission failed"
                );
                Ok(SubmissionRecord::failed(
                    tile_id,
                    Some(artifact_name),
                    error.to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogReader;
    use crate::models::SubmissionOutcome;
    use crate::naming::ArtifactName;
    use crate::test_helpers::{square_feature, test_config, MockPlatform, TEST_OUTPUT_LOCATION};
    use geo::{Contains, Point};

    fn tile(identifier: &str) -> Tile {
        CatalogReader::from_config(&test_config(2))
            .tiles_from_features(vec![square_feature(identifier, 0.0, 1000.0)])
            .unwrap()
            .remove(0)
    }

    fn submitter(platform: &MockPlatform) -> JobSubmitter {
        JobSubmitter::from_config(&test_config(2), Arc::new(platform.clone())).unwrap()
    }

    #[tokio::test]
    async fn submits_buffered_region_to_target_path() {
        let platform = MockPlatform::new();
        let tile = &tile("A");
        let index = ExistingArtifactIndex::from_names(TEST_OUTPUT_LOCATION, []);

        let record = submitter(&platform)
            .submit(tile, &Session::new("t"), &index)
            .await
            .unwrap();

        assert_eq!(record.outcome(), SubmissionOutcome::Submitted);
        assert_eq!(record.remote_job_id(), Some("mock-job-1"));

        let requests = platform.submissions();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.target_path,
            format!("{TEST_OUTPUT_LOCATION}/NDVI_A_2024-01-01_2024-07-01_overlap")
        );
        assert_eq!(request.description, request.artifact_name.as_str());
        assert!(request.region.shape.contains(&Point::new(500.0, -15.0)));
    }

    #[tokio::test]
    async fn existing_artifact_is_skipped_without_remote_call() {
        let platform = MockPlatform::new();
        let tile = &tile("A");
        let index = ExistingArtifactIndex::from_names(
            TEST_OUTPUT_LOCATION,
            [ArtifactName::from_listing("NDVI_A_2024-01-01_2024-07-01_overlap")],
        );

        let record = submitter(&platform)
            .submit(tile, &Session::new("t"), &index)
            .await
            .unwrap();

        assert_eq!(record.outcome(), SubmissionOutcome::SkippedExists);
        assert!(platform.submissions().is_empty());
    }

    #[tokio::test]
    async fn quota_rejection_becomes_failed_record() {
        let platform = MockPlatform::new()
            .with_submission_failure("A", RemoteError::quota_exceeded("too many tasks"));
        let tile = &tile("A");
        let index = ExistingArtifactIndex::from_names(TEST_OUTPUT_LOCATION, []);

        let record = submitter(&platform)
            .submit(tile, &Session::new("t"), &index)
            .await
            .unwrap();

        assert!(record.is_failed());
        assert!(record.error_detail().unwrap().contains("too many tasks"));
        assert!(record.artifact_name().is_some());
    }

    #[tokio::test]
    async fn auth_failure_is_run_fatal() {
        let platform = MockPlatform::new()
            .with_submission_failure("A", RemoteError::unauthenticated("token expired"));
        let tile = &tile("A");
        let index = ExistingArtifactIndex::from_names(TEST_OUTPUT_LOCATION, []);

        let err = submitter(&platform)
            .submit(tile, &Session::new("t"), &index)
            .await
            .unwrap_err();

        assert!(matches!(err, GridExportError::SubmissionError { ref tile_identifier, .. } if tile_identifier == "A"));
        assert!(err.is_run_fatal());
    }
}
