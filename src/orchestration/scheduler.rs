//! # Batch Scheduler
//!
//! Orchestration core. Owns all mutable state of one run: the state machine, the
//! append-only submission record log and the existing-artifact cache.
//!
//! ## Run lifecycle
//!
//! ```text
//! Idle ──▶ Planning ──▶ Running ──▶ Completed
//!   │          │           │
//!   └──────────┴───────────┴──────▶ Aborted
//! ```
//!
//! - **Planning** acquires a session, loads the catalog, builds the artifact index
//!   and partitions tiles into batches.
//! - **Running** walks batches and tiles in catalog order. Each tile produces exactly
//!   one record; a failed or skipped tile never stops the run.
//! - **Aborted** is reached only through a run-fatal error or cancellation. Tiles not
//!   yet attempted have no record and are picked up by the next run through the
//!   idempotent skip.
//!
//! Submissions are sequential. A pacing delay separates consecutive remote calls and an
//! optional pause separates batches.

use crate::catalog::CatalogReader;
use crate::config::RunConfig;
use crate::error::{GridExportError, Result};
use crate::events::RunEvent;
use crate::logging::{log_error, log_run_operation, log_tile_operation};
use crate::models::{SubmissionOutcome, SubmissionRecord};
use crate::orchestration::artifact_index::ExistingArtifactIndex;
use crate::orchestration::context::PlatformContext;
use crate::orchestration::plan::BatchPlan;
use crate::orchestration::progress::{ProgressReporter, RunSummary};
use crate::orchestration::submitter::JobSubmitter;
use crate::remote::Session;
use crate::state_machine::{RunState, RunStateMachine, RunTransition, TransitionEntry};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

struct PreparedRun {
    session: Session,
    index: ExistingArtifactIndex,
    plan: BatchPlan,
    submitter: JobSubmitter,
}

#[derive(Debug)]
pub struct BatchScheduler {
    run_id: Uuid,
    config: RunConfig,
    context: PlatformContext,
    state_machine: RunStateMachine,
    records: Vec<SubmissionRecord>,
    total_tiles: usize,
    started_at: Option<Instant>,
}

impl BatchScheduler {
    /// Create a scheduler for one run. The configuration is validated here.
    pub fn new(config: RunConfig, context: PlatformContext) -> Result<Self> {
        let config = config.validated()?;
        let run_id = Uuid::new_v4();
        Ok(Self {
            run_id,
            config,
            context,
            state_machine: RunStateMachine::new(run_id),
            records: Vec::new(),
            total_tiles: 0,
            started_at: None,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state_machine.current_state()
    }

    pub fn transitions(&self) -> &[TransitionEntry] {
        self.state_machine.history()
    }

    /// Records in processing order
    pub fn records(&self) -> &[SubmissionRecord] {
        &self.records
    }

    pub fn summary(&self) -> RunSummary {
        let elapsed = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        RunSummary::from_records(&self.records, self.total_tiles, elapsed)
    }

    /// Execute the run to completion.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.run_with_cancellation(CancellationToken::new()).await
    }

    /// Execute the run, stopping between tiles once `cancel` fires.
    ///
    /// Returns the final summary on completion. On abort the run-fatal error is
    /// returned; records and summary stay available on the scheduler.
    pub async fn run_with_cancellation(&mut self, cancel: CancellationToken) -> Result<RunSummary> {
        self.state_machine.transition(RunTransition::Plan)?;
        self.started_at = Some(Instant::now());
        log_run_operation("plan", &self.run_id.to_string(), "started", None);

        let prepared = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(error) => return Err(self.abort(error)),
        };

        self.total_tiles = prepared.plan.tile_count();
        self.state_machine.transition(RunTransition::Start {
            total_tiles: self.total_tiles,
        })?;
        info!(
            run_id = %self.run_id,
            total_tiles = self.total_tiles,
            batches = prepared.plan.batch_count(),
            batch_size = prepared.plan.batch_size(),
            existing_artifacts = prepared.index.len(),
            index_fallback = prepared.index.is_fallback(),
            "Run planned"
        );
        self.publish(RunEvent::RunStarted {
            total_tiles: self.total_tiles,
            total_batches: prepared.plan.batch_count(),
        });

        if let Err(error) = self.execute(prepared, &cancel).await {
            return Err(self.abort(error));
        }

        self.state_machine.transition(RunTransition::Complete)?;
        let summary = self.summary();
        log_run_operation(
            "run",
            &self.run_id.to_string(),
            "completed",
            Some(&summary.to_string()),
        );
        self.publish(RunEvent::RunCompleted { summary });
        Ok(summary)
    }

    async fn prepare(&self) -> Result<PreparedRun> {
        let session = self.acquire_session().await?;

        let tiles = CatalogReader::from_config(&self.config)
            .load(self.context.tile_source.as_ref(), &session)
            .await?;

        let index = ExistingArtifactIndex::build_with_classifier(
            self.context.artifact_storage.as_ref(),
            &session,
            &self.config.output_location,
            self.context.classifier.as_ref(),
        )
        .await?
        .with_refresh_interval(self.config.index_refresh_interval());

        let plan = BatchPlan::partition(tiles, self.config.batch_size_value())?;
        let submitter = JobSubmitter::from_config(&self.config, self.context.export_service.clone())?
            .with_classifier(self.context.classifier.clone());

        Ok(PreparedRun {
            session,
            index,
            plan,
            submitter,
        })
    }

    async fn execute(&mut self, prepared: PreparedRun, cancel: &CancellationToken) -> Result<()> {
        let PreparedRun {
            mut session,
            mut index,
            plan,
            submitter,
        } = prepared;

        let mut progress = ProgressReporter::new(self.total_tiles);
        let mut pace_next = false;

        for (batch_index, batch) in plan.batches().iter().enumerate() {
            let next_tile = batch.first().map(|t| t.identifier().to_string());

            if batch_index > 0 && !self.config.batch_pause().is_zero() {
                info!(
                    run_id = %self.run_id,
                    pause_ms = self.config.batch_pause_ms,
                    "Pausing between batches"
                );
                if !pause(self.config.batch_pause(), cancel).await {
                    return Err(GridExportError::Interrupted { next_tile });
                }
                pace_next = false;
            }

            self.publish(RunEvent::BatchStarted {
                batch_index,
                batch_size: batch.len(),
            });
            let batch_started = Instant::now();
            let batch_offset = self.records.len();

            for tile in batch {
                let tile_id = tile.identifier();
                if cancel.is_cancelled() {
                    return Err(GridExportError::Interrupted {
                        next_tile: Some(tile_id.to_string()),
                    });
                }
                if pace_next && !pause(self.config.pacing_delay(), cancel).await {
                    return Err(GridExportError::Interrupted {
                        next_tile: Some(tile_id.to_string()),
                    });
                }

                if session.is_expired() {
                    info!(run_id = %self.run_id, tile_id, "Session expired, requesting a new one");
                    session = self.acquire_session().await?;
                }
                if index.needs_refresh() {
                    index
                        .refresh(
                            self.context.artifact_storage.as_ref(),
                            &session,
                            self.context.classifier.as_ref(),
                        )
                        .await?;
                }

                let record = submitter.submit(tile, &session, &index).await?;
                pace_next = record.outcome() != SubmissionOutcome::SkippedExists;

                log_tile_operation(
                    "submit",
                    &self.run_id.to_string(),
                    tile_id,
                    record.artifact_name().map(|n| n.as_str()),
                    &record.outcome().to_string(),
                    record.error_detail(),
                );
                let summary = progress.observe(&record);
                self.records.push(record.clone());
                self.publish(RunEvent::TileProcessed { record, summary });
            }

            let batch_summary = RunSummary::from_records(
                &self.records[batch_offset..],
                batch.len(),
                batch_started.elapsed(),
            );
            info!(
                run_id = %self.run_id,
                batch = batch_index + 1,
                of = plan.batch_count(),
                submitted = batch_summary.submitted,
                skipped = batch_summary.skipped,
                failed = batch_summary.failed,
                "Batch complete"
            );
            self.publish(RunEvent::BatchCompleted {
                batch_index,
                batch_summary,
            });
        }

        Ok(())
    }

    async fn acquire_session(&self) -> Result<Session> {
        let session = self
            .context
            .session_provider
            .session()
            .await
            .map_err(|e| GridExportError::SessionError(e.to_string()))?;
        if let Some(expired_at) = session.expires_at.filter(|_| session.is_expired()) {
            return Err(GridExportError::SessionError(format!(
                "provider issued a session for {} that expired at {expired_at}",
                session.principal
            )));
        }
        Ok(session)
    }

    fn abort(&mut self, error: GridExportError) -> GridExportError {
        let state_before = self.state_machine.current_state();
        if let Err(transition_error) = self
            .state_machine
            .transition(RunTransition::Abort(error.to_string()))
        {
            warn!(run_id = %self.run_id, error = %transition_error, "Abort transition rejected");
        }

        let summary = self.summary();
        log_error(
            "batch_scheduler",
            "run",
            &error.to_string(),
            Some(&format!("run_id={} state_before={state_before} {summary}", self.run_id)),
        );
        self.publish(RunEvent::RunAborted {
            reason: error.to_string(),
            state_before,
            summary,
        });
        error
    }

    fn publish(&self, event: RunEvent) {
        self.context.event_publisher.publish(self.run_id, event);
    }
}

/// Sleep for `duration` unless cancelled first. Returns false on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use crate::test_helpers::{test_config, MockPlatform};

    fn scheduler(platform: &MockPlatform, batch_size: usize) -> BatchScheduler {
        BatchScheduler::new(
            test_config(batch_size),
            PlatformContext::from_platform(platform.clone()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn completes_and_records_every_tile() {
        let platform = MockPlatform::new().with_square_tiles(&["A", "B", "C"]);
        let mut scheduler = scheduler(&platform, 2);

        let summary = scheduler.run().await.unwrap();

        assert_eq!(scheduler.state(), RunState::Completed);
        assert_eq!(summary.submitted, 3);
        assert_eq!(scheduler.records().len(), 3);
        assert_eq!(platform.listing_calls(), 1);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_during_planning() {
        let platform =
            MockPlatform::new().with_catalog_error(RemoteError::not_found("no such collection"));
        let mut scheduler = scheduler(&platform, 2);

        let err = scheduler.run().await.unwrap_err();

        assert!(matches!(err, GridExportError::CatalogError(_)));
        assert_eq!(scheduler.state(), RunState::Aborted);
        assert_eq!(scheduler.transitions()[1].from, RunState::Planning);
    }

    #[tokio::test]
    async fn a_scheduler_runs_once() {
        let platform = MockPlatform::new().with_square_tiles(&["A"]);
        let mut scheduler = scheduler(&platform, 1);
        scheduler.run().await.unwrap();
        assert!(matches!(
            scheduler.run().await,
            Err(GridExportError::StateTransitionError(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_separates_remote_calls() {
        let platform = MockPlatform::new().with_square_tiles(&["A", "B", "C"]);
        let config = test_config(3).with_pacing(Duration::from_secs(2), Duration::ZERO);
        let mut scheduler =
            BatchScheduler::new(config, PlatformContext::from_platform(platform.clone())).unwrap();

        let started = Instant::now();
        scheduler.run().await.unwrap();

        // Two gaps between three submissions
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_before_start_leaves_all_tiles_unattempted() {
        let platform = MockPlatform::new().with_square_tiles(&["A", "B"]);
        let mut scheduler = scheduler(&platform, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scheduler.run_with_cancellation(cancel).await.unwrap_err();

        assert_eq!(
            err,
            GridExportError::Interrupted {
                next_tile: Some("A".to_string())
            }
        );
        assert!(scheduler.records().is_empty());
        assert!(platform.submissions().is_empty());
    }
}
