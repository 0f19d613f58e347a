//! End-to-end runs of the batch scheduler against the in-memory platform.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{artifact_for, drain, observed_scheduler, scheduler_for};
use gridexport_core::config::ArtifactVariant;
use gridexport_core::events::RunEvent;
use gridexport_core::models::SubmissionOutcome;
use gridexport_core::orchestration::VerificationPass;
use gridexport_core::remote::{RemoteError, Session};
use gridexport_core::state_machine::RunState;
use gridexport_core::test_helpers::{test_config, MockPlatform, TEST_OUTPUT_LOCATION};
use gridexport_core::GridExportError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn outcomes(scheduler: &gridexport_core::BatchScheduler) -> Vec<(String, SubmissionOutcome)> {
    scheduler
        .records()
        .iter()
        .map(|r| (r.tile_identifier().to_string(), r.outcome()))
        .collect()
}

#[tokio::test]
async fn existing_artifact_is_skipped_and_batches_follow_catalog_order() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C"])
        .with_existing_artifacts([format!("{TEST_OUTPUT_LOCATION}/{}", artifact_for("B"))]);
    let (mut scheduler, mut events) = observed_scheduler(&platform, test_config(2));

    let summary = scheduler.run().await.unwrap();

    assert_eq!(scheduler.state(), RunState::Completed);
    assert_eq!(
        outcomes(&scheduler),
        vec![
            ("A".to_string(), SubmissionOutcome::Submitted),
            ("B".to_string(), SubmissionOutcome::SkippedExists),
            ("C".to_string(), SubmissionOutcome::Submitted),
        ]
    );
    assert_eq!((summary.submitted, summary.skipped, summary.failed), (2, 1, 0));
    assert_eq!(platform.submitted_tiles(), vec!["A", "C"]);

    let batch_sizes: Vec<usize> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e.event {
            RunEvent::BatchStarted { batch_size, .. } => Some(batch_size),
            _ => None,
        })
        .collect();
    assert_eq!(batch_sizes, vec![2, 1]);
}

#[tokio::test]
async fn rerun_after_completion_skips_every_tile() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C", "D"])
        .completing_exports();

    let mut first = scheduler_for(&platform, test_config(3));
    first.run().await.unwrap();
    assert_eq!(platform.submissions().len(), 4);

    let mut second = scheduler_for(&platform, test_config(3));
    let summary = second.run().await.unwrap();

    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.submitted, 0);
    assert_eq!(platform.submissions().len(), 4, "no new remote calls");
    assert_ne!(first.run_id(), second.run_id());
}

#[tokio::test]
async fn invalid_session_aborts_before_any_tile() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B"])
        .with_session_error(RemoteError::unauthenticated("no credentials"));
    let (mut scheduler, mut events) = observed_scheduler(&platform, test_config(2));

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(err, GridExportError::SessionError(_)));
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert!(scheduler.records().is_empty());
    assert_eq!(platform.catalog_calls(), 0);
    assert!(platform.submissions().is_empty());

    let last = drain(&mut events).pop().unwrap();
    assert!(matches!(
        last.event,
        RunEvent::RunAborted { state_before: RunState::Planning, .. }
    ));
}

#[tokio::test]
async fn single_failure_does_not_stop_later_tiles() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "X", "Y", "Z", "W"])
        .with_submission_failure("X", RemoteError::quota_exceeded("concurrent task limit"));
    let mut scheduler = scheduler_for(&platform, test_config(2));

    let summary = scheduler.run().await.unwrap();

    assert_eq!(scheduler.state(), RunState::Completed);
    assert_eq!(scheduler.records().len(), 5);
    let x = &scheduler.records()[1];
    assert_eq!(x.tile_identifier(), "X");
    assert_eq!(x.outcome(), SubmissionOutcome::Failed);
    assert!(x.error_detail().unwrap().contains("concurrent task limit"));
    assert_eq!(platform.submitted_tiles(), vec!["A", "X", "Y", "Z", "W"]);
    assert_eq!((summary.submitted, summary.failed), (4, 1));
}

#[tokio::test]
async fn auth_loss_mid_run_aborts_and_leaves_rest_unattempted() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C"])
        .with_submission_failure("B", RemoteError::unauthenticated("token revoked"));
    let mut scheduler = scheduler_for(&platform, test_config(3));

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(
        err,
        GridExportError::SubmissionError { ref tile_identifier, .. } if tile_identifier == "B"
    ));
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert_eq!(
        outcomes(&scheduler),
        vec![("A".to_string(), SubmissionOutcome::Submitted)]
    );
    assert_eq!(platform.submitted_tiles(), vec!["A", "B"]);
    assert_eq!(scheduler.summary().remaining(), 2);
}

#[tokio::test]
async fn expired_session_at_planning_aborts_with_no_records() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C"])
        .with_session_expiry(Utc::now() - ChronoDuration::minutes(5));
    let (mut scheduler, mut events) = observed_scheduler(&platform, test_config(3));

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(err, GridExportError::SessionError(_)));
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert!(scheduler.records().is_empty());
    assert_eq!(platform.session_calls(), 1);
    assert_eq!(platform.catalog_calls(), 0);
    assert!(platform.submissions().is_empty());

    let last = drain(&mut events).pop().unwrap();
    assert!(matches!(
        last.event,
        RunEvent::RunAborted { state_before: RunState::Planning, .. }
    ));
}

#[tokio::test]
async fn session_expiring_mid_run_is_renewed() {
    // The planning session outlives tile A but not the pacing delay before B
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B"])
        .with_session_lifetimes([ChronoDuration::milliseconds(300)]);
    let config = test_config(2).with_pacing(Duration::from_millis(800), Duration::ZERO);
    let mut scheduler = scheduler_for(&platform, config);

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(platform.session_calls(), 2);
    assert_eq!(platform.submitted_tiles(), vec!["A", "B"]);
}

#[tokio::test]
async fn failed_session_renewal_aborts_and_leaves_rest_unattempted() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C"])
        .with_session_lifetimes([ChronoDuration::milliseconds(300)])
        .with_session_failing_after(1);
    let config = test_config(3).with_pacing(Duration::from_millis(800), Duration::ZERO);
    let mut scheduler = scheduler_for(&platform, config);

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(err, GridExportError::SessionError(_)));
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert_eq!(platform.session_calls(), 2);
    assert_eq!(platform.submitted_tiles(), vec!["A"]);
    assert_eq!(scheduler.summary().remaining(), 2);
}

#[tokio::test]
async fn listing_outage_falls_back_to_submitting_everything() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B"])
        .with_existing_artifacts([artifact_for("A")])
        .with_listing_error(RemoteError::unavailable("storage 503"));
    let mut scheduler = scheduler_for(&platform, test_config(2));

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn catalog_duplicates_abort_the_run() {
    let platform = MockPlatform::new().with_square_tiles(&["A", "B", "A"]);
    let mut scheduler = scheduler_for(&platform, test_config(2));

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(err, GridExportError::CatalogError(_)));
    assert!(platform.submissions().is_empty());
}

#[tokio::test]
async fn identifiers_colliding_after_sanitizing_abort_the_run() {
    let platform = MockPlatform::new().with_square_tiles(&["4 p", "4_p", "4/p"]);
    let mut scheduler = scheduler_for(&platform, test_config(3));

    let err = scheduler.run().await.unwrap_err();

    assert!(matches!(err, GridExportError::CatalogError(_)));
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert!(platform.submissions().is_empty());
}

#[tokio::test]
async fn validation_run_uses_distinct_names_and_tile_subset() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C"])
        .with_existing_artifacts([artifact_for("B")]);
    let config = test_config(11)
        .with_variant(ArtifactVariant::Validation)
        .with_only_tiles(vec!["C".to_string(), "B".to_string()]);
    let mut scheduler = scheduler_for(&platform, config);

    scheduler.run().await.unwrap();

    // The production artifact for B does not satisfy a validation run
    assert_eq!(platform.submitted_tiles(), vec!["B", "C"]);
    let names: Vec<String> = platform
        .submissions()
        .iter()
        .map(|r| r.artifact_name.to_string())
        .collect();
    assert!(names.iter().all(|n| n.starts_with("NDVI_TEST_")));
}

#[tokio::test]
async fn progress_stream_reports_consistent_counts() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B", "C", "D"])
        .with_existing_artifacts([artifact_for("C")])
        .with_submission_failure("D", RemoteError::invalid_request("bad geometry"));
    let (mut scheduler, mut events) = observed_scheduler(&platform, test_config(3));

    scheduler.run().await.unwrap();
    let events = drain(&mut events);

    let names: Vec<&str> = events.iter().map(|e| e.event.name()).collect();
    assert_eq!(names.first(), Some(&"run.started"));
    assert_eq!(names.last(), Some(&"run.completed"));
    assert!(events.iter().all(|e| e.run_id == scheduler.run_id()));

    let mut processed = 0;
    for event in &events {
        if let RunEvent::TileProcessed { summary, .. } = &event.event {
            processed += 1;
            assert_eq!(summary.processed(), processed);
            assert_eq!(summary.submitted + summary.skipped + summary.failed, processed);
            assert_eq!(summary.total_tiles, 4);
        }
    }
    assert_eq!(processed, 4);
}

#[tokio::test(start_paused = true)]
async fn batch_pause_separates_batches() {
    let platform = MockPlatform::new().with_square_tiles(&["A", "B", "C"]);
    let config = test_config(1).with_pacing(Duration::ZERO, Duration::from_secs(10));
    let mut scheduler = scheduler_for(&platform, config);

    let started = tokio::time::Instant::now();
    scheduler.run().await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_batch_pause_interrupts_run() {
    let platform = MockPlatform::new().with_square_tiles(&["A", "B", "C", "D"]);
    let config = test_config(2).with_pacing(Duration::ZERO, Duration::from_secs(60));
    let mut scheduler = scheduler_for(&platform, config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let err = scheduler.run_with_cancellation(cancel).await.unwrap_err();

    assert_eq!(
        err,
        GridExportError::Interrupted {
            next_tile: Some("C".to_string())
        }
    );
    assert_eq!(scheduler.state(), RunState::Aborted);
    assert_eq!(platform.submitted_tiles(), vec!["A", "B"]);
}

#[tokio::test]
async fn verification_pass_confirms_completed_exports() {
    let platform = MockPlatform::new()
        .with_square_tiles(&["A", "B"])
        .completing_exports();
    let mut scheduler = scheduler_for(&platform, test_config(2));
    scheduler.run().await.unwrap();

    let report = VerificationPass::new(Arc::new(platform.clone()), TEST_OUTPUT_LOCATION)
        .verify(&Session::new("verifier"), scheduler.records())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.present.len(), 2);
}
