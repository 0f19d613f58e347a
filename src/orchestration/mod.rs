//! # Orchestration
//!
//! The batch export core: artifact index, job submission, batch planning and
//! scheduling, progress aggregation and post-run verification.

pub mod artifact_index;
pub mod context;
pub mod error_classifier;
pub mod plan;
pub mod progress;
pub mod scheduler;
pub mod submitter;
pub mod verification;

pub use artifact_index::{ExistingArtifactIndex, IndexOrigin};
pub use context::PlatformContext;
pub use error_classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, ErrorContext, RemoteOperation,
    StandardErrorClassifier,
};
pub use plan::{partition, BatchPlan};
pub use progress::{ProgressReporter, RunSummary};
pub use scheduler::BatchScheduler;
pub use submitter::JobSubmitter;
pub use verification::{VerificationPass, VerificationReport};
