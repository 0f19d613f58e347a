#![allow(clippy::doc_markdown)] // Allow technical terms like GeoJSON, EPSG in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Grid Export Core
//!
//! Orchestrates one remote raster export per tile of a geographic grid.
//!
//! ## Overview
//!
//! Given a catalog of tiles and a processing window, a run submits one export job per
//! tile to a remote compute platform and keeps going for hours without supervision.
//! The platform does the image computation; this crate owns everything around it:
//!
//! - **Idempotent re-runs**: artifact names are deterministic, and tiles whose
//!   artifact already exists in storage are skipped without a remote call.
//! - **Failure isolation**: a rejected tile becomes a `failed` record and the run
//!   moves on. Only run-fatal errors (lost session, unreadable catalog) abort.
//! - **Pacing**: submissions are sequential with a delay between remote calls and an
//!   optional pause between batches.
//! - **Seamless mosaics**: each tile's footprint is buffered outward before export so
//!   neighbouring rasters overlap.
//!
//! ## Module Organization
//!
//! - [`config`] - Run configuration, validation and file/environment loading
//! - [`catalog`] - Tile catalog reader and GeoJSON decoding
//! - [`naming`] - Deterministic artifact names (the idempotency key)
//! - [`geometry`] - Overlap buffer
//! - [`remote`] - Trait seams for the session provider, tile source, export service
//!   and storage listing
//! - [`orchestration`] - Artifact index, job submitter, batch scheduler, progress and
//!   verification
//! - [`state_machine`] - Run lifecycle `Idle → Planning → Running → {Completed, Aborted}`
//! - [`events`] - Broadcast progress stream
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridexport_core::config::ConfigManager;
//! use gridexport_core::orchestration::{BatchScheduler, PlatformContext};
//!
//! # async fn example(context: PlatformContext) -> gridexport_core::Result<()> {
//! // `context` wraps the session provider, tile source, export service and storage
//! let config = ConfigManager::load_from_file("config/run.toml")?.into_config();
//!
//! let mut scheduler = BatchScheduler::new(config, context)?;
//! let summary = scheduler.run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod geometry;
pub mod logging;
pub mod models;
pub mod naming;
pub mod orchestration;
pub mod remote;
pub mod state_machine;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use config::{ArtifactVariant, BatchSize, BatchSizePreset, ConfigManager, RunConfig};
pub use error::{GridExportError, Result};
pub use events::{RunEvent, RunEventPublisher};
pub use geometry::OverlapBuffer;
pub use models::{
    CoordinateReference, ProcessingWindow, SubmissionOutcome, SubmissionRecord, Tile,
    TileGeometry,
};
pub use naming::{ArtifactName, ArtifactNamer};
pub use orchestration::{
    BatchPlan, BatchScheduler, ExistingArtifactIndex, JobSubmitter, PlatformContext,
    ProgressReporter, RunSummary, VerificationPass, VerificationReport,
};
pub use state_machine::RunState;
