//! # Constants
//!
//! Defaults and limits shared across configuration, naming and scheduling.

use std::time::Duration;

/// Batch size for validation runs.
pub const VALIDATION_BATCH_SIZE: usize = 11;

/// Batch size for production runs.
pub const PRODUCTION_BATCH_SIZE: usize = 50;

/// Overlap buffer applied to each tile so neighbouring rasters mosaic without seams.
/// At 10m resolution, 20m is a two pixel overlap.
pub const DEFAULT_OVERLAP_BUFFER_METERS: f64 = 20.0;
pub const MAX_OVERLAP_BUFFER_METERS: f64 = 5_000.0;

pub const DEFAULT_CLOUD_THRESHOLD: f64 = 10.0;

pub const DEFAULT_ID_FIELD: &str = "CODIGO";
pub const DEFAULT_ARTIFACT_PREFIX: &str = "NDVI";

/// EPSG code for WGS84 longitude/latitude.
pub const WGS84_EPSG: u32 = 4326;

pub const DEFAULT_PACING_DELAY_MS: u64 = 1_000;
pub const MAX_PACING_DELAY_MS: u64 = 60_000;

pub const DEFAULT_BATCH_PAUSE_MS: u64 = 30_000;
pub const MAX_BATCH_PAUSE_MS: u64 = 600_000;

pub const MIN_INDEX_REFRESH_SECS: u64 = 60;

pub const DEFAULT_EXPORT_SCALE_METERS: f64 = 10.0;
pub const DEFAULT_EXPORT_MAX_PIXELS: u64 = 1_000_000_000;

/// Channel capacity for the run event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_024;

/// Mean Earth radius used for local planar projection of geographic tiles.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

pub mod naming {
    pub const VALIDATION_MARKER: &str = "TEST";
    pub const OVERLAP_SUFFIX: &str = "overlap";
    pub const SEPARATOR: char = '_';
}

pub mod system {
    use super::Duration;

    pub const ENVIRONMENT_VARIABLES: &[&str] = &["GRIDEXPORT_ENV", "APP_ENV"];
    pub const DEFAULT_ENVIRONMENT: &str = "development";
    pub const CONFIG_ENV_PREFIX: &str = "GRIDEXPORT";
    pub const CONFIG_ENV_SEPARATOR: &str = "__";
    pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

    /// Upper bound on how long a single synchronous submission call may hold the run.
    pub const SUBMISSION_TIMEOUT: Duration = Duration::from_secs(120);
}
