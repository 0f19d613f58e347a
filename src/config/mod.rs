//! # Run Configuration
//!
//! Explicit, validated configuration for one export run. Every recognized option is a
//! named field with a default; unknown keys and out-of-range values are rejected when
//! the configuration is built, not deep inside submission logic.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gridexport_core::config::{BatchSize, ConfigManager, RunConfig};
//! use gridexport_core::models::ProcessingWindow;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // From a file plus GRIDEXPORT__* environment overrides
//! let manager = ConfigManager::load_from_file("config/run.toml")?;
//! println!("batch size: {}", manager.config().batch_size_value());
//!
//! // Or in code
//! let window = ProcessingWindow::parse("2017-06-01", "2024-12-07")?;
//! let config = RunConfig::new("projects/demo/assets/grid", "projects/demo/assets/out", window, BatchSize::validation())
//!     .with_overlap_buffer_meters(20.0)
//!     .validated()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{self, system};
use crate::models::ProcessingWindow;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Recognized batch size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSizePreset {
    /// Small batches for validation runs
    Validation,
    /// Larger batches for production runs
    Production,
}

impl BatchSizePreset {
    pub fn size(&self) -> usize {
        match self {
            Self::Validation => constants::VALIDATION_BATCH_SIZE,
            Self::Production => constants::PRODUCTION_BATCH_SIZE,
        }
    }
}

/// Batch size chosen at run start: a named preset or an explicit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchSize {
    Preset(BatchSizePreset),
    Explicit(usize),
}

impl BatchSize {
    pub fn validation() -> Self {
        Self::Preset(BatchSizePreset::Validation)
    }

    pub fn production() -> Self {
        Self::Preset(BatchSizePreset::Production)
    }

    pub fn value(&self) -> usize {
        match self {
            Self::Preset(preset) => preset.size(),
            Self::Explicit(size) => *size,
        }
    }
}

/// Which family of artifact names a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactVariant {
    #[default]
    Production,
    /// Validation runs write separately named artifacts so they never satisfy a
    /// production idempotency check.
    Validation,
}

/// Raster export settings forwarded to the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExportSettings {
    /// Output pixel size in meters
    pub scale_meters: f64,
    /// Pixel budget for a single export
    pub max_pixels: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale_meters: constants::DEFAULT_EXPORT_SCALE_METERS,
            max_pixels: constants::DEFAULT_EXPORT_MAX_PIXELS,
        }
    }
}

fn default_id_field() -> String {
    constants::DEFAULT_ID_FIELD.to_string()
}

fn default_catalog_crs_epsg() -> u32 {
    constants::WGS84_EPSG
}

fn default_cloud_threshold() -> f64 {
    constants::DEFAULT_CLOUD_THRESHOLD
}

fn default_overlap_buffer_meters() -> f64 {
    constants::DEFAULT_OVERLAP_BUFFER_METERS
}

fn default_artifact_prefix() -> String {
    constants::DEFAULT_ARTIFACT_PREFIX.to_string()
}

fn default_pacing_delay_ms() -> u64 {
    constants::DEFAULT_PACING_DELAY_MS
}

fn default_batch_pause_ms() -> u64 {
    constants::DEFAULT_BATCH_PAUSE_MS
}

/// Root configuration for one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Identifier of the input tile collection
    pub catalog_id: String,

    /// Feature property holding each tile's identifier
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// EPSG code of the catalog geometries. 4326 is treated as geographic
    /// longitude/latitude, anything else as a planar CRS in meters.
    #[serde(default = "default_catalog_crs_epsg")]
    pub catalog_crs_epsg: u32,

    /// Storage location (folder/prefix) that receives the artifacts
    pub output_location: String,

    /// Processing window shared by every tile in the run
    pub window: ProcessingWindow,

    /// Maximum cloud cover percentage, passed through to the remote service
    #[serde(default = "default_cloud_threshold")]
    pub cloud_threshold: f64,

    /// Outward expansion applied to each tile geometry before export
    #[serde(default = "default_overlap_buffer_meters")]
    pub overlap_buffer_meters: f64,

    /// Batch size preset or explicit count. Required.
    pub batch_size: BatchSize,

    #[serde(default)]
    pub variant: ArtifactVariant,

    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,

    /// Delay between consecutive submissions
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Pause between batches
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Re-list existing artifacts after this many seconds. `None` keeps the listing
    /// taken at run start for the whole run.
    #[serde(default)]
    pub index_refresh_interval_secs: Option<u64>,

    /// Restrict the run to these tile identifiers (catalog order is preserved)
    #[serde(default)]
    pub only_tiles: Option<Vec<String>>,

    #[serde(default)]
    pub export: ExportSettings,

    /// Opaque algorithm parameters for the remote service
    #[serde(default)]
    pub algorithm: serde_json::Map<String, serde_json::Value>,
}

impl RunConfig {
    /// Create a configuration with defaults for every optional field
    pub fn new(
        catalog_id: impl Into<String>,
        output_location: impl Into<String>,
        window: ProcessingWindow,
        batch_size: BatchSize,
    ) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            id_field: default_id_field(),
            catalog_crs_epsg: default_catalog_crs_epsg(),
            output_location: output_location.into(),
            window,
            cloud_threshold: default_cloud_threshold(),
            overlap_buffer_meters: default_overlap_buffer_meters(),
            batch_size,
            variant: ArtifactVariant::default(),
            artifact_prefix: default_artifact_prefix(),
            pacing_delay_ms: default_pacing_delay_ms(),
            batch_pause_ms: default_batch_pause_ms(),
            index_refresh_interval_secs: None,
            only_tiles: None,
            export: ExportSettings::default(),
            algorithm: serde_json::Map::new(),
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_catalog_crs_epsg(mut self, epsg: u32) -> Self {
        self.catalog_crs_epsg = epsg;
        self
    }

    pub fn with_cloud_threshold(mut self, threshold: f64) -> Self {
        self.cloud_threshold = threshold;
        self
    }

    pub fn with_overlap_buffer_meters(mut self, meters: f64) -> Self {
        self.overlap_buffer_meters = meters;
        self
    }

    pub fn with_variant(mut self, variant: ArtifactVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.artifact_prefix = prefix.into();
        self
    }

    pub fn with_pacing(mut self, pacing_delay: Duration, batch_pause: Duration) -> Self {
        self.pacing_delay_ms = pacing_delay.as_millis() as u64;
        self.batch_pause_ms = batch_pause.as_millis() as u64;
        self
    }

    pub fn with_index_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.index_refresh_interval_secs = interval.map(|d| d.as_secs());
        self
    }

    pub fn with_only_tiles(mut self, tiles: Vec<String>) -> Self {
        self.only_tiles = Some(tiles);
        self
    }

    pub fn with_algorithm(mut self, algorithm: serde_json::Map<String, serde_json::Value>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Validate and return the configuration
    pub fn validated(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check every range and cross-field rule
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_empty("catalog_id", &self.catalog_id)?;
        require_non_empty("id_field", &self.id_field)?;
        require_non_empty("output_location", &self.output_location)?;

        if self.output_location.ends_with('/') {
            return Err(ConfigurationError::invalid_value(
                "output_location",
                &self.output_location,
                "must not end with '/'",
            ));
        }

        // The window validates itself on deserialization, but RunConfig::new accepts
        // any value so check again here.
        if self.window.start_date() >= self.window.end_date() {
            return Err(ConfigurationError::invalid_value(
                "window",
                self.window.to_string(),
                "start_date must be before end_date",
            ));
        }

        if !(0.0..=100.0).contains(&self.cloud_threshold) {
            return Err(ConfigurationError::invalid_value(
                "cloud_threshold",
                self.cloud_threshold.to_string(),
                "must be a percentage between 0 and 100",
            ));
        }

        if !self.overlap_buffer_meters.is_finite()
            || !(0.0..=constants::MAX_OVERLAP_BUFFER_METERS)
                .contains(&self.overlap_buffer_meters)
        {
            return Err(ConfigurationError::invalid_value(
                "overlap_buffer_meters",
                self.overlap_buffer_meters.to_string(),
                format!(
                    "must be between 0 and {}",
                    constants::MAX_OVERLAP_BUFFER_METERS
                ),
            ));
        }

        if self.batch_size.value() == 0 {
            return Err(ConfigurationError::invalid_value(
                "batch_size",
                "0",
                "must be at least 1",
            ));
        }

        let prefix_is_safe = !self.artifact_prefix.is_empty()
            && self
                .artifact_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !prefix_is_safe {
            return Err(ConfigurationError::invalid_value(
                "artifact_prefix",
                &self.artifact_prefix,
                "must be non-empty and contain only ASCII letters, digits, '_' or '-'",
            ));
        }

        if self.pacing_delay_ms > constants::MAX_PACING_DELAY_MS {
            return Err(ConfigurationError::invalid_value(
                "pacing_delay_ms",
                self.pacing_delay_ms.to_string(),
                format!("must be at most {}", constants::MAX_PACING_DELAY_MS),
            ));
        }

        if self.batch_pause_ms > constants::MAX_BATCH_PAUSE_MS {
            return Err(ConfigurationError::invalid_value(
                "batch_pause_ms",
                self.batch_pause_ms.to_string(),
                format!("must be at most {}", constants::MAX_BATCH_PAUSE_MS),
            ));
        }

        if let Some(secs) = self.index_refresh_interval_secs {
            if secs < constants::MIN_INDEX_REFRESH_SECS {
                return Err(ConfigurationError::invalid_value(
                    "index_refresh_interval_secs",
                    secs.to_string(),
                    format!("must be at least {}", constants::MIN_INDEX_REFRESH_SECS),
                ));
            }
        }

        if let Some(tiles) = &self.only_tiles {
            if tiles.is_empty() || tiles.iter().any(|t| t.trim().is_empty()) {
                return Err(ConfigurationError::invalid_value(
                    "only_tiles",
                    format!("{tiles:?}"),
                    "must list at least one non-empty tile identifier",
                ));
            }
        }

        if !(self.export.scale_meters.is_finite() && self.export.scale_meters > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "export.scale_meters",
                self.export.scale_meters.to_string(),
                "must be a positive number",
            ));
        }

        if self.export.max_pixels == 0 {
            return Err(ConfigurationError::invalid_value(
                "export.max_pixels",
                "0",
                "must be positive",
            ));
        }

        Ok(())
    }

    pub fn batch_size_value(&self) -> usize {
        self.batch_size.value()
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn index_refresh_interval(&self) -> Option<Duration> {
        self.index_refresh_interval_secs.map(Duration::from_secs)
    }

    /// Upper bound on a single synchronous submission call
    pub fn submission_timeout(&self) -> Duration {
        system::SUBMISSION_TIMEOUT
    }
}

fn require_non_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::missing_required_field(
            field,
            "run configuration",
        ));
    }
    Ok(())
}
