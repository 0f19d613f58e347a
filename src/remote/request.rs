use crate::models::{ProcessingWindow, TileGeometry};
use crate::naming::ArtifactName;
use serde::{Deserialize, Serialize};

/// One processing+export job for a single tile
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub tile_identifier: String,
    pub artifact_name: ArtifactName,
    /// `{output_location}/{artifact_name}`
    pub target_path: String,
    pub description: String,
    /// Tile footprint after the overlap buffer
    pub region: TileGeometry,
    pub window: ProcessingWindow,
    pub cloud_threshold: f64,
    pub scale_meters: f64,
    pub max_pixels: u64,
    /// Opaque algorithm parameters forwarded untouched
    pub algorithm: serde_json::Map<String, serde_json::Value>,
}

/// Synchronous acceptance of an export request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportAck {
    pub job_id: String,
}

impl ExportAck {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}
