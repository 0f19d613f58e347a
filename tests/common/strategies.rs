//! Proptest strategies for tile identifiers and outcome logs.

use gridexport_core::models::SubmissionRecord;
use gridexport_core::naming::ArtifactName;
use proptest::prelude::*;

/// Identifiers as they appear in real grids: letters, digits, hyphens, the odd ñ or
/// space
pub fn tile_identifier_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9ñÑ -]{1,12}".prop_filter("identifier must not be blank", |s| !s.trim().is_empty())
}

pub fn record_strategy() -> impl Strategy<Value = SubmissionRecord> {
    (tile_identifier_strategy(), 0u8..3).prop_map(|(tile, kind)| {
        let name = ArtifactName::from_listing(&format!("NDVI_{tile}"));
        match kind {
            0 => SubmissionRecord::submitted(tile, name, "job"),
            1 => SubmissionRecord::skipped_exists(tile, name),
            _ => SubmissionRecord::failed(tile, Some(name), "quota exceeded"),
        }
    })
}
