//! # Artifact Naming
//!
//! Deterministic mapping from (tile identifier, processing window, variant) to the
//! artifact name used both as the export target and as the idempotency key. The same
//! function is used on the submission path and the lookup path, so the two can never
//! disagree.
//!
//! Names look like `NDVI_4-p_2017-06-01_2024-12-07_overlap`, or
//! `NDVI_TEST_4-p_2017-06-01_2024-12-07_overlap` for validation runs.

use crate::config::{ArtifactVariant, RunConfig};
use crate::constants::naming::{OVERLAP_SUFFIX, SEPARATOR, VALIDATION_MARKER};
use crate::error::{GridExportError, Result};
use crate::models::ProcessingWindow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path-safe artifact name (ASCII letters, digits, `_` and `-` only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Build a name from a storage listing entry, which may be a full path.
    pub fn from_listing(entry: &str) -> Self {
        let trimmed = entry.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        Self(last.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full storage path of this artifact under `location`
    pub fn full_path(&self, location: &str) -> String {
        format!("{}/{}", location.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace characters that are not safe in storage paths.
///
/// `ñ`/`Ñ` become `n-tilde`/`N-tilde` so that identifiers such as `4-ñ` and `4-n`
/// stay distinct; every other character outside `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            'ñ' => out.push_str("n-tilde"),
            'Ñ' => out.push_str("N-tilde"),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

/// Pure artifact namer configured once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    prefix: String,
    overlap_suffix: bool,
}

impl ArtifactNamer {
    pub fn new(prefix: impl Into<String>, overlap_suffix: bool) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || sanitize_identifier(&prefix) != prefix {
            return Err(GridExportError::ValidationError(format!(
                "artifact prefix '{prefix}' is not path safe"
            )));
        }
        Ok(Self {
            prefix,
            overlap_suffix,
        })
    }

    /// Namer for a run: the `_overlap` suffix marks artifacts exported with a
    /// positive overlap buffer.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::new(
            config.artifact_prefix.clone(),
            config.overlap_buffer_meters > 0.0,
        )
    }

    pub fn name(
        &self,
        tile_identifier: &str,
        window: &ProcessingWindow,
        variant: ArtifactVariant,
    ) -> Result<ArtifactName> {
        if tile_identifier.trim().is_empty() {
            return Err(GridExportError::ValidationError(
                "tile identifier must not be empty".to_string(),
            ));
        }

        let mut name = String::with_capacity(self.prefix.len() + tile_identifier.len() + 40);
        name.push_str(&self.prefix);
        name.push(SEPARATOR);
        if variant == ArtifactVariant::Validation {
            name.push_str(VALIDATION_MARKER);
            name.push(SEPARATOR);
        }
        name.push_str(&sanitize_identifier(tile_identifier));
        name.push(SEPARATOR);
        name.push_str(&window.start_date().format("%Y-%m-%d").to_string());
        name.push(SEPARATOR);
        name.push_str(&window.end_date().format("%Y-%m-%d").to_string());
        if self.overlap_suffix {
            name.push(SEPARATOR);
            name.push_str(OVERLAP_SUFFIX);
        }

        Ok(ArtifactName(name))
    }
}
