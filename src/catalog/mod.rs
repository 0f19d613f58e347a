//! # Tile Catalog Reader
//!
//! Loads the fixed set of input tiles from the tile source and turns raw features into
//! [`Tile`]s. Tile order is the source's order and is never changed afterwards.
//!
//! Any feature without a usable identifier or geometry, any duplicated identifier, and
//! any two identifiers that sanitize to the same artifact name make the whole catalog
//! unreadable. A catalog that cannot be trusted to be complete
//! and unambiguous is a run-fatal condition.

pub mod geojson;

pub use geojson::{parse_geometry, GeoJsonFileSource};

use crate::config::RunConfig;
use crate::error::{GridExportError, Result};
use crate::geometry::validate_shape;
use crate::models::{CoordinateReference, Tile, TileGeometry};
use crate::naming::sanitize_identifier;
use crate::remote::{RawFeature, RemoteErrorKind, Session, TileSource};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CatalogReader {
    collection_id: String,
    id_field: String,
    crs: CoordinateReference,
    only_tiles: Option<Vec<String>>,
}

impl CatalogReader {
    pub fn new(
        collection_id: impl Into<String>,
        id_field: impl Into<String>,
        crs: CoordinateReference,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            id_field: id_field.into(),
            crs,
            only_tiles: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let reader = Self::new(
            config.catalog_id.clone(),
            config.id_field.clone(),
            CoordinateReference::from_epsg(config.catalog_crs_epsg),
        );
        match &config.only_tiles {
            Some(tiles) => reader.with_only_tiles(tiles.clone()),
            None => reader,
        }
    }

    /// Restrict loading to the named tiles. Catalog order is kept.
    pub fn with_only_tiles(mut self, tiles: Vec<String>) -> Self {
        self.only_tiles = Some(tiles);
        self
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Fetch and decode the catalog.
    pub async fn load(&self, source: &dyn TileSource, session: &Session) -> Result<Vec<Tile>> {
        let features = source
            .fetch_features(session, &self.collection_id)
            .await
            .map_err(|e| match e.kind {
                RemoteErrorKind::Unauthenticated => GridExportError::SessionError(e.to_string()),
                _ => GridExportError::CatalogError(format!(
                    "{} ({}): {e}",
                    self.collection_id,
                    source.source_name()
                )),
            })?;

        let tiles = self.tiles_from_features(features)?;
        info!(
            collection_id = %self.collection_id,
            source = source.source_name(),
            tile_count = tiles.len(),
            "Tile catalog loaded"
        );
        Ok(tiles)
    }

    /// Decode raw features into tiles, enforcing identifier uniqueness.
    pub fn tiles_from_features(&self, features: Vec<RawFeature>) -> Result<Vec<Tile>> {
        let mut seen = HashSet::with_capacity(features.len());
        // sanitized form -> first raw identifier, so no two tiles share an artifact name
        let mut sanitized: HashMap<String, String> = HashMap::with_capacity(features.len());
        let mut tiles = Vec::with_capacity(features.len());

        for (position, feature) in features.into_iter().enumerate() {
            let identifier = self.identifier_of(position, &feature)?;
            if !seen.insert(identifier.clone()) {
                return Err(GridExportError::CatalogError(format!(
                    "duplicate tile identifier '{identifier}' in field '{}'",
                    self.id_field
                )));
            }
            if let Some(existing) =
                sanitized.insert(sanitize_identifier(&identifier), identifier.clone())
            {
                return Err(GridExportError::CatalogError(format!(
                    "tile identifiers '{existing}' and '{identifier}' map to the same artifact name"
                )));
            }

            let shape = parse_geometry(&feature.geometry)
                .map_err(|reason| {
                    GridExportError::CatalogError(format!("tile '{identifier}': {reason}"))
                })
                .and_then(|shape| {
                    validate_shape(&shape).map_err(|e| {
                        GridExportError::CatalogError(format!("tile '{identifier}': {e}"))
                    })?;
                    Ok(shape)
                })?;

            tiles.push(Tile::new(identifier, TileGeometry::new(self.crs, shape)));
        }

        Ok(self.apply_filter(tiles))
    }

    fn identifier_of(&self, position: usize, feature: &RawFeature) -> Result<String> {
        let identifier = match feature.properties.get(&self.id_field) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(GridExportError::CatalogError(format!(
                    "feature {position}: field '{}' has unsupported value {other}",
                    self.id_field
                )))
            }
            None => String::new(),
        };

        if identifier.is_empty() {
            return Err(GridExportError::CatalogError(format!(
                "feature {position}: missing identifier field '{}'",
                self.id_field
            )));
        }
        Ok(identifier)
    }

    fn apply_filter(&self, tiles: Vec<Tile>) -> Vec<Tile> {
        let Some(wanted) = &self.only_tiles else {
            return tiles;
        };

        let present: HashSet<&str> = tiles.iter().map(|t| t.identifier()).collect();
        for name in wanted.iter().filter(|name| !present.contains(name.as_str())) {
            warn!(tile_id = %name, collection_id = %self.collection_id, "Requested tile not in catalog");
        }

        let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
        tiles
            .into_iter()
            .filter(|t| wanted.contains(t.identifier()))
            .collect()
    }
}
