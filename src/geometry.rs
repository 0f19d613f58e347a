//! # Overlap Buffer
//!
//! Outward geometric expansion of tile footprints so that neighbouring exports overlap
//! and can be mosaicked without seams. The expansion is a true buffer (Minkowski sum
//! with a disk of radius D): edges move outward by D and corners are rounded, which is
//! not the same as growing the bounding box.
//!
//! Planar geometries are buffered directly in their own units (meters). Geographic
//! geometries are projected to a local equirectangular plane centred on the tile,
//! buffered in meters, and projected back. At grid-cell scale the distortion of that
//! projection is far below one output pixel.

use crate::constants::EARTH_RADIUS_METERS;
use crate::error::{GridExportError, Result};
use crate::models::{CoordinateReference, TileGeometry};
use geo::{Area, Buffer, Centroid, Coord, MapCoords, MultiPolygon};

/// Latitudes beyond this are rejected: the local projection degenerates at the poles.
const MAX_ABS_LATITUDE: f64 = 89.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapBuffer {
    distance_meters: f64,
}

impl OverlapBuffer {
    pub fn new(distance_meters: f64) -> Result<Self> {
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return Err(GridExportError::GeometryError(format!(
                "overlap buffer distance must be a non-negative number, got {distance_meters}"
            )));
        }
        Ok(Self { distance_meters })
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    /// Expand `geometry` outward by the buffer distance. A zero distance returns the
    /// geometry unchanged.
    pub fn apply(&self, geometry: &TileGeometry) -> Result<TileGeometry> {
        validate_shape(&geometry.shape)?;

        if self.distance_meters == 0.0 {
            return Ok(geometry.clone());
        }

        let expanded = match geometry.crs {
            CoordinateReference::Projected { .. } => geometry.shape.buffer(self.distance_meters),
            CoordinateReference::Geographic => self.buffer_geographic(&geometry.shape)?,
        };

        if expanded.0.is_empty() || expanded.unsigned_area() <= geometry.shape.unsigned_area() {
            return Err(GridExportError::GeometryError(
                "overlap buffer produced an empty or degenerate geometry".to_string(),
            ));
        }

        Ok(TileGeometry::new(geometry.crs, expanded))
    }

    fn buffer_geographic(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        let origin = shape.centroid().ok_or_else(|| {
            GridExportError::GeometryError("cannot compute centroid of tile".to_string())
        })?;
        let (lon0, lat0) = (origin.x(), origin.y());

        if lat0.abs() > MAX_ABS_LATITUDE {
            return Err(GridExportError::GeometryError(format!(
                "tile centroid latitude {lat0:.4} is too close to a pole for local projection"
            )));
        }

        let meters_per_radian_x = EARTH_RADIUS_METERS * lat0.to_radians().cos();
        let meters_per_radian_y = EARTH_RADIUS_METERS;

        let local = shape.map_coords(move |c: Coord<f64>| Coord {
            x: (c.x - lon0).to_radians() * meters_per_radian_x,
            y: (c.y - lat0).to_radians() * meters_per_radian_y,
        });

        let buffered = local.buffer(self.distance_meters);

        Ok(buffered.map_coords(move |c: Coord<f64>| Coord {
            x: lon0 + (c.x / meters_per_radian_x).to_degrees(),
            y: lat0 + (c.y / meters_per_radian_y).to_degrees(),
        }))
    }
}

/// Reject shapes that cannot describe a tile: empty, open or non-finite rings, or
/// zero area.
pub fn validate_shape(shape: &MultiPolygon<f64>) -> Result<()> {
    if shape.0.is_empty() {
        return Err(GridExportError::GeometryError(
            "tile geometry has no polygons".to_string(),
        ));
    }

    for polygon in &shape.0 {
        let exterior = polygon.exterior();
        if exterior.0.len() < 4 {
            return Err(GridExportError::GeometryError(format!(
                "polygon exterior has {} coordinates, need at least 4",
                exterior.0.len()
            )));
        }
        if !exterior.is_closed() {
            return Err(GridExportError::GeometryError(
                "polygon exterior ring is not closed".to_string(),
            ));
        }
        if exterior.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GridExportError::GeometryError(
                "polygon contains non-finite coordinates".to_string(),
            ));
        }
    }

    if shape.unsigned_area() <= 0.0 {
        return Err(GridExportError::GeometryError(
            "tile geometry has zero area".to_string(),
        ));
    }

    Ok(())
}
