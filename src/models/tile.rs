use crate::constants::WGS84_EPSG;
use geo::{BoundingRect, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference of a tile geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CoordinateReference {
    /// WGS84 longitude/latitude in degrees
    Geographic,
    /// Planar CRS with coordinates in meters
    Projected { epsg: u32 },
}

impl CoordinateReference {
    pub fn from_epsg(epsg: u32) -> Self {
        if epsg == WGS84_EPSG {
            Self::Geographic
        } else {
            Self::Projected { epsg }
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Self::Geographic => WGS84_EPSG,
            Self::Projected { epsg } => *epsg,
        }
    }
}

impl fmt::Display for CoordinateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Polygonal tile footprint with its coordinate reference
#[derive(Debug, Clone, PartialEq)]
pub struct TileGeometry {
    pub crs: CoordinateReference,
    pub shape: MultiPolygon<f64>,
}

impl TileGeometry {
    pub fn new(crs: CoordinateReference, shape: MultiPolygon<f64>) -> Self {
        Self { crs, shape }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }
}

/// One grid cell of the input catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    identifier: String,
    geometry: TileGeometry,
    bounds: Option<Rect<f64>>,
}

impl Tile {
    pub fn new(identifier: impl Into<String>, geometry: TileGeometry) -> Self {
        let bounds = geometry.bounding_rect();
        Self {
            identifier: identifier.into(),
            geometry,
            bounds,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// Bounding rectangle computed at load time
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn epsg_4326_is_geographic() {
        assert_eq!(
            CoordinateReference::from_epsg(4326),
            CoordinateReference::Geographic
        );
        assert_eq!(
            CoordinateReference::from_epsg(32718),
            CoordinateReference::Projected { epsg: 32718 }
        );
        assert_eq!(CoordinateReference::from_epsg(32718).to_string(), "EPSG:32718");
    }

    #[test]
    fn tile_records_bounds() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 5.0),
            (x: 0.0, y: 5.0),
            (x: 0.0, y: 0.0),
        ];
        let tile = Tile::new(
            "A",
            TileGeometry::new(
                CoordinateReference::Projected { epsg: 3857 },
                MultiPolygon(vec![square]),
            ),
        );
        let bounds = tile.bounds().unwrap();
        assert_eq!(bounds.min().x, 0.0);
        assert_eq!(bounds.max().y, 5.0);
        assert_eq!(tile.identifier(), "A");
    }
}
