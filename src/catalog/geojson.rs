//! GeoJSON geometry decoding and a file-backed tile source.

use crate::remote::{RawFeature, RemoteError, Session, TileSource};
use async_trait::async_trait;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<RawFeature>,
}

/// Decode a GeoJSON `Polygon` or `MultiPolygon` object. Positions may carry a third
/// (elevation) ordinate, which is dropped.
pub fn parse_geometry(value: &serde_json::Value) -> Result<MultiPolygon<f64>, String> {
    let geometry: GeoJsonGeometry = serde_json::from_value(value.clone())
        .map_err(|e| format!("unsupported or malformed geometry: {e}"))?;

    let polygons = match geometry {
        GeoJsonGeometry::Polygon { coordinates } => vec![to_polygon(coordinates)?],
        GeoJsonGeometry::MultiPolygon { coordinates } => coordinates
            .into_iter()
            .map(to_polygon)
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(MultiPolygon(polygons))
}

fn to_polygon(rings: Vec<Ring>) -> Result<Polygon<f64>, String> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon has no exterior ring".to_string())?;
    let interiors = rings.map(to_line_string).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to_line_string(exterior)?, interiors))
}

fn to_line_string(ring: Ring) -> Result<LineString<f64>, String> {
    ring.into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!(
                "position has {} ordinates, need at least 2",
                position.len()
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Tile source backed by a local GeoJSON FeatureCollection export. Used for plan
/// previews and tests; the session and collection id are not consulted.
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
    name: String,
}

impl GeoJsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("geojson:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse_collection(content: &str) -> Result<Vec<RawFeature>, RemoteError> {
        let collection: FeatureCollection = serde_json::from_str(content)
            .map_err(|e| RemoteError::invalid_request(format!("invalid FeatureCollection: {e}")))?;
        if collection.kind != "FeatureCollection" {
            return Err(RemoteError::invalid_request(format!(
                "expected a FeatureCollection, found '{}'",
                collection.kind
            )));
        }
        Ok(collection.features)
    }
}

#[async_trait]
impl TileSource for GeoJsonFileSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch_features(
        &self,
        _session: &Session,
        collection_id: &str,
    ) -> Result<Vec<RawFeature>, RemoteError> {
        debug!(path = %self.path.display(), collection_id, "Reading local catalog export");
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RemoteError::not_found(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Self::parse_collection(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn parses_polygon_with_hole_and_elevation() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0, 5.0], [10.0, 0.0, 5.0], [10.0, 10.0, 5.0], [0.0, 10.0, 5.0], [0.0, 0.0, 5.0]],
                [[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 2.0]]
            ]
        });
        let shape = parse_geometry(&value).unwrap();
        assert_eq!(shape.0.len(), 1);
        assert_eq!(shape.0[0].interiors().len(), 1);
        assert_eq!(shape.0[0].exterior().0[1], Coord { x: 10.0, y: 0.0 });
    }

    #[test]
    fn parses_multipolygon() {
        let square = json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        let value = json!({"type": "MultiPolygon", "coordinates": [square.clone(), square]});
        assert_eq!(parse_geometry(&value).unwrap().0.len(), 2);
    }

    #[test]
    fn rejects_points_and_short_positions() {
        assert!(parse_geometry(&json!({"type": "Point", "coordinates": [0.0, 0.0]})).is_err());
        assert!(parse_geometry(&json!({"type": "Polygon", "coordinates": [[[0.0]]]})).is_err());
        assert!(parse_geometry(&json!({"type": "Polygon", "coordinates": []})).is_err());
    }

    #[tokio::test]
    async fn file_source_reads_feature_collection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {"CODIGO": "4-p"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
                }]
            })
        )
        .unwrap();

        let source = GeoJsonFileSource::new(file.path());
        let features = source
            .fetch_features(&Session::new("local"), "ignored")
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].properties["CODIGO"], "4-p");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = GeoJsonFileSource::new("/nonexistent/catalog.geojson");
        let err = source
            .fetch_features(&Session::new("local"), "grid")
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::remote::RemoteErrorKind::NotFound);
    }

    #[test]
    fn rejects_non_collections() {
        let err = GeoJsonFileSource::parse_collection(r#"{"type":"Feature","features":[]}"#)
            .unwrap_err();
        assert!(err.message.contains("FeatureCollection"));
    }
}
