use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use tracing::warn;

/// A feature collection reduced to what the pipeline needs.  Feature `i` of
/// the input is `geometries[i]`; non-polygonal features keep their slot with
/// an empty multipolygon and are left out when written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    pub geometries: Vec<MultiPolygon<f64>>,
    pub properties: Vec<Map<String, Value>>,
    /// Coordinate reference system descriptor, passed through unchanged.
    pub crs:        Option<Value>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize { self.geometries.len() }

    pub fn is_empty(&self) -> bool { self.geometries.is_empty() }

    /// The same collection with new geometries, one per feature.
    pub fn with_geometries(&self, geometries: Vec<MultiPolygon<f64>>) -> Result<Self> {
        if geometries.len() != self.geometries.len() {
            return Err(anyhow!("expected {} geometries, got {}", self.geometries.len(), geometries.len()));
        }
        Ok(Self { geometries, properties: self.properties.clone(), crs: self.crs.clone() })
    }
}

/// Read a GeoJSON FeatureCollection from a file.
pub fn read_geojson(path: &Path) -> Result<FeatureCollection> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    from_geojson_bytes(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a FeatureCollection as GeoJSON.
pub fn write_geojson(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let bytes = to_geojson_bytes(collection)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn from_geojson_bytes(bytes: &[u8]) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    if value["type"].as_str() != Some("FeatureCollection") {
        return Err(anyhow!("Expected a FeatureCollection, got {}", value["type"]));
    }
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

    let mut collection = FeatureCollection { crs: value.get("crs").cloned(), ..Default::default() };
    for (idx, feature) in features.iter().enumerate() {
        let geometry = &feature["geometry"];
        let multipolygon = match geometry["type"].as_str() {
            Some("Polygon") => {
                let rings = geometry["coordinates"].as_array()
                    .ok_or_else(|| anyhow!("Feature {idx}: Polygon without coordinates"))?;
                MultiPolygon(vec![parse_polygon(rings).with_context(|| format!("Feature {idx}"))?])
            }
            Some("MultiPolygon") => {
                let polygons = geometry["coordinates"].as_array()
                    .ok_or_else(|| anyhow!("Feature {idx}: MultiPolygon without coordinates"))?;
                let polygons = polygons.iter()
                    .map(|p| p.as_array().ok_or_else(|| anyhow!("polygon must be an array")).and_then(|r| parse_polygon(r)))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Feature {idx}"))?;
                MultiPolygon(polygons)
            }
            other => {
                warn!(feature = idx, geometry = ?other, "skipping non-polygonal feature");
                MultiPolygon(Vec::new())
            }
        };
        collection.geometries.push(multipolygon);
        collection.properties.push(feature["properties"].as_object().cloned().unwrap_or_default());
    }
    Ok(collection)
}

pub fn to_geojson_bytes(collection: &FeatureCollection) -> Result<Vec<u8>> {
    let features: Vec<Value> = collection.geometries.iter().enumerate()
        .filter(|(_, mp)| !mp.0.is_empty())
        .map(|(idx, mp)| json!({
            "type": "Feature",
            "geometry": multipolygon_to_geojson(mp),
            "properties": collection.properties.get(idx).cloned().unwrap_or_default(),
        }))
        .collect();

    let mut feature_collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(crs) = &collection.crs {
        feature_collection["crs"] = crs.clone();
    }
    serde_json::to_vec(&feature_collection).context("Failed to serialize GeoJSON to bytes")
}

fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| -> Vec<[f64; 2]> { ls.coords().map(|c| [c.x, c.y]).collect() };
    let polygons: Vec<Vec<Vec<[f64; 2]>>> = mp.0.iter()
        .map(|p| std::iter::once(p.exterior()).chain(p.interiors()).map(ring).collect())
        .collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// `[exterior, hole, hole, ...]`
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.as_array().ok_or_else(|| anyhow!("ring must be an array")).and_then(|r| parse_ring(r))
    });
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon without exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// `[[x, y], ...]`; the ring is closed if it is not already.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| {
            let x = pair[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
            let y = pair[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;

    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first); }
    }
    Ok(LineString(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "EPSG:28992" } },
        "features": [
            { "type": "Feature", "properties": { "name": "a" },
              "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 2], [0, 0]]] } },
            { "type": "Feature", "properties": { "name": "b" },
              "geometry": { "type": "Point", "coordinates": [5, 5] } },
            { "type": "Feature", "properties": null,
              "geometry": { "type": "MultiPolygon", "coordinates": [[[[2, 0], [4, 0], [4, 2], [2, 2]]]] } }
        ]
    }"#;

    #[test]
    fn reads_polygons_and_keeps_indices() {
        let collection = from_geojson_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.geometries[0].0.len(), 1);
        assert!(collection.geometries[1].0.is_empty());
        assert_eq!(collection.properties[1]["name"], "b");
        assert!(collection.properties[2].is_empty());
        // Unclosed rings are closed on read.
        assert_eq!(collection.geometries[2].0[0].exterior().0.len(), 5);
        assert_eq!(collection.crs.as_ref().unwrap()["properties"]["name"], "EPSG:28992");
    }

    #[test]
    fn round_trip_keeps_properties_and_crs() {
        let collection = from_geojson_bytes(SAMPLE.as_bytes()).unwrap();
        let bytes = to_geojson_bytes(&collection).unwrap();
        let again = from_geojson_bytes(&bytes).unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(again.properties[0], collection.properties[0]);
        assert_eq!(again.properties[1], collection.properties[2]);
        assert_eq!(again.crs, collection.crs);
        assert_eq!(again.geometries[0], collection.geometries[0]);
        assert_eq!(again.geometries[1], collection.geometries[2]);
    }

    #[test]
    fn non_polygonal_features_are_not_written() {
        let collection = from_geojson_bytes(SAMPLE.as_bytes()).unwrap();
        let value: Value = serde_json::from_slice(&to_geojson_bytes(&collection).unwrap()).unwrap();
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| f["geometry"]["type"] == "MultiPolygon"));
        assert!(features.iter().all(|f| f["properties"]["name"] != "b"));
    }

    #[test]
    fn rejects_non_collections() {
        assert!(from_geojson_bytes(br#"{ "type": "Feature" }"#).is_err());
        assert!(from_geojson_bytes(b"not json").is_err());
    }

    #[test]
    fn replacing_geometries_checks_count() {
        let collection = from_geojson_bytes(SAMPLE.as_bytes()).unwrap();
        assert!(collection.with_geometries(Vec::new()).is_err());
        let same = collection.with_geometries(collection.geometries.clone()).unwrap();
        assert_eq!(same, collection);
    }
}
