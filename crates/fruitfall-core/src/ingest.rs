//! `GeoJSON` ingestion for point feature collections.
//!
//! The top-level document must be a `FeatureCollection`. Each entry of
//! `features` is handed to the `geojson` crate on its own so one malformed
//! record only drops that record; the rest of the collection stays usable.

use geojson::feature::Id;
use serde::Deserialize;
use serde_json::Value;

use crate::feature::{FeatureCollection, FeatureId, FeatureInput, LngLat, Properties};

/// Fatal errors: the document as a whole is unusable.
#[derive(Debug, thiserror::Error)]
pub enum GeoJsonError {
    #[error("GeoJSON is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a FeatureCollection, found type \"{0}\"")]
    NotACollection(String),
}

/// Why a single record was left out of a collection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DropReason {
    #[error("record is not a valid GeoJSON Feature: {0}")]
    InvalidFeature(String),

    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("unsupported geometry type \"{0}\" (only Point is clustered)")]
    UnsupportedGeometry(String),

    #[error("point coordinates are not a [lon, lat] pair")]
    MalformedCoordinates,

    #[error("point coordinates are not finite ({lng}, {lat})")]
    NonFiniteCoordinates { lng: f64, lat: f64 },

    #[error("point coordinates are outside the world bounds ({lng}, {lat})")]
    OutOfRange { lng: f64, lat: f64 },

    #[error("feature id {0} is already used in this collection")]
    DuplicateId(FeatureId),
}

/// A record that was dropped, with its position in the input sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    pub index: usize,
    pub reason: DropReason,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Value>,
}

/// Parse a `GeoJSON` `FeatureCollection` of points.
///
/// Records that are not Point features are dropped and reported; each drop is
/// logged at `warn`.
///
/// # Errors
///
/// Returns [`GeoJsonError::Json`] if the document is not JSON of the expected
/// shape, or [`GeoJsonError::NotACollection`] if its `type` is not
/// `FeatureCollection`.
pub fn parse_feature_collection(
    json: &str,
) -> Result<(FeatureCollection, Vec<DroppedRecord>), GeoJsonError> {
    let raw: RawCollection = serde_json::from_str(json)?;
    if raw.kind != "FeatureCollection" {
        return Err(GeoJsonError::NotACollection(raw.kind));
    }

    let mut features = Vec::with_capacity(raw.features.len());
    let mut dropped = Vec::new();
    for (index, record) in raw.features.into_iter().enumerate() {
        match parse_feature(record) {
            Ok(feature) => features.push(feature),
            Err(reason) => {
                tracing::warn!(index, %reason, "dropping GeoJSON record");
                dropped.push(DroppedRecord { index, reason });
            }
        }
    }

    Ok((FeatureCollection::new(features), dropped))
}

/// Parse one `Feature` record into a point input.
///
/// # Errors
///
/// Returns the [`DropReason`] for a record that cannot be clustered.
pub fn parse_feature(mut record: Value) -> Result<FeatureInput, DropReason> {
    // `geojson` rejects `"id": null`; treat it as absent.
    if let Some(object) = record.as_object_mut() {
        if object.get("id").is_some_and(Value::is_null) {
            object.remove("id");
        }
    }

    let feature = geojson::Feature::from_json_value(record)
        .map_err(|e| DropReason::InvalidFeature(e.to_string()))?;

    let geometry = feature.geometry.ok_or(DropReason::MissingGeometry)?;
    let coords = match geometry.value {
        geojson::Value::Point(coords) => coords,
        other => {
            return Err(DropReason::UnsupportedGeometry(
                geometry_kind(&other).to_owned(),
            ))
        }
    };
    let &[lng, lat, ..] = coords.as_slice() else {
        return Err(DropReason::MalformedCoordinates);
    };
    let position = LngLat::new(lng, lat);
    if !position.is_finite() {
        return Err(DropReason::NonFiniteCoordinates { lng, lat });
    }

    // Non-integer ids (strings, negatives, fractions) are treated as absent
    // and get a generated id at ingestion.
    let id = match feature.id {
        None => None,
        Some(Id::Number(n)) => {
            let parsed = n.as_u64().map(FeatureId);
            if parsed.is_none() {
                tracing::debug!(id = %n, "ignoring non-integer feature id");
            }
            parsed
        }
        Some(Id::String(s)) => {
            tracing::debug!(id = %s, "ignoring string feature id");
            None
        }
    };

    Ok(FeatureInput {
        id,
        position,
        properties: feature.properties.unwrap_or_else(Properties::new),
    })
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(features: &Value) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn parses_points_with_and_without_ids() {
        let doc = collection(&json!([
            {
                "type": "Feature",
                "id": 3,
                "geometry": { "type": "Point", "coordinates": [-93.26, 44.97] },
                "properties": { "fruit": "apple" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-94.1, 45.5, 300.0] },
                "properties": null
            }
        ]));

        let (fc, dropped) = parse_feature_collection(&doc).expect("valid collection");
        assert!(dropped.is_empty());
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].id, Some(FeatureId(3)));
        assert_eq!(fc.features[0].properties["fruit"], "apple");
        assert_eq!(fc.features[1].id, None);
        assert_eq!(fc.features[1].position, LngLat::new(-94.1, 45.5));
        assert!(fc.features[1].properties.is_empty());
    }

    #[test]
    fn drops_bad_records_and_keeps_the_rest() {
        let doc = collection(&json!([
            { "type": "Feature", "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } },
            { "type": "Feature", "geometry": null },
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": ["a", 1] } },
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [10.0] } },
            "not even an object",
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [10.0, 20.0] } }
        ]));

        let (fc, dropped) = parse_feature_collection(&doc).expect("valid collection");
        assert_eq!(fc.len(), 1);
        assert_eq!(
            dropped.iter().map(|d| d.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );
        assert_eq!(
            dropped[0].reason,
            DropReason::UnsupportedGeometry("LineString".to_owned())
        );
        assert_eq!(dropped[1].reason, DropReason::MissingGeometry);
        assert!(matches!(dropped[2].reason, DropReason::InvalidFeature(_)));
        assert!(matches!(
            dropped[3].reason,
            DropReason::MalformedCoordinates | DropReason::InvalidFeature(_)
        ));
        assert!(matches!(dropped[4].reason, DropReason::InvalidFeature(_)));
    }

    #[test]
    fn string_and_null_ids_are_treated_as_absent() {
        let doc = collection(&json!([
            { "type": "Feature", "id": "abc", "geometry": { "type": "Point", "coordinates": [1, 2] }, "properties": {} },
            { "type": "Feature", "id": null, "geometry": { "type": "Point", "coordinates": [3, 4] }, "properties": {} }
        ]));
        let (fc, dropped) = parse_feature_collection(&doc).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(fc.features[0].id, None);
        assert_eq!(fc.features[1].id, None);
    }

    #[test]
    fn rejects_non_collection_document() {
        let doc = json!({ "type": "Feature", "geometry": null }).to_string();
        let err = parse_feature_collection(&doc).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotACollection(ref t) if t == "Feature"));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_feature_collection("{ nope").unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
    }
}
