//! Domain types for geolocated point features.

use serde::{Deserialize, Serialize};

/// Opaque per-feature key/value payload. Passed through unmodified; nothing in
/// the map core interprets individual keys.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A longitude/latitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Both coordinates are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    /// Longitude in `[-180, 180]` and latitude in `[-90, 90]`.
    #[must_use]
    pub fn is_in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lng) && (-90.0..=90.0).contains(&self.lat)
    }

    /// Builds a position from a GeoJSON-style `[lon, lat]` pair.
    #[must_use]
    pub const fn from_array(coords: [f64; 2]) -> Self {
        Self {
            lng: coords[0],
            lat: coords[1],
        }
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lng, self.lat)
    }
}

/// Stable integer identifier of a feature within one collection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A feature as supplied by the upstream collaborator. The id is optional;
/// ingestion assigns one when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInput {
    pub id: Option<FeatureId>,
    pub position: LngLat,
    #[serde(default)]
    pub properties: Properties,
}

impl FeatureInput {
    #[must_use]
    pub fn new(position: LngLat) -> Self {
        Self {
            id: None,
            position,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(FeatureId(id));
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }
}

/// Ordered, re-suppliable set of input features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<FeatureInput>,
}

impl FeatureCollection {
    #[must_use]
    pub fn new(features: Vec<FeatureInput>) -> Self {
        Self { features }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<FeatureInput> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = FeatureInput>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// An ingested feature. The id is always present and unique within the
/// snapshot it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub id: FeatureId,
    pub position: LngLat,
    pub properties: Properties,
}
