//! Defines the data structures representing a single geospatial observation point,
//! both in its wire form ([`RawPoint`], as served by the points resource) and in
//! its in-memory form ([`GeoPoint`]). Also includes the implementations necessary
//! for spatial indexing using the `rstar` crate.

use chrono::{DateTime, NaiveDate, Utc};
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A geographical coordinate in decimal degrees.
///
/// Latitude is in `[-90, 90]` (positive north), longitude in `[-180, 180]`
/// (positive east).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// The observed values attached to a point.
///
/// `risk`, `probability` and `confidence` are percentages in `[0, 100]`;
/// `intensity` is a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointValues {
    pub risk: u8,
    pub probability: u8,
    pub confidence: u8,
    pub intensity: f64,
}

/// Provenance metadata for a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointMetadata {
    /// Where the observation came from (e.g. "simulation", or the free-text
    /// location of a remote observation).
    pub source: String,
    /// Data quality score in `[0, 100]`.
    pub quality: u8,
    /// When the point was processed into a dataset.
    pub processed_at: DateTime<Utc>,
}

/// A single time-stamped geospatial observation.
///
/// Immutable once constructed; owned exclusively by the
/// [`Dataset`](crate::Dataset) that contains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Opaque unique identifier.
    pub id: String,
    pub coordinates: Coordinates,
    pub values: PointValues,
    /// The observation's calendar day.
    pub timestamp: NaiveDate,
    pub metadata: PointMetadata,
}

/// The wire shape of one entry in the fetched points resource.
///
/// Coordinates arrive as a `[lng, lat]` pair (GeoJSON order). All numeric value
/// fields are optional in the payload and default to zero when absent.
///
/// # Examples
///
/// ```
/// use geopulse::RawPoint;
///
/// let raw: RawPoint = serde_json::from_str(
///     r#"{"coordinates": [-38.5, -12.9], "location": "Salvador", "sharkName": "Luiza"}"#,
/// ).unwrap();
/// assert_eq!(raw.coordinates, [-38.5, -12.9]);
/// assert_eq!(raw.shark_name.as_deref(), Some("Luiza"));
/// assert_eq!(raw.risk, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    /// `[lng, lat]`, GeoJSON axis order.
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub shark_name: Option<String>,
    #[serde(default)]
    pub risk: u8,
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default)]
    pub intensity: f64,
    #[serde(default)]
    pub quality: u8,
}

impl RawPoint {
    /// Converts the wire form into a [`GeoPoint`] observed on `date`.
    ///
    /// `index` is the point's position in the payload and yields a stable id
    /// (`point_<index>`); the free-text location becomes the metadata source,
    /// falling back to `"remote"` when absent.
    pub fn into_geo_point(self, index: usize, date: NaiveDate) -> GeoPoint {
        let [lng, lat] = self.coordinates;
        GeoPoint {
            id: format!("point_{index}"),
            coordinates: Coordinates { lat, lng },
            values: PointValues {
                risk: self.risk,
                probability: self.probability,
                confidence: self.confidence,
                intensity: self.intensity,
            },
            timestamp: date,
            metadata: PointMetadata {
                source: self.location.unwrap_or_else(|| "remote".to_string()),
                quality: self.quality,
                processed_at: Utc::now(),
            },
        }
    }
}

// --- R-Tree implementations ---

/// Treats a `GeoPoint` as a point object within an R-tree, keyed by
/// `[lat, lng]`.
impl RTreeObject for GeoPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.coordinates.lat, self.coordinates.lng])
    }
}

impl PointDistance for GeoPoint {
    /// Squared Euclidean distance in degree space. An approximation the R-tree
    /// uses for candidate ordering; exact distances are recomputed with the
    /// haversine formula afterwards.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coordinates.lat - point[0];
        let dy = self.coordinates.lng - point[1];
        dx * dx + dy * dy
    }
}
