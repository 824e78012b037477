//! Proximity queries over a dataset's points: a great-circle radius filter and
//! an R-tree backed nearest-N index for map-click inspection.

use crate::types::dataset::Dataset;
use crate::types::point::GeoPoint;
use haversine::{distance, Location as HaversineLocation, Units};
use ordered_float::OrderedFloat;
use rstar::RTree;

/// Radius used when a proximity query does not specify one.
pub const DEFAULT_PROXIMITY_RADIUS_KM: f64 = 0.1;

fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    distance(
        HaversineLocation {
            latitude: lat1,
            longitude: lng1,
        },
        HaversineLocation {
            latitude: lat2,
            longitude: lng2,
        },
        Units::Kilometers,
    )
}

/// Returns all points within `radius_km` great-circle kilometers of
/// `(lat, lng)`.
///
/// A filter, not a sort: result order is the dataset's stable point order. A
/// point at the exact query coordinate is included for any radius >= 0.
///
/// # Examples
///
/// ```
/// use geopulse::{points_near, Dataset};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let dataset = Dataset::empty(date);
/// assert!(points_near(&dataset, -12.9, -38.5, 0.1).is_empty());
/// ```
pub fn points_near(dataset: &Dataset, lat: f64, lng: f64, radius_km: f64) -> Vec<GeoPoint> {
    dataset
        .points
        .iter()
        .filter(|point| {
            haversine_km(lat, lng, point.coordinates.lat, point.coordinates.lng) <= radius_km
        })
        .cloned()
        .collect()
}

/// An R-tree over one dataset's points, answering nearest-N queries.
///
/// Candidates come out of the tree in squared-degree order and are re-ranked by
/// haversine distance, so results are exact for the small per-day point counts
/// this serves.
pub struct PointIndex {
    rtree: RTree<GeoPoint>,
}

impl PointIndex {
    pub fn build(dataset: &Dataset) -> Self {
        Self {
            rtree: RTree::bulk_load(dataset.points.clone()),
        }
    }

    /// Up to `n` points within `max_distance_km` of `(lat, lng)`, closest
    /// first, each paired with its distance in kilometers.
    pub fn nearest(&self, lat: f64, lng: f64, n: usize, max_distance_km: f64) -> Vec<(GeoPoint, f64)> {
        if n == 0 {
            return vec![];
        }

        // Take a few more candidates than requested: squared-degree order and
        // haversine order can disagree near the cutoff.
        let candidate_limit = (n * 2).max(20);

        let mut with_distance: Vec<(GeoPoint, f64)> = self
            .rtree
            .nearest_neighbor_iter(&[lat, lng])
            .take(candidate_limit)
            .filter_map(|point| {
                let dist_km =
                    haversine_km(lat, lng, point.coordinates.lat, point.coordinates.lng);
                (dist_km <= max_distance_km).then(|| (point.clone(), dist_km))
            })
            .collect();

        with_distance.sort_by_key(|(_, dist)| OrderedFloat(*dist));
        with_distance.truncate(n);
        with_distance
    }
}
