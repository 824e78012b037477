//! Derived summary statistics over a list of observation points.

use crate::types::point::GeoPoint;
use serde::{Deserialize, Serialize};

/// A point is a hotspot when both its risk and probability exceed this.
pub const HOTSPOT_THRESHOLD: u8 = 70;

/// Aggregate metrics derived from a dataset's points.
///
/// A pure function of the point list: recomputed whenever the points change and
/// never mutated independently. The empty-input result reproduces the
/// accumulator initials of the reference behavior (`max_risk = 0`,
/// `min_risk = 100`), which downstream display code relies on.
///
/// # Examples
///
/// ```
/// use geopulse::Statistics;
///
/// let empty = Statistics::aggregate(&[]);
/// assert_eq!(empty.max_risk, 0);
/// assert_eq!(empty.min_risk, 100);
/// assert_eq!(empty.hotspot_count, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Mean risk, rounded half away from zero.
    pub avg_risk: u8,
    /// Mean probability, rounded half away from zero.
    pub avg_probability: u8,
    pub max_risk: u8,
    pub min_risk: u8,
    /// Number of points with risk and probability both above
    /// [`HOTSPOT_THRESHOLD`].
    pub hotspot_count: usize,
}

impl Statistics {
    /// Computes summary statistics over `points`.
    ///
    /// Empty input yields the neutral accumulator-initial value rather than an
    /// error.
    pub fn aggregate(points: &[GeoPoint]) -> Self {
        let mut total_risk: u64 = 0;
        let mut total_probability: u64 = 0;
        let mut max_risk: u8 = 0;
        let mut min_risk: u8 = 100;
        let mut hotspot_count: usize = 0;

        for point in points {
            let risk = point.values.risk;
            let probability = point.values.probability;

            total_risk += u64::from(risk);
            total_probability += u64::from(probability);
            max_risk = max_risk.max(risk);
            min_risk = min_risk.min(risk);

            if risk > HOTSPOT_THRESHOLD && probability > HOTSPOT_THRESHOLD {
                hotspot_count += 1;
            }
        }

        if points.is_empty() {
            return Self {
                avg_risk: 0,
                avg_probability: 0,
                max_risk,
                min_risk,
                hotspot_count,
            };
        }

        let n = points.len() as f64;
        Self {
            avg_risk: (total_risk as f64 / n).round() as u8,
            avg_probability: (total_probability as f64 / n).round() as u8,
            max_risk,
            min_risk,
            hotspot_count,
        }
    }
}
