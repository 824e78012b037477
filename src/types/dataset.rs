//! One calendar day's observation dataset plus its derived statistics.

use crate::types::point::{GeoPoint, RawPoint};
use crate::types::statistics::Statistics;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived dataset-level metadata, computed alongside the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// Always equals the number of points in the dataset.
    pub total_points: usize,
    /// Percentage relative to an assumed ceiling of 100 points per day.
    /// Deliberately not clamped: a day with more than 100 points reports
    /// coverage above 100%.
    pub coverage: u32,
    /// Rounded mean of the point quality scores; 0 for an empty dataset.
    pub quality: u8,
}

/// The full set of observation points plus derived statistics for one calendar
/// day.
///
/// `date` is the dataset's primary identity. Point order is fetch/generation
/// order; it carries no meaning but is stable. Statistics and metadata are pure
/// functions of the point list, computed at construction, so they are never
/// stale.
///
/// # Examples
///
/// ```
/// use geopulse::Dataset;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
/// let empty = Dataset::empty(date);
/// assert_eq!(empty.metadata.total_points, 0);
/// assert_eq!(empty.statistics.min_risk, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub date: NaiveDate,
    pub points: Vec<GeoPoint>,
    pub statistics: Statistics,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    /// Builds a dataset for `date`, deriving statistics and metadata from
    /// `points`.
    pub fn new(date: NaiveDate, points: Vec<GeoPoint>) -> Self {
        let statistics = Statistics::aggregate(&points);
        let total_points = points.len();
        let coverage = (total_points as f64 / 100.0 * 100.0).round() as u32;
        let quality = if points.is_empty() {
            0
        } else {
            let total: u64 = points.iter().map(|p| u64::from(p.metadata.quality)).sum();
            (total as f64 / total_points as f64).round() as u8
        };
        Self {
            date,
            points,
            statistics,
            metadata: DatasetMetadata {
                total_points,
                coverage,
                quality,
            },
        }
    }

    /// The valid, displayable result of a soft-failed load: no points, neutral
    /// statistics.
    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, Vec::new())
    }

    /// Wraps a fetched payload, converting each [`RawPoint`] in payload order.
    pub fn from_raw(date: NaiveDate, raw: Vec<RawPoint>) -> Self {
        let points = raw
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_geo_point(index, date))
            .collect();
        Self::new(date, points)
    }

    /// The `YYYY-MM-DD` string used to index the cache.
    pub fn date_key(&self) -> String {
        crate::utils::date_key(self.date)
    }
}
