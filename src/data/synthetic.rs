//! A deterministic simulated point source, useful for demos and offline use.

use crate::data::error::DataError;
use crate::data::source::PointSource;
use crate::types::point::RawPoint;
use chrono::{Datelike, NaiveDate};
use futures_util::future::BoxFuture;
use std::f64::consts::PI;

// Brazil bounding box, matching the reference simulation.
const NORTH: f64 = 5.274_388_88;
const SOUTH: f64 = -33.751_169_44;
const EAST: f64 = -28.838_722_22;
const WEST: f64 = -73.982_833_33;

/// Generates a plausible per-date dataset without any network access.
///
/// Point counts and value distributions follow a seasonal sine over the day of
/// year; the pseudo-random stream is seeded by the date, so the same date
/// always yields the same points.
///
/// # Examples
///
/// ```
/// use geopulse::{PointSource, SyntheticSource};
/// use chrono::NaiveDate;
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = SyntheticSource::new();
/// let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
/// let a = source.fetch_points(date).await.unwrap();
/// let b = source.fetch_points(date).await.unwrap();
/// assert_eq!(a, b);
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn new() -> Self {
        Self
    }

    fn generate(date: NaiveDate) -> Vec<RawPoint> {
        let mut rng = SplitMix64::for_date(date);
        let seasonal = (f64::from(date.ordinal()) / 365.0 * 2.0 * PI).sin();
        let count = (50.0 + (seasonal * 30.0).round()) as usize;

        (0..count)
            .map(|_| {
                let lat = SOUTH + rng.next_f64() * (NORTH - SOUTH);
                let lng = WEST + rng.next_f64() * (EAST - WEST);
                let risk = (50.0 + seasonal * 30.0 + (rng.next_f64() - 0.5) * 40.0).clamp(0.0, 100.0);
                let probability =
                    (45.0 + seasonal * 25.0 + (rng.next_f64() - 0.5) * 50.0).clamp(0.0, 100.0);

                RawPoint {
                    coordinates: [lng, lat],
                    location: Some("simulation".to_string()),
                    description: None,
                    shark_name: None,
                    risk: risk.round() as u8,
                    probability: probability.round() as u8,
                    confidence: (70.0 + rng.next_f64() * 30.0).round() as u8,
                    intensity: rng.next_f64(),
                    quality: (80.0 + rng.next_f64() * 20.0).round() as u8,
                }
            })
            .collect()
    }
}

impl PointSource for SyntheticSource {
    fn fetch_points(&self, date: NaiveDate) -> BoxFuture<'_, Result<Vec<RawPoint>, DataError>> {
        Box::pin(async move { Ok(Self::generate(date)) })
    }
}

/// SplitMix64 stream. Small and reproducible; statistical quality is more than
/// enough for simulated observations.
struct SplitMix64(u64);

impl SplitMix64 {
    fn for_date(date: NaiveDate) -> Self {
        let seed = (date.year() as u64) << 16 | u64::from(date.ordinal());
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}
