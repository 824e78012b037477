//! Data-source collaborators: where a day's raw observation points come from.

use crate::data::error::DataError;
use crate::types::point::RawPoint;
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use log::info;
use reqwest::Client;
use std::time::Duration;

/// Default bound on a single points request. Expiry is treated as a fetch
/// failure and takes the soft-fail path.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of raw observation points for a given calendar day.
///
/// The cache calls this exactly once per date key (successful or failed); the
/// result is memoized either way. Implementations receive the requested date so
/// that a real per-date source can be substituted, even though the stock HTTP
/// source ignores it (see [`HttpPointSource`]).
pub trait PointSource: Send + Sync {
    fn fetch_points(&self, date: NaiveDate) -> BoxFuture<'_, Result<Vec<RawPoint>, DataError>>;
}

/// Fetches the points resource over HTTP as a JSON array of [`RawPoint`].
///
/// Known source quirk, reproduced deliberately: the request is **not**
/// parametrized by the requested date, so every day's fetch returns the same
/// static resource, and the payload is cached under whichever date key asked
/// for it. Substitute a custom [`PointSource`] for a real per-date feed.
pub struct HttpPointSource {
    client: Client,
    url: String,
}

impl HttpPointSource {
    /// Creates a source reading from `url` with the default request timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PointSource for HttpPointSource {
    fn fetch_points(&self, _date: NaiveDate) -> BoxFuture<'_, Result<Vec<RawPoint>, DataError>> {
        Box::pin(async move {
            info!("Downloading points from {}", self.url);

            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| DataError::NetworkRequest(self.url.clone(), e))?;

            let response = match response.error_for_status() {
                Ok(resp) => resp,
                Err(e) => {
                    return Err(if let Some(status) = e.status() {
                        DataError::HttpStatus {
                            url: self.url.clone(),
                            status,
                            source: e,
                        }
                    } else {
                        DataError::NetworkRequest(self.url.clone(), e)
                    });
                }
            };

            let points: Vec<RawPoint> = response
                .json()
                .await
                .map_err(|e| DataError::PayloadParse(self.url.clone(), e))?;

            info!("Downloaded {} raw points from {}", points.len(), self.url);
            Ok(points)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_source_keeps_configured_url() {
        let source = HttpPointSource::new("https://example.invalid/points.json");
        assert_eq!(source.url(), "https://example.invalid/points.json");
    }

    #[test]
    fn payload_parses_as_raw_points() {
        let payload = r#"[
            {"coordinates": [-38.52, -12.97], "location": "Salvador", "sharkName": "Luiza", "risk": 82, "probability": 74},
            {"coordinates": [-34.87, -8.05], "description": "reef sighting"}
        ]"#;
        let points: Vec<RawPoint> = serde_json::from_str(payload).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].shark_name.as_deref(), Some("Luiza"));
        assert_eq!(points[1].risk, 0);
    }
}
