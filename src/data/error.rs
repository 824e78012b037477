use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse points payload from {0}")]
    PayloadParse(String, #[source] reqwest::Error),

    // For custom PointSource implementations outside this crate.
    #[error("Point source failed: {0}")]
    Source(String),

    #[error("Unsupported export format '{0}'")]
    UnsupportedExportFormat(String),

    #[error("Failed to serialize export data")]
    ExportSerialization(#[from] serde_json::Error),
}
