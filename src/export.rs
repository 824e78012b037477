//! Dataset and session exports.
//!
//! These functions produce serialized bytes plus a suggested filename; actually
//! writing or downloading the file is the embedding application's concern.

use crate::data::error::DataError;
use crate::types::dataset::Dataset;
use crate::types::point::Coordinates;
use crate::utils::date_key;
use crate::view::MapBounds;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::str::FromStr;

/// Supported dataset export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = DataError;

    /// Case-insensitive. Anything but `json`/`csv` is an
    /// [`DataError::UnsupportedExportFormat`]; the caller is expected to treat
    /// that as a no-op rather than produce a partial file.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DataError::UnsupportedExportFormat(other.to_string())),
        }
    }
}

/// A finished export: serialized content and its suggested filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetExport<'a> {
    export_date: DateTime<Utc>,
    data_date: String,
    dataset: &'a Dataset,
}

/// Serializes one day's dataset in the requested format.
///
/// JSON carries the full dataset with statistics and metadata; CSV is a flat
/// point table (`id,lat,lng,risk,probability,confidence,timestamp`).
pub fn export_dataset(dataset: &Dataset, format: ExportFormat) -> Result<ExportedFile, DataError> {
    let filename = format!("data_{}.{}", date_key(dataset.date), format.extension());
    let content = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(&DatasetExport {
            export_date: Utc::now(),
            data_date: date_key(dataset.date),
            dataset,
        })?,
        ExportFormat::Csv => dataset_csv(dataset).into_bytes(),
    };
    Ok(ExportedFile { filename, content })
}

fn dataset_csv(dataset: &Dataset) -> String {
    let mut rows = vec!["id,lat,lng,risk,probability,confidence,timestamp".to_string()];
    for point in &dataset.points {
        rows.push(format!(
            "{},{},{},{},{},{},{}",
            point.id,
            point.coordinates.lat,
            point.coordinates.lng,
            point.values.risk,
            point.values.probability,
            point.values.confidence,
            point.timestamp,
        ));
    }
    rows.join("\n")
}

/// A full session snapshot: the active dataset plus the map viewport polled
/// from the map collaborator's read-only queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot<'a> {
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    pub data_date: Option<String>,
    pub dataset: Option<&'a Dataset>,
    pub map_center: Option<Coordinates>,
    pub map_bounds: Option<MapBounds>,
}

/// Serializes a session snapshot to JSON.
pub fn export_session(
    date: Option<NaiveDate>,
    dataset: Option<&Dataset>,
    map_center: Option<Coordinates>,
    map_bounds: Option<MapBounds>,
) -> Result<ExportedFile, DataError> {
    let exported_at = Utc::now();
    let snapshot = SessionSnapshot {
        version: env!("CARGO_PKG_VERSION"),
        exported_at,
        data_date: date.map(date_key),
        dataset,
        map_center,
        map_bounds,
    };
    let filename = format!("session_{}.json", exported_at.format("%Y-%m-%d"));
    Ok(ExportedFile {
        filename,
        content: serde_json::to_vec_pretty(&snapshot)?,
    })
}
