//! Collaborator seams for the rendering and panel layers.
//!
//! The core never touches a map or the DOM equivalent directly: it is handed
//! these traits at construction (explicit dependency injection, no globals) and
//! calls through them after each load. Implementations live in the embedding
//! application.

use crate::types::dataset::Dataset;
use crate::types::point::{Coordinates, GeoPoint};
use crate::utils::date_key;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// South-west / north-east corners of the visible map area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

/// The map-render collaborator.
///
/// `current_center` and `current_bounds` are read-only queries the core polls
/// for session export.
pub trait MapView: Send + Sync {
    fn render_points(&self, points: &[GeoPoint]);
    fn clear(&self);
    fn focus(&self, lat: f64, lng: f64, zoom: u8);
    fn current_center(&self) -> Coordinates;
    fn current_bounds(&self) -> MapBounds;
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Structured content for a side panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelContent {
    pub title: String,
    /// Label/value pairs, displayed in order.
    pub entries: Vec<(String, String)>,
}

impl PanelContent {
    /// The per-day summary panel shown after every load.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let stats = &dataset.statistics;
        Self {
            title: format!("Data for {}", date_key(dataset.date)),
            entries: vec![
                ("Points".to_string(), dataset.metadata.total_points.to_string()),
                ("Hotspots".to_string(), stats.hotspot_count.to_string()),
                ("Avg risk".to_string(), format!("{}%", stats.avg_risk)),
                (
                    "Avg probability".to_string(),
                    format!("{}/100", stats.avg_probability),
                ),
                ("Coverage".to_string(), format!("{}%", dataset.metadata.coverage)),
            ],
        }
    }
}

/// The panel/notification collaborator.
pub trait PanelSink: Send + Sync {
    fn show_panel(&self, content: &PanelContent);
    fn show_notification(&self, message: &str, level: NotificationLevel, duration: Duration);
    /// Loading indicator, raised while a cache miss is being fetched.
    fn set_loading(&self, loading: bool);
}
