mod data;
mod error;
mod error_log;
mod export;
mod geopulse;
mod playback;
mod proximity;
mod types;
mod utils;
mod view;

pub use error::GeoPulseError;
pub use geopulse::*;

pub use data::cache::DatasetCache;
pub use data::error::DataError;
pub use data::source::{HttpPointSource, PointSource, DEFAULT_REQUEST_TIMEOUT};
pub use data::synthetic::SyntheticSource;

pub use error_log::{ErrorLog, ErrorLogEntry, MAX_ERROR_LOG_ENTRIES};
pub use export::{export_dataset, export_session, ExportFormat, ExportedFile, SessionSnapshot};
pub use playback::PlaybackStatus;
pub use proximity::{points_near, PointIndex, DEFAULT_PROXIMITY_RADIUS_KM};

pub use types::dataset::{Dataset, DatasetMetadata};
pub use types::date_range::DateRange;
pub use types::point::{Coordinates, GeoPoint, PointMetadata, PointValues, RawPoint};
pub use types::statistics::{Statistics, HOTSPOT_THRESHOLD};

pub use utils::date_key;
pub use view::{MapBounds, MapView, NotificationLevel, PanelContent, PanelSink};
