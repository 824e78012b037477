//! This module provides the main entry point for the geopulse dashboard core.
//! It wires the date-keyed dataset cache, the playback controller, proximity
//! queries and the export surface together behind one client, with the
//! rendering and panel layers injected as collaborator traits.

use crate::data::cache::DatasetCache;
use crate::data::source::PointSource;
use crate::error::GeoPulseError;
use crate::error_log::{ErrorLog, ErrorLogEntry};
use crate::export::{self, ExportFormat, ExportedFile};
use crate::playback::PlaybackState;
use crate::proximity::{self, PointIndex, DEFAULT_PROXIMITY_RADIUS_KM};
use crate::types::dataset::Dataset;
use crate::types::date_range::DateRange;
use crate::types::point::GeoPoint;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use crate::view::{MapView, NotificationLevel, PanelContent, PanelSink};
use bon::bon;
use chrono::{NaiveDate, Utc};
use log::error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default cadence of the playback tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

const ERROR_LOG_FILE_NAME: &str = "error_log.json";

/// Payload handed to data-updated subscribers after each completed load.
#[derive(Clone)]
pub struct DataUpdate {
    pub date: NaiveDate,
    pub dataset: Arc<Dataset>,
}

type Subscriber = Box<dyn Fn(&DataUpdate) + Send + Sync>;

pub(crate) struct Inner {
    pub(crate) range: DateRange,
    pub(crate) tick_interval: Duration,
    pub(crate) cache: DatasetCache,
    pub(crate) state: Mutex<PlaybackState>,
    subscribers: Mutex<Vec<Subscriber>>,
    current_dataset: Mutex<Option<Arc<Dataset>>>,
    map: Option<Arc<dyn MapView>>,
    panel: Option<Arc<dyn PanelSink>>,
    error_log: Arc<ErrorLog>,
}

/// The dashboard core client.
///
/// Owns the dataset cache, the playback state and the subscriber list; holds
/// the map and panel collaborators it was constructed with (explicit
/// dependency injection, no process-wide singletons). Cheap to clone; clones
/// share all state.
///
/// Methods that trigger loads (`set_date`, playback ticks, [`GeoPulse::load`])
/// must run inside a tokio runtime.
///
/// # Examples
///
/// ```
/// use geopulse::{DateRange, GeoPulse, SyntheticSource};
/// use chrono::NaiveDate;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pulse = GeoPulse::builder()
///     .source(Arc::new(SyntheticSource::new()))
///     .range(DateRange::default())
///     .start_date(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
///     .build();
///
/// let dataset = pulse.load(pulse.current_date()).await;
/// assert!(dataset.metadata.total_points > 0);
/// assert_eq!(dataset.metadata.total_points, dataset.points.len());
/// # }
/// ```
#[derive(Clone)]
pub struct GeoPulse {
    pub(crate) inner: Arc<Inner>,
}

#[bon]
impl GeoPulse {
    /// Builds a client.
    ///
    /// # Arguments
    ///
    /// * `.source(Arc<dyn PointSource>)`: **Required.** Where raw points come
    ///   from ([`crate::HttpPointSource`], [`crate::SyntheticSource`], or a
    ///   custom implementation).
    /// * `.range(DateRange)`: Optional. Navigable day range. Defaults to the
    ///   two-year window 2024-01-01 ..= 2025-12-31.
    /// * `.start_date(NaiveDate)`: Optional. Initial active day, clamped into
    ///   the range. Defaults to today, clamped.
    /// * `.tick_interval(Duration)`: Optional. Playback cadence, default 1 s.
    /// * `.map(Arc<dyn MapView>)` / `.panel(Arc<dyn PanelSink>)`: Optional
    ///   collaborators; without them loads still complete, they just render
    ///   nowhere.
    /// * `.error_log_path(PathBuf)`: Optional. Persists the diagnostic error
    ///   log to this file; defaults to in-memory only. See
    ///   [`GeoPulse::default_error_log_path`].
    #[builder]
    pub fn new(
        source: Arc<dyn PointSource>,
        range: Option<DateRange>,
        start_date: Option<NaiveDate>,
        tick_interval: Option<Duration>,
        map: Option<Arc<dyn MapView>>,
        panel: Option<Arc<dyn PanelSink>>,
        error_log_path: Option<PathBuf>,
    ) -> Self {
        let range = range.unwrap_or_default();
        let start = range.clamp(start_date.unwrap_or_else(|| Utc::now().date_naive()));
        let error_log = Arc::new(match error_log_path {
            Some(path) => ErrorLog::at_path(path),
            None => ErrorLog::in_memory(),
        });

        Self {
            inner: Arc::new(Inner {
                range,
                tick_interval: tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL),
                cache: DatasetCache::new(source, Some(error_log.clone())),
                state: Mutex::new(PlaybackState::new(start)),
                subscribers: Mutex::new(Vec::new()),
                current_dataset: Mutex::new(None),
                map,
                panel,
                error_log,
            }),
        }
    }

    /// The standard location for the persisted error log, under the platform
    /// cache directory. The directory is created if missing.
    pub fn default_error_log_path() -> Result<PathBuf, GeoPulseError> {
        let dir = get_cache_dir().map_err(GeoPulseError::CacheDirResolution)?;
        ensure_cache_dir_exists(&dir)
            .map_err(|e| GeoPulseError::CacheDirCreation(dir.clone(), e))?;
        Ok(dir.join(ERROR_LOG_FILE_NAME))
    }

    pub fn date_range(&self) -> DateRange {
        self.inner.range
    }

    /// Every navigable day in the configured range, in order.
    pub fn available_dates(&self) -> Vec<NaiveDate> {
        self.inner.range.iter_days().collect()
    }

    /// Loads the dataset for `date` (memoized, soft-failing, see
    /// [`DatasetCache`](crate::DatasetCache)), makes it current, renders it
    /// through the map collaborator, updates the panel, and then notifies
    /// subscribers synchronously in registration order.
    pub async fn load(&self, date: NaiveDate) -> Arc<Dataset> {
        let hit = self.inner.cache.get(date).is_some();
        if !hit {
            if let Some(panel) = &self.inner.panel {
                panel.set_loading(true);
            }
        }

        let dataset = self.inner.cache.load(date).await;

        if !hit {
            if let Some(panel) = &self.inner.panel {
                panel.set_loading(false);
            }
        }

        *self
            .inner
            .current_dataset
            .lock()
            .expect("current dataset lock poisoned") = Some(dataset.clone());

        if let Some(map) = &self.inner.map {
            map.render_points(&dataset.points);
        }
        if let Some(panel) = &self.inner.panel {
            panel.show_panel(&PanelContent::for_dataset(&dataset));
        }

        let update = DataUpdate {
            date,
            dataset: dataset.clone(),
        };
        let subscribers = self
            .inner
            .subscribers
            .lock()
            .expect("subscriber lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber(&update);
        }

        dataset
    }

    /// The most recently loaded dataset, if any.
    pub fn current_dataset(&self) -> Option<Arc<Dataset>> {
        self.inner
            .current_dataset
            .lock()
            .expect("current dataset lock poisoned")
            .clone()
    }

    /// Pure cache lookup for `date`; never triggers a load.
    pub fn cached_dataset(&self, date: NaiveDate) -> Option<Arc<Dataset>> {
        self.inner.cache.get(date)
    }

    /// Whether a load for `date` is currently in flight.
    pub fn is_loading(&self, date: NaiveDate) -> bool {
        self.inner.cache.is_loading(date)
    }

    /// Empties the dataset cache. Already-returned datasets stay valid.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        if let Some(panel) = &self.inner.panel {
            panel.show_notification("Cache cleared", NotificationLevel::Info, Duration::from_secs(2));
        }
    }

    /// Registers a data-updated subscriber. Subscribers run synchronously, in
    /// registration order, after each load's cache mutation completes.
    pub fn subscribe(&self, subscriber: impl Fn(&DataUpdate) + Send + Sync + 'static) {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(Box::new(subscriber));
    }

    /// Points of the current dataset within `radius_km` (default 0.1 km) of
    /// `(lat, lng)`. Empty when nothing is loaded.
    ///
    /// # Arguments
    ///
    /// * `.lat(f64)` / `.lng(f64)`: **Required.** Query coordinate.
    /// * `.radius_km(f64)`: Optional, defaults to 0.1.
    #[builder]
    pub fn points_near(&self, lat: f64, lng: f64, radius_km: Option<f64>) -> Vec<GeoPoint> {
        let radius_km = radius_km.unwrap_or(DEFAULT_PROXIMITY_RADIUS_KM);
        match self.current_dataset() {
            Some(dataset) => proximity::points_near(&dataset, lat, lng, radius_km),
            None => vec![],
        }
    }

    /// The closest points of the current dataset to `(lat, lng)`, nearest
    /// first, each with its distance in kilometers.
    ///
    /// # Arguments
    ///
    /// * `.lat(f64)` / `.lng(f64)`: **Required.** Query coordinate.
    /// * `.limit(usize)`: Optional, defaults to 5.
    /// * `.max_distance_km(f64)`: Optional, defaults to 50.0.
    #[builder]
    pub fn nearest_points(
        &self,
        lat: f64,
        lng: f64,
        limit: Option<usize>,
        max_distance_km: Option<f64>,
    ) -> Vec<(GeoPoint, f64)> {
        let limit = limit.unwrap_or(5);
        let max_distance_km = max_distance_km.unwrap_or(50.0);
        match self.current_dataset() {
            Some(dataset) => PointIndex::build(&dataset).nearest(lat, lng, limit, max_distance_km),
            None => vec![],
        }
    }

    /// Exports the current dataset in the named format (`"json"` or `"csv"`,
    /// case-insensitive).
    ///
    /// Soft surface for the UI layer: an unsupported format or a serialization
    /// failure is logged, recorded in the error log, and yields `None`; no
    /// partial file is ever produced. `None` is also returned (with a panel
    /// notification) when no dataset is loaded yet.
    pub fn export_dataset(&self, format: &str) -> Option<ExportedFile> {
        let Some(dataset) = self.current_dataset() else {
            if let Some(panel) = &self.inner.panel {
                panel.show_notification(
                    "No data to export",
                    NotificationLevel::Error,
                    Duration::from_secs(3),
                );
            }
            return None;
        };

        let format = match format.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(e) => {
                error!("{e}");
                self.inner.error_log.record(&e.to_string(), "export dataset");
                return None;
            }
        };

        match export::export_dataset(&dataset, format) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Dataset export failed: {e}");
                self.inner.error_log.record(&e.to_string(), "export dataset");
                None
            }
        }
    }

    /// Exports a session snapshot: current dataset plus the map viewport
    /// polled from the map collaborator's read-only queries.
    pub fn export_session(&self) -> Option<ExportedFile> {
        let dataset = self.current_dataset();
        let (center, bounds) = match &self.inner.map {
            Some(map) => (Some(map.current_center()), Some(map.current_bounds())),
            None => (None, None),
        };

        match export::export_session(
            dataset.as_ref().map(|d| d.date),
            dataset.as_deref(),
            center,
            bounds,
        ) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Session export failed: {e}");
                self.inner.error_log.record(&e.to_string(), "export session");
                None
            }
        }
    }

    /// Process-wide handler for unexpected failures: records the error in the
    /// capped log and raises a user-visible notification. Never terminates the
    /// session.
    pub fn report_error(&self, err: &str, context: &str) {
        error!("{context}: {err}");
        self.inner.error_log.record(err, context);
        if let Some(panel) = &self.inner.panel {
            panel.show_notification(
                "An error occurred. See the error log for details.",
                NotificationLevel::Error,
                Duration::from_secs(5),
            );
        }
    }

    /// Snapshot of the diagnostic error log, oldest first.
    pub fn error_entries(&self) -> Vec<ErrorLogEntry> {
        self.inner.error_log.entries()
    }

    pub fn clear_error_log(&self) {
        self.inner.error_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticSource;
    use crate::types::point::Coordinates;
    use crate::view::MapBounds;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn client() -> GeoPulse {
        GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 12, 31)))
            .start_date(d(2024, 6, 1))
            .build()
    }

    #[derive(Default)]
    struct RecordingPanel {
        events: Mutex<Vec<String>>,
    }

    impl RecordingPanel {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl PanelSink for RecordingPanel {
        fn show_panel(&self, content: &PanelContent) {
            self.push(format!("panel:{}", content.title));
        }

        fn show_notification(&self, message: &str, _level: NotificationLevel, _d: Duration) {
            self.push(format!("notify:{message}"));
        }

        fn set_loading(&self, loading: bool) {
            self.push(format!("loading:{loading}"));
        }
    }

    struct FixedMap;

    impl MapView for FixedMap {
        fn render_points(&self, _points: &[GeoPoint]) {}
        fn clear(&self) {}
        fn focus(&self, _lat: f64, _lng: f64, _zoom: u8) {}

        fn current_center(&self) -> Coordinates {
            Coordinates { lat: -14.2, lng: -51.9 }
        }

        fn current_bounds(&self) -> MapBounds {
            MapBounds {
                south_west: Coordinates { lat: -33.7, lng: -73.9 },
                north_east: Coordinates { lat: 5.3, lng: -28.8 },
            }
        }
    }

    #[tokio::test]
    async fn load_makes_the_dataset_current() {
        let pulse = client();
        assert!(pulse.current_dataset().is_none());

        let dataset = pulse.load(d(2024, 6, 1)).await;
        let current = pulse.current_dataset().unwrap();
        assert!(Arc::ptr_eq(&dataset, &current));
        assert_eq!(current.date, d(2024, 6, 1));
    }

    #[tokio::test]
    async fn subscribers_run_in_registration_order_after_the_load() {
        let pulse = client();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        pulse.subscribe(move |update| {
            first.lock().unwrap().push(("first", update.date));
        });
        let second = order.clone();
        pulse.subscribe(move |update| {
            // The dataset must already be queryable when subscribers fire.
            assert_eq!(update.dataset.metadata.total_points, update.dataset.points.len());
            second.lock().unwrap().push(("second", update.date));
        });

        pulse.load(d(2024, 6, 2)).await;

        let order = order.lock().unwrap();
        assert_eq!(*order, vec![("first", d(2024, 6, 2)), ("second", d(2024, 6, 2))]);
    }

    #[tokio::test]
    async fn panel_sees_loading_flag_only_on_misses() {
        let panel = Arc::new(RecordingPanel::default());
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 12, 31)))
            .start_date(d(2024, 6, 1))
            .panel(panel.clone())
            .build();

        pulse.load(d(2024, 6, 1)).await;
        let after_miss = panel.events();
        assert_eq!(after_miss[0], "loading:true");
        assert_eq!(after_miss[1], "loading:false");
        assert!(after_miss[2].starts_with("panel:Data for 2024-06-01"));

        // Hit: no loading flag, panel still refreshed.
        pulse.load(d(2024, 6, 1)).await;
        let after_hit = panel.events();
        assert_eq!(after_hit.len(), after_miss.len() + 1);
        assert!(after_hit.last().unwrap().starts_with("panel:"));
    }

    #[tokio::test]
    async fn proximity_queries_use_the_current_dataset() {
        let pulse = client();
        assert!(pulse.points_near().lat(-12.9).lng(-38.5).call().is_empty());

        let dataset = pulse.load(d(2024, 6, 1)).await;
        let anchor = dataset.points[0].coordinates;

        let hits = pulse
            .points_near()
            .lat(anchor.lat)
            .lng(anchor.lng)
            .call();
        assert!(hits.iter().any(|p| p.id == dataset.points[0].id));

        let nearest = pulse
            .nearest_points()
            .lat(anchor.lat)
            .lng(anchor.lng)
            .limit(3)
            .max_distance_km(10_000.0)
            .call();
        assert!(!nearest.is_empty());
        assert!(nearest.len() <= 3);
        assert_eq!(nearest[0].0.id, dataset.points[0].id);
        assert!(nearest.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn export_requires_a_loaded_dataset() {
        let panel = Arc::new(RecordingPanel::default());
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .panel(panel.clone())
            .build();

        assert!(pulse.export_dataset("json").is_none());
        assert!(panel.events().contains(&"notify:No data to export".to_string()));
    }

    #[tokio::test]
    async fn unsupported_export_format_is_a_logged_no_op() {
        let pulse = client();
        pulse.load(d(2024, 6, 1)).await;

        assert!(pulse.export_dataset("pdf").is_none());

        let entries = pulse.error_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].error.contains("pdf"));

        // Valid formats still work afterwards.
        let file = pulse.export_dataset("JSON").unwrap();
        assert_eq!(file.filename, "data_2024-06-01.json");
    }

    #[tokio::test]
    async fn session_export_polls_the_map_collaborator() {
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 12, 31)))
            .start_date(d(2024, 6, 1))
            .map(Arc::new(FixedMap))
            .build();
        pulse.load(d(2024, 6, 1)).await;

        let file = pulse.export_session().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&file.content).unwrap();
        assert_eq!(value["dataDate"], "2024-06-01");
        assert_eq!(value["mapCenter"]["lat"], -14.2);
    }

    #[tokio::test]
    async fn report_error_feeds_the_capped_log_and_panel() {
        let panel = Arc::new(RecordingPanel::default());
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .panel(panel.clone())
            .build();

        for i in 0..12 {
            pulse.report_error(&format!("boom {i}"), "test");
        }

        let entries = pulse.error_entries();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].error, "boom 2");
        assert!(panel
            .events()
            .iter()
            .any(|e| e.starts_with("notify:An error occurred")));

        pulse.clear_error_log();
        assert!(pulse.error_entries().is_empty());
    }

    #[tokio::test]
    async fn clear_cache_forces_a_refetch() {
        let fetches = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl PointSource for Counting {
            fn fetch_points(
                &self,
                date: NaiveDate,
            ) -> futures_util::future::BoxFuture<
                '_,
                Result<Vec<crate::types::point::RawPoint>, crate::data::error::DataError>,
            > {
                self.0.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { SyntheticSource::new().fetch_points(date).await })
            }
        }

        let pulse = GeoPulse::builder()
            .source(Arc::new(Counting(fetches.clone())))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 12, 31)))
            .start_date(d(2024, 6, 1))
            .build();

        pulse.load(d(2024, 6, 1)).await;
        pulse.load(d(2024, 6, 1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        pulse.clear_cache();
        pulse.load(d(2024, 6, 1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn available_dates_cover_the_range() {
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 1, 3)))
            .start_date(d(2024, 1, 1))
            .build();
        assert_eq!(
            pulse.available_dates(),
            vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]
        );
    }

    #[tokio::test]
    async fn start_date_is_clamped_into_the_range() {
        let pulse = GeoPulse::builder()
            .source(Arc::new(SyntheticSource::new()))
            .range(DateRange::new(d(2024, 1, 1), d(2024, 1, 31)))
            .start_date(d(2030, 5, 5))
            .build();
        assert_eq!(pulse.current_date(), d(2024, 1, 31));
    }
}
