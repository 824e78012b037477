//! The playback controller: a timer-driven state machine that advances the
//! active day at a fixed cadence until the range end or a manual stop.

use crate::geopulse::GeoPulse;
use chrono::{Duration as ChronoDuration, NaiveDate};
use log::info;
use tokio::task::JoinHandle;

/// The two states of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
}

pub(crate) struct PlaybackState {
    pub(crate) current_date: NaiveDate,
    /// Held only while playing; dropped on stop and on terminal ticks.
    pub(crate) tick: Option<JoinHandle<()>>,
    /// Bumped on every start; a terminal tick may only clear the handle of its
    /// own run, never one installed by a later start.
    pub(crate) generation: u64,
}

impl PlaybackState {
    pub(crate) fn new(current_date: NaiveDate) -> Self {
        Self {
            current_date,
            tick: None,
            generation: 0,
        }
    }
}

impl GeoPulse {
    /// The active day. Always within the configured range.
    pub fn current_date(&self) -> NaiveDate {
        self.inner
            .state
            .lock()
            .expect("playback state lock poisoned")
            .current_date
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.is_playing() {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("playback state lock poisoned")
            .tick
            .is_some()
    }

    /// Sets the active day, if `date` lies within the configured range.
    ///
    /// In range: updates the active day, triggers a (memoized, soft-failing)
    /// load for it in the background, and returns `true`. The load never
    /// blocks the caller; ticks and further navigation proceed on wall-clock
    /// time regardless of load latency.
    ///
    /// Out of range: returns `false` and mutates nothing. Works the same
    /// whether playback is running or not, and neither starts nor stops it.
    pub fn set_date(&self, date: NaiveDate) -> bool {
        if !self.inner.range.contains(date) {
            return false;
        }

        self.inner
            .state
            .lock()
            .expect("playback state lock poisoned")
            .current_date = date;

        let this = self.clone();
        tokio::spawn(async move {
            this.load(date).await;
        });
        true
    }

    /// Moves the active day by `days` (negative for backwards), with the same
    /// range validation as [`GeoPulse::set_date`]. Offsets too large to
    /// represent as a date are out of range by definition and return `false`.
    pub fn navigate_date(&self, days: i64) -> bool {
        let Some(offset) = ChronoDuration::try_days(days) else {
            return false;
        };
        match self.current_date().checked_add_signed(offset) {
            Some(date) => self.set_date(date),
            None => false,
        }
    }

    /// `Stopped -> Playing`: begins the periodic tick. Each tick advances the
    /// active day by one; the first out-of-range advance is terminal and the
    /// controller stops itself. No-op when already playing.
    pub fn start_playback(&self) {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("playback state lock poisoned");
        if state.tick.is_some() {
            return;
        }

        info!("Playback started at {}", state.current_date);
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let this = self.clone();
        let period = self.inner.tick_interval;
        state.tick = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick resolves immediately
            loop {
                ticker.tick().await;
                let next = this.current_date() + ChronoDuration::days(1);
                if !this.set_date(next) {
                    // Terminal: release our own handle so the status flips to
                    // Stopped, then end the task.
                    info!("Playback reached the end of the range");
                    this.finish_playback(generation);
                    break;
                }
            }
        }));
    }

    /// Clears the tick handle, but only when it still belongs to the run
    /// identified by `generation`. A terminal tick that lost a race against a
    /// stop/start pair must leave the newer run's handle in place.
    fn finish_playback(&self, generation: u64) {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("playback state lock poisoned");
        if state.generation == generation {
            state.tick.take();
        }
    }

    /// `Playing -> Stopped`: cancels the pending tick. Safe to call when
    /// already stopped. In-flight dataset loads are never cancelled; one
    /// started just before the stop still completes and populates the cache.
    pub fn stop_playback(&self) {
        let handle = self
            .inner
            .state
            .lock()
            .expect("playback state lock poisoned")
            .tick
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Playback stopped at {}", self.current_date());
        }
    }

    /// Called when the application is hidden or backgrounded: playback stops,
    /// everything else stays live.
    pub fn suspend(&self) {
        self.stop_playback();
    }
}
