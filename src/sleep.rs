//! Sleep tracker model.
//!
//! The list shown by the tracker is a header row followed by one row per
//! recorded night, newest first. [`SleepTracker`] is the state holder behind
//! the screen: it records nights in an [`ItemStore`] and exposes observable
//! fields for button visibility and one-shot events.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::item::Item;
use crate::observable::{Observable, Subscription};
use crate::presenter::ListPresenter;
use crate::store::{ItemStore, Snapshot};
use crate::sync::ListSynchronizer;

/// Quality value of a night that has not been rated yet.
pub const UNRATED: i32 = -1;

/// Key reserved for the header row.
pub const HEADER_KEY: i64 = i64::MIN;

/// One tracked night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepNight {
    pub night_id: i64,
    pub start_time_milli: i64,
    pub end_time_milli: i64,
    /// 0..=5, or [`UNRATED`]
    pub sleep_quality: i32,
}

impl SleepNight {
    /// A night that starts (and, for now, ends) at `now`.
    pub fn start(night_id: i64, now: i64) -> Self {
        Self {
            night_id,
            start_time_milli: now,
            end_time_milli: now,
            sleep_quality: UNRATED,
        }
    }

    /// Still being tracked.
    pub fn is_open(&self) -> bool {
        self.end_time_milli == self.start_time_milli
    }

    pub fn duration_millis(&self) -> i64 {
        self.end_time_milli - self.start_time_milli
    }

    pub fn quality_label(&self) -> &'static str {
        quality_label(self.sleep_quality)
    }
}

impl Item for SleepNight {
    type Key = i64;

    fn key(&self) -> i64 {
        self.night_id
    }
}

/// Display text for a quality score.
pub fn quality_label(quality: i32) -> &'static str {
    match quality {
        0 => "Very bad",
        1 => "Poor",
        2 => "So-so",
        3 => "OK",
        4 => "Pretty good",
        5 => "Excellent",
        _ => "--",
    }
}

/// Row of the tracker list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Header,
    Night(SleepNight),
}

impl Row {
    /// Night behind this row; the header has none.
    pub fn night_id(&self) -> Option<i64> {
        match self {
            Self::Header => None,
            Self::Night(night) => Some(night.night_id),
        }
    }
}

impl Item for Row {
    type Key = i64;

    fn key(&self) -> i64 {
        match self {
            Self::Header => HEADER_KEY,
            Self::Night(night) => night.night_id,
        }
    }
}

/// Header row followed by `nights`. No list at all yields just the header.
pub fn rows_with_header(nights: Option<&[SleepNight]>) -> Vec<Row> {
    let nights = nights.unwrap_or_default();
    let mut rows = Vec::with_capacity(nights.len() + 1);
    rows.push(Row::Header);
    rows.extend(nights.iter().cloned().map(Row::Night));
    rows
}

/// Timestamp as shown in the nights summary, in UTC.
fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%A %b-%d-%Y Time: %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Plain-text summary of `nights`, one block per night. Open nights only
/// show their start.
pub fn format_nights(nights: &[SleepNight]) -> String {
    let mut out = String::from("Here is your sleep data\n");
    for night in nights {
        let _ = write!(out, "\nStart: {}\n", format_timestamp(night.start_time_milli));
        if night.is_open() {
            continue;
        }

        let secs = night.duration_millis() / 1000;
        let _ = writeln!(out, "End: {}", format_timestamp(night.end_time_milli));
        let _ = writeln!(out, "Quality: {}", night.quality_label());
        let _ = writeln!(
            out,
            "Hours:Minutes:Seconds: {}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
    }
    out
}

/// Keep `sync` showing the header plus every night in `store`. The list is
/// resubmitted on each store change until the subscription is dropped.
pub fn bind_nights<S, P>(store: &S, sync: ListSynchronizer<Row, P>) -> Subscription
where
    S: ItemStore<SleepNight> + ?Sized,
    P: ListPresenter<Row> + Send + 'static,
{
    store.observe_all().subscribe(move |nights: &Snapshot<SleepNight>| {
        let _ = sync.submit(rows_with_header(Some(nights.as_slice())));
    })
}

// =============================================================================
// Clock
// =============================================================================

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

// =============================================================================
// SleepTracker
// =============================================================================

/// State holder for the tracker screen.
pub struct SleepTracker<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    tonight: Observable<Option<SleepNight>>,
    nights: Observable<Snapshot<SleepNight>>,
    nights_text: Observable<String>,
    start_button_visible: Observable<bool>,
    stop_button_visible: Observable<bool>,
    clear_button_visible: Observable<bool>,
    show_snackbar_event: Observable<bool>,
    navigate_to_quality: Observable<Option<SleepNight>>,
    navigate_to_detail: Observable<Option<i64>>,
}

impl<S: ItemStore<SleepNight>> SleepTracker<S> {
    /// Create a tracker; `tonight` is restored from an open night in `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let tonight = Observable::new(None);
        let nights = store.observe_all();

        let tracker = Self {
            start_button_visible: tonight.map(|t: &Option<SleepNight>| t.is_none()),
            stop_button_visible: tonight.map(|t: &Option<SleepNight>| t.is_some()),
            clear_button_visible: nights.map(|n: &Snapshot<SleepNight>| !n.is_empty()),
            nights_text: nights.map(|n: &Snapshot<SleepNight>| format_nights(n)),
            show_snackbar_event: Observable::new(false),
            navigate_to_quality: Observable::new(None),
            navigate_to_detail: Observable::new(None),
            tonight,
            nights,
            store,
            clock,
        };
        tracker.tonight.set(tracker.fetch_tonight());
        tracker
    }

    /// Latest night, if it is still being tracked.
    fn fetch_tonight(&self) -> Option<SleepNight> {
        self.store.latest().filter(SleepNight::is_open)
    }

    /// Start tracking a new night.
    pub fn on_start_tracking(&self) -> SyncResult<()> {
        let night_id = self.store.latest().map_or(1, |n| n.night_id + 1);
        let night = SleepNight::start(night_id, self.clock.now_millis());
        info!(night_id, "start tracking");

        self.store.insert(night)?;
        self.tonight.set(self.fetch_tonight());
        Ok(())
    }

    /// Stop tracking tonight and ask for a quality rating. No-op when
    /// nothing is being tracked.
    pub fn on_stop_tracking(&self) -> SyncResult<()> {
        let Some(mut night) = self.tonight.get() else {
            debug!("stop requested with nothing tracked");
            return Ok(());
        };

        // Keep end distinct from start so the night reads as closed
        night.end_time_milli = self.clock.now_millis().max(night.start_time_milli + 1);
        info!(night_id = night.night_id, duration = night.duration_millis(), "stop tracking");

        self.store.update(night.clone())?;
        self.tonight.set(self.fetch_tonight());
        self.navigate_to_quality.set(Some(night));
        Ok(())
    }

    /// Record a quality score for `night_id`.
    pub fn on_set_quality(&self, night_id: i64, quality: i32) -> SyncResult<()> {
        let mut night = self
            .store
            .get(&night_id)
            .ok_or_else(|| SyncError::NotFound(night_id.to_string()))?;
        night.sleep_quality = quality.clamp(0, 5);
        self.store.update(night)?;
        self.done_navigating();
        Ok(())
    }

    /// Delete every night.
    pub fn on_clear(&self) {
        self.store.clear();
        self.tonight.set(None);
        self.show_snackbar_event.set(true);
    }

    pub fn done_showing_snackbar(&self) {
        self.show_snackbar_event.set(false);
    }

    pub fn done_navigating(&self) {
        self.navigate_to_quality.set(None);
    }

    /// A night row was clicked in the list.
    pub fn on_night_clicked(&self, night_id: i64) {
        debug!(night_id, "night clicked");
        self.navigate_to_detail.set(Some(night_id));
    }

    pub fn done_navigating_to_detail(&self) {
        self.navigate_to_detail.set(None);
    }

    pub fn tonight(&self) -> &Observable<Option<SleepNight>> {
        &self.tonight
    }

    pub fn nights(&self) -> &Observable<Snapshot<SleepNight>> {
        &self.nights
    }

    /// Summary text of every night, kept in step with the store.
    pub fn nights_text(&self) -> &Observable<String> {
        &self.nights_text
    }

    pub fn start_button_visible(&self) -> &Observable<bool> {
        &self.start_button_visible
    }

    pub fn stop_button_visible(&self) -> &Observable<bool> {
        &self.stop_button_visible
    }

    pub fn clear_button_visible(&self) -> &Observable<bool> {
        &self.clear_button_visible
    }

    pub fn show_snackbar_event(&self) -> &Observable<bool> {
        &self.show_snackbar_event
    }

    pub fn navigate_to_quality(&self) -> &Observable<Option<SleepNight>> {
        &self.navigate_to_quality
    }

    /// Night whose detail should be shown, set by a click.
    pub fn navigate_to_detail(&self) -> &Observable<Option<i64>> {
        &self.navigate_to_detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    use crate::executor::Inline;
    use crate::presenter::VecPresenter;
    use crate::store::MemoryStore;

    /// Clock that advances one hour per reading.
    struct StepClock(AtomicI64);

    impl Clock for StepClock {
        fn now_millis(&self) -> i64 {
            self.0.fetch_add(3_600_000, Ordering::SeqCst)
        }
    }

    fn tracker() -> (Arc<MemoryStore<SleepNight>>, SleepTracker<MemoryStore<SleepNight>>) {
        let store = Arc::new(MemoryStore::new());
        let tracker = SleepTracker::new(Arc::clone(&store), Arc::new(StepClock(AtomicI64::new(1_000))));
        (store, tracker)
    }

    #[test]
    fn test_rows_with_header() {
        assert_eq!(rows_with_header(None), vec![Row::Header]);

        let nights = [SleepNight::start(2, 0), SleepNight::start(1, 0)];
        let rows = rows_with_header(Some(&nights));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key(), HEADER_KEY);
        assert_eq!(rows[1].key(), 2);
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(quality_label(0), "Very bad");
        assert_eq!(quality_label(5), "Excellent");
        assert_eq!(quality_label(UNRATED), "--");
    }

    #[test]
    fn test_start_stop_toggles_buttons() {
        let (store, tracker) = tracker();
        assert!(tracker.start_button_visible().get());
        assert!(!tracker.clear_button_visible().get());

        tracker.on_start_tracking().unwrap();
        assert!(tracker.stop_button_visible().get());
        assert!(!tracker.start_button_visible().get());
        assert!(tracker.clear_button_visible().get());
        assert_eq!(tracker.tonight().get().map(|n| n.night_id), Some(1));

        tracker.on_stop_tracking().unwrap();
        assert!(tracker.start_button_visible().get());
        let rated = tracker.navigate_to_quality().get().unwrap();
        assert!(!rated.is_open());
        assert_eq!(store.get(&1).unwrap().end_time_milli, rated.end_time_milli);
    }

    #[test]
    fn test_stop_without_tonight_is_noop() {
        let (_store, tracker) = tracker();
        tracker.on_stop_tracking().unwrap();
        assert!(tracker.navigate_to_quality().get().is_none());
    }

    #[test]
    fn test_set_quality_updates_store_and_finishes_navigation() {
        let (store, tracker) = tracker();
        tracker.on_start_tracking().unwrap();
        tracker.on_stop_tracking().unwrap();

        tracker.on_set_quality(1, 4).unwrap();
        assert_eq!(store.get(&1).unwrap().quality_label(), "Pretty good");
        assert!(tracker.navigate_to_quality().get().is_none());

        assert!(matches!(tracker.on_set_quality(99, 1), Err(SyncError::NotFound(_))));
    }

    #[test]
    fn test_clear_raises_snackbar() {
        let (store, tracker) = tracker();
        tracker.on_start_tracking().unwrap();
        tracker.on_clear();

        assert!(store.is_empty());
        assert!(tracker.tonight().get().is_none());
        assert!(tracker.show_snackbar_event().get());
        tracker.done_showing_snackbar();
        assert!(!tracker.show_snackbar_event().get());
    }

    #[test]
    fn test_format_nights() {
        let mut night = SleepNight::start(1, 0);
        assert_eq!(
            format_nights(std::slice::from_ref(&night)),
            "Here is your sleep data\n\nStart: Thursday Jan-01-1970 Time: 00:00\n"
        );

        night.end_time_milli = 3_723_000;
        night.sleep_quality = 3;
        let text = format_nights(&[night]);
        assert!(text.contains("End: Thursday Jan-01-1970 Time: 01:02\n"));
        assert!(text.contains("Quality: OK\n"));
        assert!(text.ends_with("Hours:Minutes:Seconds: 1:02:03\n"));
    }

    #[test]
    fn test_nights_text_follows_store() {
        let (_store, tracker) = tracker();
        assert_eq!(tracker.nights_text().get(), "Here is your sleep data\n");

        tracker.on_start_tracking().unwrap();
        assert!(tracker.nights_text().get().contains("Start:"));
        assert!(!tracker.nights_text().get().contains("End:"));

        tracker.on_stop_tracking().unwrap();
        assert!(tracker.nights_text().get().contains("Hours:Minutes:Seconds: 1:00:00"));
    }

    #[test]
    fn test_night_click_navigates_to_detail() {
        let (_store, tracker) = tracker();
        let rows = rows_with_header(Some(&[SleepNight::start(4, 0)]));
        assert_eq!(rows[0].night_id(), None);

        if let Some(night_id) = rows[1].night_id() {
            tracker.on_night_clicked(night_id);
        }
        assert_eq!(tracker.navigate_to_detail().get(), Some(4));

        tracker.done_navigating_to_detail();
        assert!(tracker.navigate_to_detail().get().is_none());
    }

    #[test]
    fn test_open_night_restored_on_construction() {
        let store = Arc::new(MemoryStore::new());
        store.insert(SleepNight::start(7, 500)).unwrap();

        let tracker = SleepTracker::new(store, Arc::new(SystemClock));
        assert_eq!(tracker.tonight().get().map(|n| n.night_id), Some(7));
    }

    #[test]
    fn test_bound_list_follows_store() {
        let (store, tracker) = tracker();
        let sync = ListSynchronizer::new(VecPresenter::default(), Arc::new(Inline), Arc::new(Inline));
        let binding = bind_nights(store.as_ref(), sync.clone());

        sync.with_presenter(|p| assert_eq!(p.rows(), &[Row::Header]));

        tracker.on_start_tracking().unwrap();
        tracker.on_stop_tracking().unwrap();
        tracker.on_start_tracking().unwrap();
        sync.with_presenter(|p| {
            let keys: Vec<i64> = p.rows().iter().map(Item::key).collect();
            assert_eq!(keys, vec![HEADER_KEY, 2, 1]);
        });

        drop(binding);
        tracker.on_clear();
        assert_eq!(sync.current().len(), 3);
    }
}
