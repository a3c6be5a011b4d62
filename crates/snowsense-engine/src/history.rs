//! Disk-backed rolling record of observed conditions.
//!
//! Keeps the last 24 hours of reports, bucketed to one record per clock
//! hour, so "did it snow recently" survives a process restart. The file is
//! rewritten after every observation; durability is best-effort and never
//! blocks the in-memory state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use snowsense_forecast::SnowReport;

use crate::clock::{Clock, MILLIS_PER_HOUR};

/// Default history file name under the storage path.
pub const HISTORY_FILE: &str = "snowsense-history.json";

const RETENTION_MILLIS: i64 = 24 * MILLIS_PER_HOUR;

/// Bounded, hourly-bucketed store of past [`SnowReport`]s.
///
/// Mutation and the file write are serialized behind one mutex; snapshot
/// reads clone the current window.
pub struct HistoryStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    reports: Mutex<Vec<SnowReport>>,
}

impl HistoryStore {
    /// Open the store, hydrating from the persisted file when present.
    /// A missing file is a cold start; a corrupt file is deleted and the
    /// store starts empty.
    pub fn open(storage_path: &Path, history_file: &str, clock: Arc<dyn Clock>) -> Self {
        let path = storage_path.join(history_file);
        let reports = read_history(&path);
        Self {
            path,
            clock,
            reports: Mutex::new(reports),
        }
    }

    /// The current window, oldest first.
    pub fn reports(&self) -> Vec<SnowReport> {
        self.reports.lock().clone()
    }

    /// Absorb one observation: prune entries older than 24h, sort, merge
    /// same-hour buckets (flags ORed, temperature MINed, timestamp floored
    /// to the hour), then persist the result.
    pub fn add_observation(&self, report: SnowReport) {
        let mut reports = self.reports.lock();
        reports.push(report);

        let now = self.clock.now_millis();
        reports.retain(|r| now - r.timestamp_millis < RETENTION_MILLIS);
        reports.sort_by_key(|r| r.timestamp_millis);

        let mut merged: Vec<SnowReport> = Vec::with_capacity(reports.len());
        for report in reports.iter() {
            let bucket = report.timestamp_millis / MILLIS_PER_HOUR * MILLIS_PER_HOUR;
            match merged.last_mut() {
                Some(last) if last.timestamp_millis == bucket => {
                    last.temperature = last.temperature.min(report.temperature);
                    last.has_snow = last.has_snow || report.has_snow;
                    last.has_precip = last.has_precip || report.has_precip;
                }
                _ => merged.push(SnowReport {
                    timestamp_millis: bucket,
                    ..*report
                }),
            }
        }
        *reports = merged;

        write_history(&self.path, &reports);
    }
}

/// Load persisted reports. Missing file: empty. Unrecognized content: log,
/// delete the file, empty. Corruption self-heals instead of crashing.
pub fn read_history(path: &Path) -> Vec<SnowReport> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            error!("Error reading history from {}: {}", path.display(), e);
            delete_file(path);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<SnowReport>>(&contents) {
        Ok(reports) => reports,
        Err(e) => {
            error!("Unrecognized history in {}: {}", path.display(), e);
            delete_file(path);
            Vec::new()
        }
    }
}

/// Persist the full window as one JSON array, overwriting the file. A failed
/// write is logged and any partial file removed; in-memory state is
/// unaffected.
pub fn write_history(path: &Path, reports: &[SnowReport]) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!("Error creating history directory {}: {}", parent.display(), e);
            return;
        }
    }

    match serde_json::to_string(reports) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                error!("Error writing history to {}: {}", path.display(), e);
                delete_file(path);
            }
        }
        Err(e) => error!("Error serializing history: {}", e),
    }
}

fn delete_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use tempfile::tempdir;

    const NOW: i64 = 1_700_000_000_000 / MILLIS_PER_HOUR * MILLIS_PER_HOUR;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0
        }
    }

    fn report(timestamp_millis: i64, temperature: f64, has_snow: bool) -> SnowReport {
        SnowReport {
            timestamp_millis,
            temperature,
            has_snow,
            has_precip: has_snow,
        }
    }

    fn store_at(dir: &Path) -> HistoryStore {
        HistoryStore::open(dir, HISTORY_FILE, Arc::new(FixedClock(NOW)))
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        let reports = vec![report(NOW - MILLIS_PER_HOUR, 25.0, true), report(NOW, 30.0, false)];

        write_history(&path, &reports);
        assert_eq!(read_history(&path), reports);
    }

    #[test]
    fn test_missing_file_is_cold_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        assert!(read_history(&path).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_self_heals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        assert!(read_history(&path).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_element_self_heals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(&path, "[{\"bogus\": 1}]").unwrap();

        assert!(read_history(&path).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_creates_storage_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(HISTORY_FILE);
        write_history(&path, &[report(NOW, 30.0, false)]);
        assert!(path.exists());
    }

    #[test]
    fn test_add_observation_persists() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());
        store.add_observation(report(NOW, 28.0, true));

        let reloaded = store_at(dir.path());
        assert_eq!(reloaded.reports().len(), 1);
        assert!(reloaded.reports()[0].has_snow);
    }

    #[test]
    fn test_same_hour_reports_merge() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        // two raw reports inside the same clock hour: the transient snow
        // flag and the colder temperature must both survive the merge
        store.add_observation(report(NOW + 60_000, 30.0, true));
        store.add_observation(report(NOW + 120_000, 28.0, false));

        let merged = store.reports();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].timestamp_millis, NOW);
        assert_eq!(merged[0].temperature, 28.0);
        assert!(merged[0].has_snow);
        assert!(merged[0].has_precip);
    }

    #[test]
    fn test_distinct_hours_stay_separate() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        store.add_observation(report(NOW - MILLIS_PER_HOUR, 25.0, true));
        store.add_observation(report(NOW, 30.0, false));

        let reports = store.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].timestamp_millis < reports[1].timestamp_millis);
    }

    #[test]
    fn test_old_entries_pruned() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        store.add_observation(report(NOW - 25 * MILLIS_PER_HOUR, 20.0, true));
        store.add_observation(report(NOW, 30.0, false));

        let reports = store.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].timestamp_millis, NOW);
    }

    #[test]
    fn test_hydrates_from_previous_run() {
        let dir = tempdir().unwrap();
        {
            let store = store_at(dir.path());
            store.add_observation(report(NOW - 2 * MILLIS_PER_HOUR, 22.0, true));
        }
        let store = store_at(dir.path());
        assert_eq!(store.reports().len(), 1);
        assert!(store.reports()[0].has_snow);
    }
}
