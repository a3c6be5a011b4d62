//! Sliding-window scan over ordered hourly reports.

use snowsense_forecast::SnowReport;

use crate::clock::MILLIS_PER_HOUR;

/// The contiguous snowy run nearest "now" in the scanned direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowyRun {
    /// Offset in hours from now to the run's first hour, `None` when no run
    /// exists. Forward scans: hours until the run starts, zero or negative
    /// once it already has. Reverse scans: hours since the run started,
    /// always non-negative.
    pub hours_until_start: Option<f64>,
    /// Inclusive length of the run in hours; 0 when no run exists.
    pub consecutive_hours: f64,
}

/// Find the snowy run nearest the start of the scan.
///
/// `reports` must be ordered ascending by timestamp. With `reverse` the scan
/// walks newest-first, which makes index 0 "closest to now" when searching
/// the past. A single non-snowy hour after the run has started terminates
/// it; a later run is never considered, even if longer.
pub fn find_snowy_run<F>(
    reports: &[SnowReport],
    is_snowy: F,
    reverse: bool,
    now_millis: i64,
) -> SnowyRun
where
    F: Fn(&SnowReport) -> bool,
{
    let mut start: Option<i64> = None;
    let mut last: Option<i64> = None;

    let mut scan = |report: &SnowReport| -> bool {
        if is_snowy(report) {
            if start.is_none() {
                start = Some(report.timestamp_millis);
            }
            last = Some(report.timestamp_millis);
            true
        } else {
            // keep scanning only while the run has not started
            start.is_none()
        }
    };

    if reverse {
        for report in reports.iter().rev() {
            if !scan(report) {
                break;
            }
        }
    } else {
        for report in reports {
            if !scan(report) {
                break;
            }
        }
    }

    let consecutive_hours = match (start, last) {
        (Some(start), Some(last)) => (last - start).abs() as f64 / MILLIS_PER_HOUR as f64 + 1.0,
        _ => 0.0,
    };
    let hours_until_start = start.map(|start| {
        let delta = if reverse {
            now_millis - start
        } else {
            start - now_millis
        };
        delta as f64 / MILLIS_PER_HOUR as f64
    });

    SnowyRun {
        hours_until_start,
        consecutive_hours,
    }
}
