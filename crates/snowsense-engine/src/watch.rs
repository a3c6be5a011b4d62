//! The prediction engine: pulls forecasts, records observations, and
//! answers per-sensor threshold queries.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use snowsense_forecast::{SnowForecast, SnowProvider, SnowReport};

use crate::cache::ForecastCache;
use crate::clock::Clock;
use crate::error::EngineError;
use crate::history::HistoryStore;
use crate::window::find_snowy_run;

/// Per-sensor thresholds. Many sensors may query one engine; a threshold of
/// 0 hours disables that branch unless the event lands on the current hour,
/// and 0 consecutive hours disables the consecutive-hours guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub display_name: String,
    pub hours_before_snow_is_snowy: f64,
    pub hours_after_snow_is_snowy: f64,
    pub consecutive_hours_future_is_snowy: f64,
}

/// Derived snapshot of the engine's current view. Recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowSenseValues {
    pub snowing_now: bool,
    /// Hours since the most recent past snow, 0 while snowing.
    pub last_snow_time: Option<f64>,
    pub past_consecutive_hours: f64,
    /// Hours until forecast snow starts; zero or negative once it has.
    pub next_snow_time: Option<f64>,
    pub future_consecutive_hours: f64,
}

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct SnowWatchOptions {
    pub api_throttle_minutes: Option<u32>,
    /// Treat precipitation below this temperature as snow.
    pub cold_precipitation_threshold: Option<f64>,
    /// Only ever report snowy at or below `cold_temperature_threshold`.
    pub only_when_cold: bool,
    pub cold_temperature_threshold: Option<f64>,
    pub storage_path: PathBuf,
    pub history_file: String,
}

/// Watches one location: forecast in, per-sensor booleans out.
pub struct SnowWatch {
    cache: ForecastCache,
    history: HistoryStore,
    clock: Arc<dyn Clock>,
    cold_precipitation_threshold: Option<f64>,
    only_when_cold: bool,
    cold_temperature_threshold: Option<f64>,
    current_report: Option<SnowReport>,
    future_reports: Vec<SnowReport>,
}

impl SnowWatch {
    pub fn new(
        provider: Arc<dyn SnowProvider>,
        clock: Arc<dyn Clock>,
        options: SnowWatchOptions,
    ) -> Self {
        let cache = ForecastCache::new(provider, clock.clone(), options.api_throttle_minutes);
        let history = HistoryStore::open(&options.storage_path, &options.history_file, clock.clone());
        Self {
            cache,
            history,
            clock,
            cold_precipitation_threshold: options.cold_precipitation_threshold,
            only_when_cold: options.only_when_cold,
            cold_temperature_threshold: options.cold_temperature_threshold,
            current_report: None,
            future_reports: Vec::new(),
        }
    }

    /// The one classification rule, shared by past, current, and future
    /// evaluation so thresholds can never diverge between them.
    fn is_snowy_enough(&self, report: &SnowReport) -> bool {
        let cold_and_precipitating = self
            .cold_precipitation_threshold
            .map(|threshold| report.temperature < threshold && report.has_precip)
            .unwrap_or(false);
        let snowy = report.has_snow || cold_and_precipitating;
        match (self.only_when_cold, self.cold_temperature_threshold) {
            (true, Some(threshold)) => snowy && report.temperature <= threshold,
            _ => snowy,
        }
    }

    /// The provider reports epoch seconds; the engine works in milliseconds.
    fn to_millis(forecast: SnowForecast) -> SnowForecast {
        SnowForecast {
            current: SnowReport {
                timestamp_millis: forecast.current.timestamp_millis * 1000,
                ..forecast.current
            },
            hourly: forecast
                .hourly
                .into_iter()
                .map(|hour| SnowReport {
                    timestamp_millis: hour.timestamp_millis * 1000,
                    ..hour
                })
                .collect(),
        }
    }

    /// Pull an updated forecast and fold the current observation into
    /// history.
    ///
    /// # Errors
    ///
    /// Fetch and lock failures are returned for the caller to log; the
    /// previous state stays untouched so stale-but-valid sensor values
    /// persist across transient outages.
    pub async fn update_prediction_status(&mut self) -> Result<(), EngineError> {
        let forecast = Self::to_millis(self.cache.get_forecast().await?);

        self.history.add_observation(forecast.current);
        self.current_report = Some(forecast.current);
        self.future_reports = forecast.hourly;

        debug!(values = ?self.get_snow_sense_values(), "prediction updated");
        Ok(())
    }

    /// Derive the current snapshot from history, the latest forecast, and
    /// the current report.
    pub fn get_snow_sense_values(&self) -> SnowSenseValues {
        let now = self.clock.now_millis();
        let snowing_now = self
            .current_report
            .as_ref()
            .map(|report| self.is_snowy_enough(report))
            .unwrap_or(false);

        let future = find_snowy_run(
            &self.future_reports,
            |report| self.is_snowy_enough(report),
            false,
            now,
        );
        let past_reports = self.history.reports();
        let past = find_snowy_run(
            &past_reports,
            |report| self.is_snowy_enough(report),
            true,
            now,
        );

        SnowSenseValues {
            snowing_now,
            // snowing now means "0 hours since last snow", whatever the
            // reverse scan said
            last_snow_time: if snowing_now {
                Some(0.0)
            } else {
                past.hours_until_start
            },
            past_consecutive_hours: past.consecutive_hours,
            next_snow_time: future.hours_until_start,
            future_consecutive_hours: future.consecutive_hours,
        }
    }

    /// Evaluate one sensor's thresholds against the current snapshot.
    pub fn snow_sensor_value(&self, config: &DeviceConfig) -> bool {
        let values = self.get_snow_sense_values();

        let enough_consecutive_future = values.future_consecutive_hours == 0.0
            || values.future_consecutive_hours >= config.consecutive_hours_future_is_snowy;
        let starting_soon = values
            .next_snow_time
            .map(|hours| hours <= config.hours_before_snow_is_snowy)
            .unwrap_or(false);
        let stopped_recently = values
            .last_snow_time
            .map(|hours| hours <= config.hours_after_snow_is_snowy)
            .unwrap_or(false);

        let result = values.snowing_now
            || (starting_soon && enough_consecutive_future)
            || stopped_recently;
        debug!(sensor = %config.display_name, result, "sensor evaluated");
        result
    }
}
