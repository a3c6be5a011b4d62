//! Throttled, single-flight access to the upstream forecast fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use snowsense_forecast::{SnowForecast, SnowProvider};

use crate::clock::Clock;
use crate::error::EngineError;

/// Never hit the upstream more often than every 5 minutes.
const MIN_THROTTLE_MILLIS: i64 = 5 * 60 * 1000;
const DEFAULT_THROTTLE_MINUTES: u32 = 15;
/// How long a caller waits for an in-flight fetch before failing fast.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Default)]
struct CacheSlot {
    forecast: Option<SnowForecast>,
    fetched_at_millis: i64,
}

/// Serializes upstream fetches and rate-limits them.
///
/// Concurrent callers collapse into one upstream call: whoever acquires the
/// lock fetches, everyone else waits and then observes the fresh cached
/// result. A caller that waits out the whole lock window gets
/// [`EngineError::FetchLocked`] and is expected to retry on its own
/// schedule.
pub struct ForecastCache {
    provider: Arc<dyn SnowProvider>,
    clock: Arc<dyn Clock>,
    slot: Mutex<CacheSlot>,
    throttle_millis: i64,
    lock_timeout: Duration,
}

impl ForecastCache {
    pub fn new(
        provider: Arc<dyn SnowProvider>,
        clock: Arc<dyn Clock>,
        api_throttle_minutes: Option<u32>,
    ) -> Self {
        let minutes = i64::from(api_throttle_minutes.unwrap_or(DEFAULT_THROTTLE_MINUTES));
        Self {
            provider,
            clock,
            slot: Mutex::new(CacheSlot::default()),
            throttle_millis: (minutes * 60 * 1000).max(MIN_THROTTLE_MILLIS),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override the bounded lock wait (tests).
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Return the cached forecast when it is younger than the throttle
    /// window, otherwise fetch a fresh one.
    ///
    /// # Errors
    ///
    /// [`EngineError::FetchLocked`] after the bounded wait for a concurrent
    /// fetch, or the provider's own error, which is propagated without
    /// internal retries.
    pub async fn get_forecast(&self) -> Result<SnowForecast, EngineError> {
        let mut slot = timeout(self.lock_timeout, self.slot.lock())
            .await
            .map_err(|_| EngineError::FetchLocked)?;

        let now = self.clock.now_millis();
        if let Some(forecast) = slot.forecast.as_ref() {
            if now - slot.fetched_at_millis < self.throttle_millis {
                debug!("Using cached weather");
                return Ok(forecast.clone());
            }
        }

        debug!("Fetching new weather");
        let forecast = self.provider.fetch_forecast().await?;
        slot.forecast = Some(forecast.clone());
        slot.fetched_at_millis = now;
        Ok(forecast)
    }
}
