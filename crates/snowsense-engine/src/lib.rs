//! Snow prediction engine for SnowSense
//!
//! Combines a throttled live forecast with a rolling 24-hour record of
//! observed conditions, then answers per-sensor threshold queries like
//! "snowy if snow starts within 3h, stopped within 3h, or persists 2
//! consecutive hours". One engine instance watches one location.

pub mod cache;
pub mod clock;
pub mod error;
pub mod history;
pub mod watch;
pub mod window;

pub use cache::ForecastCache;
pub use clock::{Clock, SystemClock};
pub use error::EngineError;
pub use history::{HistoryStore, HISTORY_FILE};
pub use watch::{DeviceConfig, SnowSenseValues, SnowWatch, SnowWatchOptions};
pub use window::{find_snowy_run, SnowyRun};
