use snowsense_forecast::ForecastError;
use thiserror::Error;

/// Errors surfaced by the prediction engine.
///
/// Both variants are transient: the caller keeps its previous sensor state
/// and retries on its next timer tick.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The upstream fetch failed (auth, rate limit, network, parse).
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Another caller held the fetch lock for the whole wait window.
    /// Contention, not an application fault.
    #[error("weather fetch is locked")]
    FetchLocked,
}
