use serde::{Deserialize, Serialize};

/// One hour's classified weather: everything needed to decide whether that
/// hour might be snowy.
///
/// Produced with `timestamp_millis` in whatever unit the upstream API uses
/// (seconds for OpenWeatherMap); the engine normalizes to milliseconds at
/// ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnowReport {
    pub timestamp_millis: i64,
    pub temperature: f64,
    pub has_snow: bool,
    pub has_precip: bool,
}

/// Snow reports for the current hour and each future forecast hour.
///
/// `hourly` is ordered ascending by timestamp and starts at or after
/// `current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowForecast {
    pub current: SnowReport,
    pub hourly: Vec<SnowReport>,
}

/// Units requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    /// The query-parameter value the weather API expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imperial => "imperial",
            Self::Metric => "metric",
            Self::Standard => "standard",
        }
    }
}

/// Forecast provider errors.
///
/// Auth, rate-limit, network, and parse failures are distinguishable so the
/// caller can log them precisely; the engine treats them all as transient.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited by weather API")]
    RateLimited,

    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No location found for ({0})")]
    LocationNotFound(String),
}

impl ForecastError {
    /// Map a non-success HTTP status to the matching error variant.
    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::InvalidApiKey,
            429 => Self::RateLimited,
            s => Self::Api {
                status: s,
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_units_as_str() {
        assert_eq!(Units::Imperial.as_str(), "imperial");
        assert_eq!(Units::Metric.as_str(), "metric");
        assert_eq!(Units::Standard.as_str(), "standard");
    }

    #[test]
    fn test_units_default_is_imperial() {
        assert_eq!(Units::default(), Units::Imperial);
    }

    #[test]
    fn test_snow_report_serializes_camel_case() {
        let report = SnowReport {
            timestamp_millis: 1_700_000_000_000,
            temperature: 28.5,
            has_snow: true,
            has_precip: true,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"timestampMillis\":1700000000000"));
        assert!(json.contains("\"hasSnow\":true"));
        assert!(json.contains("\"hasPrecip\":true"));
    }

    #[test]
    fn test_error_from_status() {
        assert!(matches!(
            ForecastError::from_status(reqwest::StatusCode::UNAUTHORIZED),
            ForecastError::InvalidApiKey
        ));
        assert!(matches!(
            ForecastError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            ForecastError::RateLimited
        ));
        assert!(matches!(
            ForecastError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            ForecastError::Api { status: 500, .. }
        ));
    }
}
