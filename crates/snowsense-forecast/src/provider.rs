//! OpenWeatherMap-backed snow forecasts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;
use url::Url;

use crate::geocode::{self, Coordinates};
use crate::types::{ForecastError, SnowForecast, SnowReport, Units};

const API_BASE: &str = "https://api.openweathermap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Anything that can produce a [`SnowForecast`] for its fixed location.
#[async_trait]
pub trait SnowProvider: Send + Sync {
    /// Fetch the current conditions plus the hourly forecast.
    ///
    /// # Errors
    ///
    /// Any [`ForecastError`]; callers treat all of them as transient.
    async fn fetch_forecast(&self) -> Result<SnowForecast, ForecastError>;
}

/// Options for [`OpenWeatherClient`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// API key from <https://openweathermap.org/api>
    pub api_key: String,
    /// "lat,lon", a five-digit zip, or "city,state,country"
    pub location: String,
    pub units: Units,
    /// One Call API version, normally "2.5"
    pub api_version: String,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location: "New York,NY,US".to_string(),
            units: Units::Imperial,
            api_version: "2.5".to_string(),
        }
    }
}

/// Forecast client for the OpenWeatherMap One Call API.
///
/// The configured location is resolved to coordinates once, on first use,
/// and cached for the life of the client.
pub struct OpenWeatherClient {
    client: Client,
    base: Url,
    options: ProviderOptions,
    coordinates: OnceCell<Coordinates>,
}

impl OpenWeatherClient {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(options: ProviderOptions) -> Result<Self, ForecastError> {
        Self::with_base_url(options, API_BASE)
    }

    /// Point the client at a different API host (tests).
    ///
    /// # Errors
    ///
    /// Fails on an unparsable base URL or HTTP client construction failure.
    pub fn with_base_url(options: ProviderOptions, base: &str) -> Result<Self, ForecastError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base = Url::parse(base).map_err(|e| ForecastError::Parse(e.to_string()))?;
        Ok(Self {
            client,
            base,
            options,
            coordinates: OnceCell::new(),
        })
    }

    async fn coordinates(&self) -> Result<Coordinates, ForecastError> {
        self.coordinates
            .get_or_try_init(|| {
                geocode::resolve_location(
                    &self.client,
                    &self.base,
                    &self.options.api_key,
                    &self.options.location,
                )
            })
            .await
            .copied()
    }

    async fn fetch_raw(&self) -> Result<OneCallResponse, ForecastError> {
        let coords = self.coordinates().await?;
        let url = geocode::endpoint(
            &self.base,
            &format!("data/{}/onecall", self.options.api_version),
            &[
                ("lat", coords.lat.to_string().as_str()),
                ("lon", coords.lon.to_string().as_str()),
                ("appid", self.options.api_key.as_str()),
                ("units", self.options.units.as_str()),
                ("exclude", "minutely,alerts,daily"),
            ],
        )?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::from_status(status));
        }
        response
            .json()
            .await
            .map_err(|e| ForecastError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SnowProvider for OpenWeatherClient {
    async fn fetch_forecast(&self) -> Result<SnowForecast, ForecastError> {
        let raw = self.fetch_raw().await?;
        let forecast = SnowForecast {
            current: classify(&raw.current),
            hourly: raw.hourly.iter().map(classify).collect(),
        };

        let next_hours: Vec<String> = forecast
            .hourly
            .iter()
            .take(4)
            .map(|h| h.has_snow.to_string())
            .collect();
        tracing::debug!("Cur and 3 hours snow: {}", next_hours.join(","));

        Ok(forecast)
    }
}

/// One Call payload, trimmed to the fields SnowSense reads.
#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: RawHour,
    #[serde(default)]
    hourly: Vec<RawHour>,
}

#[derive(Debug, Deserialize)]
struct RawHour {
    /// Epoch seconds
    dt: i64,
    temp: f64,
    #[serde(default)]
    weather: Vec<RawCondition>,
}

/// Condition ids documented at <https://openweathermap.org/weather-conditions>
#[derive(Debug, Deserialize)]
struct RawCondition {
    id: u32,
}

fn classify(hour: &RawHour) -> SnowReport {
    // 6xx is the snow group; 2xx-6xx all carry precipitation
    let id = hour.weather.first().map(|w| w.id).unwrap_or(800);
    SnowReport {
        timestamp_millis: hour.dt,
        temperature: hour.temp,
        has_snow: (600..700).contains(&id),
        has_precip: (200..700).contains(&id),
    }
}
