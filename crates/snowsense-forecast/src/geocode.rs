//! Forward geocoding: convert a configured location string to coordinates.
//! Uses the OpenWeatherMap geocoding API with the same key as the forecast.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::types::ForecastError;

/// A latitude-longitude pair resolved from the configured location.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Resolve a location string to coordinates.
///
/// Accepts three forms: a "lat,lon" pair (used as-is, no network), a
/// five-digit zip code, or a "city,state,country" name looked up through the
/// geocoding API.
///
/// # Errors
///
/// [`ForecastError::LocationNotFound`] when the API has no match, plus the
/// usual auth/rate-limit/network variants.
pub async fn resolve_location(
    client: &Client,
    base: &Url,
    api_key: &str,
    location: &str,
) -> Result<Coordinates, ForecastError> {
    if let Some(coords) = parse_lat_lon(location) {
        return Ok(coords);
    }
    if is_zip_code(location) {
        return location_from_zip(client, base, api_key, location).await;
    }
    location_from_city(client, base, api_key, location).await
}

/// Parse a "lat,lon" pair, e.g. "40.7143,-74.006".
fn parse_lat_lon(location: &str) -> Option<Coordinates> {
    let (lat, lon) = location.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    Some(Coordinates { lat, lon })
}

/// Five digits, nothing else.
fn is_zip_code(location: &str) -> bool {
    location.len() == 5 && location.bytes().all(|b| b.is_ascii_digit())
}

async fn location_from_zip(
    client: &Client,
    base: &Url,
    api_key: &str,
    zip: &str,
) -> Result<Coordinates, ForecastError> {
    tracing::debug!("Geocoding zip {}", zip);
    let url = endpoint(base, "geo/1.0/zip", &[("zip", zip), ("appid", api_key)])?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ForecastError::LocationNotFound(zip.to_string()));
    }
    if !status.is_success() {
        return Err(ForecastError::from_status(status));
    }
    response
        .json::<Coordinates>()
        .await
        .map_err(|e| ForecastError::Parse(e.to_string()))
}

async fn location_from_city(
    client: &Client,
    base: &Url,
    api_key: &str,
    city: &str,
) -> Result<Coordinates, ForecastError> {
    tracing::debug!("Geocoding city {}", city);
    let url = endpoint(
        base,
        "geo/1.0/direct",
        &[("q", city), ("limit", "1"), ("appid", api_key)],
    )?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ForecastError::from_status(status));
    }
    let places: Vec<Coordinates> = response
        .json()
        .await
        .map_err(|e| ForecastError::Parse(e.to_string()))?;
    places
        .first()
        .copied()
        .ok_or_else(|| ForecastError::LocationNotFound(city.to_string()))
}

pub(crate) fn endpoint(
    base: &Url,
    path: &str,
    params: &[(&str, &str)],
) -> Result<Url, ForecastError> {
    let mut url = base
        .join(path)
        .map_err(|e| ForecastError::Parse(e.to_string()))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
}
