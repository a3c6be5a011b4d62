//! Forecast collaborator for SnowSense
//!
//! Resolves a configured location string to coordinates and produces
//! hourly snow reports from the OpenWeatherMap One Call API.

pub mod geocode;
pub mod provider;
pub mod types;

pub use geocode::Coordinates;
pub use provider::{OpenWeatherClient, ProviderOptions, SnowProvider};
pub use types::*;
