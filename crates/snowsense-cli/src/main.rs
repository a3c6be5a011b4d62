//! SnowSense: watches a location's weather and reports, per configured
//! sensor, whether it should currently count as "snowy".

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info};

use config::SnowSenseConfig;
use snowsense_engine::{EngineError, SnowWatch, SnowWatchOptions, SystemClock};
use snowsense_forecast::{OpenWeatherClient, ProviderOptions};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let (config, validation) = SnowSenseConfig::load_validated()?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    info!(
        "Watching weather for {} ({} sensors)",
        config.location,
        config.sensors.len()
    );

    let provider = OpenWeatherClient::new(ProviderOptions {
        api_key: config.api_key.clone(),
        location: config.location.clone(),
        units: config.units,
        api_version: config.api_version.clone(),
    })?;

    let mut watch = SnowWatch::new(
        Arc::new(provider),
        Arc::new(SystemClock),
        SnowWatchOptions {
            api_throttle_minutes: Some(config.api_throttle_minutes),
            cold_precipitation_threshold: config.cold_precipitation_threshold,
            only_when_cold: config.only_when_cold,
            cold_temperature_threshold: config.cold_temperature_threshold,
            storage_path: config.storage_path.clone(),
            history_file: config.history_file.clone(),
        },
    );

    let tick = Duration::from_secs(u64::from(config.api_throttle_minutes.max(1)) * 60);
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                update_sensors(&mut watch, &config).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

async fn update_sensors(watch: &mut SnowWatch, config: &SnowSenseConfig) {
    match watch.update_prediction_status().await {
        Ok(()) => {}
        // contention from an overlapping refresh; the next tick retries
        Err(EngineError::FetchLocked) => {
            debug!("Forecast fetch already in flight, skipping this tick");
            return;
        }
        Err(e) => {
            error!("Error getting updated weather: {}", e);
            return;
        }
    }

    let values = watch.get_snow_sense_values();
    info!(
        snowing_now = values.snowing_now,
        last_snow_time = ?values.last_snow_time,
        next_snow_time = ?values.next_snow_time,
        future_consecutive_hours = values.future_consecutive_hours,
        "Prediction updated"
    );

    for sensor in &config.sensors {
        let snowy = watch.snow_sensor_value(sensor);
        info!("{}: {}", sensor.display_name, if snowy { "snowy" } else { "clear" });
    }
}
