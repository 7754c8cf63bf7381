//! Open-Meteo HTTP client.
//!
//! Wraps a retrying `reqwest` client plus the persistent response cache, and
//! normalizes wire payloads into descriptor-form [`RawModelResponse`]s: the
//! explicit epoch axis of the JSON transport is collapsed into a
//! `(start, end, interval)` triple (validating even spacing) and the variable
//! arrays are keyed by name exactly once, right after the request.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::cache::PersistentCache;
use crate::config::ProviderConfig;
use crate::error::WxError;
use crate::models::{Coordinate, ForecastRequest, ModelChoice};
use crate::provider::{ForecastProvider, HourlySeries, RawModelResponse, VariableBlock};
use crate::Result;

/// Hourly variables requested for the merged forecast, mirroring the full
/// set the dashboard was built around. The output table tracks a subset.
pub const HOURLY_VARIABLES: [&str; 21] = [
    "temperature_2m",
    "apparent_temperature",
    "precipitation",
    "precipitation_probability",
    "snowfall",
    "snow_depth",
    "rain",
    "showers",
    "weather_code",
    "cloud_cover",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
    "thunderstorm_probability",
    "rain_probability",
    "snowfall_probability",
    "freezing_rain_probability",
    "ice_pellets_probability",
];

/// Daily variables requested for the merged forecast.
pub const DAILY_VARIABLES: [&str; 4] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "sunrise",
    "sunset",
];

/// Build the process-wide HTTP client: bounded per-request timeout plus
/// transient-fault retries. Reused across invocations.
pub fn http_client(config: &ProviderConfig) -> Result<ClientWithMiddleware> {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| WxError::config(format!("Failed to build HTTP client: {e}")))?;
    Ok(ClientBuilder::new(http)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

pub struct OpenMeteoProvider {
    http: ClientWithMiddleware,
    cache: Option<PersistentCache>,
    cache_ttl: Duration,
    base_url: String,
    preferred_model: String,
    fallback_model: String,
    timezone: String,
}

impl OpenMeteoProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            cache: None,
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            preferred_model: config.preferred_model.clone(),
            fallback_model: config.fallback_model.clone(),
            timezone: config.timezone.clone(),
        })
    }

    /// Attach a persistent response cache. Requests with identical URLs are
    /// answered from the cache within its TTL.
    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn model_id(&self, choice: ModelChoice) -> &str {
        match choice {
            ModelChoice::Preferred => &self.preferred_model,
            ModelChoice::Fallback => &self.fallback_model,
        }
    }

    async fn get_payload(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(url).await? {
                return Ok(payload);
            }
        }

        debug!(%url, "requesting forecast data");
        let response = self.http.get(url).send().await?;
        let response = response.error_for_status()?;
        let payload = response.bytes().await?.to_vec();

        if let Some(cache) = &self.cache {
            cache.put(url, payload.clone(), self.cache_ttl).await?;
        }
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<RawModelResponse> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&hourly={}&daily={}&models={}&timezone={}\
             &wind_speed_unit=mph&precipitation_unit=inch&temperature_unit=fahrenheit\
             &timeformat=unixtime",
            self.base_url,
            request.coordinate.latitude,
            request.coordinate.longitude,
            HOURLY_VARIABLES.join(","),
            DAILY_VARIABLES.join(","),
            self.model_id(request.model),
            self.timezone,
        );

        let payload = self.get_payload(&url).await?;
        let wire: WireForecast = serde_json::from_slice(&payload)
            .map_err(|e| WxError::upstream(format!("malformed forecast payload: {e}")))?;

        let hourly = wire
            .hourly
            .ok_or_else(|| WxError::data_integrity("forecast payload has no hourly block"))?;
        let daily = wire
            .daily
            .ok_or_else(|| WxError::data_integrity("forecast payload has no daily block"))?;

        Ok(RawModelResponse {
            resolved_model: wire.model,
            hourly: descriptor_block(hourly, HOURLY_STEP_SECONDS)?,
            daily: descriptor_block(daily, DAILY_STEP_SECONDS)?,
        })
    }

    async fn fetch_hourly_series(
        &self,
        coordinate: Coordinate,
        variable: &str,
        forecast_days: u16,
        model: &str,
    ) -> Result<HourlySeries> {
        let url = format!(
            "{}/{}?latitude={}&longitude={}&hourly={}&timezone=UTC&forecast_days={}",
            self.base_url, model, coordinate.latitude, coordinate.longitude, variable, forecast_days,
        );

        let payload = self.get_payload(&url).await?;
        let wire: WireHourlyOnly = serde_json::from_slice(&payload)
            .map_err(|e| WxError::upstream(format!("malformed hourly payload: {e}")))?;

        let mut block = wire.hourly.unwrap_or_default();
        Ok(HourlySeries {
            times: block.time,
            values: block.series.remove(variable).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireForecast {
    model: Option<String>,
    hourly: Option<WireEpochBlock>,
    daily: Option<WireEpochBlock>,
}

/// Forecast block on a `timeformat=unixtime` axis.
#[derive(Debug, Deserialize)]
struct WireEpochBlock {
    time: Vec<i64>,
    #[serde(flatten)]
    series: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct WireHourlyOnly {
    hourly: Option<WireLabelBlock>,
}

/// Hourly block on the default ISO-label axis.
#[derive(Debug, Default, Deserialize)]
struct WireLabelBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(flatten)]
    series: HashMap<String, Vec<Option<f64>>>,
}

/// Nominal axis steps, used when a block carries a single point and so
/// cannot state its own interval (a one-day daily block, for instance).
const HOURLY_STEP_SECONDS: i64 = 3600;
const DAILY_STEP_SECONDS: i64 = 86_400;

/// Collapse an explicit epoch axis into its `(start, end, interval)`
/// descriptor, rejecting irregular spacing. A single-point axis adopts
/// `default_interval`; an empty axis is a fault.
fn descriptor_block(block: WireEpochBlock, default_interval: i64) -> Result<VariableBlock> {
    let time = &block.time;
    let Some(&start) = time.first() else {
        return Err(WxError::data_integrity("empty time axis"));
    };
    if time.len() == 1 {
        return Ok(VariableBlock {
            start,
            end: start + default_interval,
            interval: default_interval,
            series: block.series,
        });
    }

    let interval = time[1] - time[0];
    if interval <= 0 {
        return Err(WxError::data_integrity(format!(
            "non-increasing axis: step of {interval}s"
        )));
    }
    for window in time.windows(2) {
        if window[1] - window[0] != interval {
            return Err(WxError::data_integrity(format!(
                "irregular axis: expected {interval}s steps, found {}s",
                window[1] - window[0]
            )));
        }
    }

    Ok(VariableBlock {
        start,
        end: time[time.len() - 1] + interval,
        interval,
        series: block.series,
    })
}
