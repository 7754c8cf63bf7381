//! Data model for the merged forecast pipeline.

use crate::error::WxError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Which model slot a provider request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChoice {
    /// High-resolution regional model, limited coverage
    Preferred,
    /// Globally-available blend used when the preferred model is unavailable
    Fallback,
}

/// Validated coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(WxError::invalid_coordinate(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(WxError::invalid_coordinate(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Immutable request value for a single provider call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub coordinate: Coordinate,
    pub model: ModelChoice,
}

/// One row of the merged hourly table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    pub time: DateTime<FixedOffset>,
    pub temperature_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub thunderstorm_probability: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_gusts_10m: Option<f64>,
}

/// One row of the merged daily table. Sunrise/sunset are instants, not
/// magnitudes, and are converted from the provider's epoch integers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: DateTime<FixedOffset>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub sunrise: Option<DateTime<FixedOffset>>,
    pub sunset: Option<DateTime<FixedOffset>>,
}

/// Result of one merged-forecast resolution, built fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct MergedForecastResult {
    /// Identifier of the model whose response was actually used
    pub model: String,
    pub hourly: Vec<HourlyRecord>,
    pub daily: Vec<DailyRecord>,
}
