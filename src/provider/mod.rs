//! Forecast provider client: the seam between the pipelines and the
//! HTTP transport. Retry and response caching live behind this seam and are
//! opaque to the resolver and the snow job.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::{Coordinate, ForecastRequest};
use crate::Result;

pub mod open_meteo;

pub use open_meteo::OpenMeteoProvider;

/// Provider-returned bundle: a time-axis descriptor plus one named numeric
/// array per requested variable. The name→array mapping is constructed once
/// by the client immediately after each request, so index drift between the
/// request's variable order and the response cannot misattribute values.
#[derive(Debug, Clone, Default)]
pub struct VariableBlock {
    /// Axis start, epoch seconds (inclusive)
    pub start: i64,
    /// Axis end, epoch seconds (exclusive)
    pub end: i64,
    /// Step width in seconds
    pub interval: i64,
    pub series: HashMap<String, Vec<Option<f64>>>,
}

/// Normalized provider response for one model request.
#[derive(Debug, Clone, Default)]
pub struct RawModelResponse {
    /// Model identifier echoed back by the provider, when it echoes one.
    /// The provider may silently substitute a model at coordinates the
    /// requested one does not cover, so this is the correctness gate for
    /// "did I get what I asked for" — not the absence of an error.
    pub resolved_model: Option<String>,
    pub hourly: VariableBlock,
    pub daily: VariableBlock,
}

/// One hourly series with the provider's own ISO labels kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct HourlySeries {
    pub times: Vec<String>,
    pub values: Vec<Option<f64>>,
}

/// Outbound interface of both pipelines. Constructed once per process and
/// injected; implementations own their retry/caching behavior.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Full multi-variable forecast for the merged resolver.
    async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<RawModelResponse>;

    /// Hourly series of a single variable on a UTC axis, for the snow job.
    async fn fetch_hourly_series(
        &self,
        coordinate: Coordinate,
        variable: &str,
        forecast_days: u16,
        model: &str,
    ) -> Result<HourlySeries>;
}
