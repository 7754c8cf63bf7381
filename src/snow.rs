//! Snow accumulation extraction for the lakefront snow tail feed.
//!
//! One provider request per invocation: hourly snowfall only, which keeps the
//! payload small next to the merged resolver's broad variable set. Increments
//! arrive in centimeters; the feed publishes a running total in inches. A
//! missing increment counts as zero — snow does not catch up retroactively.

use chrono::Utc;
use tracing::info;

use crate::config::SnowConfig;
use crate::error::WxError;
use crate::models::{Coordinate, SnowAccumulationArtifact};
use crate::provider::{ForecastProvider, HourlySeries};
use crate::storage::BlobStore;
use crate::Result;

const CM_PER_INCH: f64 = 2.54;

/// Cache directive handed to the blob sink; consumers refresh roughly every
/// half hour.
pub const CACHE_CONTROL: &str = "public, max-age=1800";

/// Source tag recorded in the artifact.
pub const SOURCE: &str = "open-meteo";

/// Append a UTC marker to a label that lacks one. Idempotent.
fn utc_label(label: String) -> String {
    if label.ends_with('Z') {
        label
    } else {
        format!("{label}Z")
    }
}

/// Round at the point of emission only. Each emitted value is re-derived
/// from the full-precision running accumulator, so rounding error does not
/// compound.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Build the accumulation artifact from an hourly snowfall series (cm).
pub fn build_artifact(
    series: HourlySeries,
    model: &str,
    coordinate: Coordinate,
) -> Result<SnowAccumulationArtifact> {
    if series.times.len() != series.values.len() {
        return Err(WxError::data_integrity(format!(
            "hourly time/snowfall length mismatch: {} labels, {} values",
            series.times.len(),
            series.values.len()
        )));
    }

    let mut total_in = 0.0_f64;
    let mut snow_accum_in = Vec::with_capacity(series.values.len());
    for increment_cm in &series.values {
        total_in += increment_cm.unwrap_or(0.0) / CM_PER_INCH;
        snow_accum_in.push(round3(total_in));
    }

    Ok(SnowAccumulationArtifact {
        generated_at: Utc::now(),
        source: SOURCE.to_string(),
        model: model.to_string(),
        lat: coordinate.latitude,
        lon: coordinate.longitude,
        hours: series.times.into_iter().map(utc_label).collect(),
        snow_accum_in,
    })
}

/// Run the snow tail job end to end: one provider request, one object write.
pub async fn run(
    provider: &dyn ForecastProvider,
    store: &dyn BlobStore,
    config: &SnowConfig,
) -> Result<()> {
    let coordinate = Coordinate::new(config.lat, config.lon)?;
    let series = provider
        .fetch_hourly_series(coordinate, "snowfall", config.forecast_days, &config.model)
        .await?;

    let artifact = build_artifact(series, &config.model, coordinate)?;
    let hours = artifact.hours.len();
    let body = serde_json::to_vec(&artifact)
        .map_err(|e| WxError::storage(format!("artifact serialization failed: {e}")))?;

    store
        .put_json(&config.object_name, body, CACHE_CONTROL)
        .await?;
    info!(object = %config.object_name, hours, "snow tail artifact uploaded");
    Ok(())
}
