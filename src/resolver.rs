//! Merged forecast resolution.
//!
//! The preferred model has finer resolution but limited coverage, and the
//! provider substitutes silently outside that coverage, so a successful
//! response is only trusted when its echoed identifier matches the request.
//! The selection runs as an explicit two-branch state machine: attempting
//! preferred → verified, or falling back with a recorded reason → the
//! fallback response is used unconditionally or the failure is surfaced.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::WxError;
use crate::models::{
    Coordinate, DailyRecord, ForecastRequest, HourlyRecord, MergedForecastResult, ModelChoice,
};
use crate::provider::{ForecastProvider, RawModelResponse};
use crate::timeseries::{assemble, TimeSeriesTable};
use crate::Result;

/// Hourly variables tracked in the merged output table.
const HOURLY_TABLE: [&str; 7] = [
    "temperature_2m",
    "apparent_temperature",
    "precipitation",
    "thunderstorm_probability",
    "cloud_cover",
    "wind_speed_10m",
    "wind_gusts_10m",
];

/// Daily variables tracked in the merged output table.
const DAILY_TABLE: [&str; 4] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "sunrise",
    "sunset",
];

/// Attempt state of the model selection machine.
#[derive(Debug)]
enum ModelAttempt {
    Preferred,
    FallingBack { reason: String },
}

pub struct MergedForecastResolver {
    provider: Arc<dyn ForecastProvider>,
    preferred_model: String,
    fallback_model: String,
    zone: Tz,
}

impl MergedForecastResolver {
    pub fn new(
        provider: Arc<dyn ForecastProvider>,
        preferred_model: impl Into<String>,
        fallback_model: impl Into<String>,
        zone: Tz,
    ) -> Self {
        Self {
            provider,
            preferred_model: preferred_model.into(),
            fallback_model: fallback_model.into(),
            zone,
        }
    }

    /// Resolve a merged forecast for a coordinate.
    ///
    /// At most two sequential provider requests are issued: the fallback
    /// decision depends on the preferred outcome. A failed or substituted
    /// preferred attempt is recovered locally; a failed fallback attempt is
    /// surfaced. Transient-fault retries of a single attempt belong to the
    /// provider client, not this resolver.
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> Result<MergedForecastResult> {
        let coordinate = Coordinate::new(latitude, longitude)?;

        let mut attempt = ModelAttempt::Preferred;
        let (response, model) = loop {
            match attempt {
                ModelAttempt::Preferred => {
                    let request = ForecastRequest {
                        coordinate,
                        model: ModelChoice::Preferred,
                    };
                    match self.provider.fetch_forecast(&request).await {
                        Ok(response) => match response.resolved_model.as_deref() {
                            Some(echoed) if echoed == self.preferred_model => {
                                debug!(model = echoed, "preferred model verified");
                                let model = echoed.to_string();
                                break (response, model);
                            }
                            Some(echoed) => {
                                attempt = ModelAttempt::FallingBack {
                                    reason: format!("provider substituted `{echoed}`"),
                                };
                            }
                            None => {
                                attempt = ModelAttempt::FallingBack {
                                    reason: "provider did not echo a model identifier".to_string(),
                                };
                            }
                        },
                        Err(err) => {
                            attempt = ModelAttempt::FallingBack {
                                reason: err.to_string(),
                            };
                        }
                    }
                }
                ModelAttempt::FallingBack { reason } => {
                    warn!(
                        preferred = %self.preferred_model,
                        fallback = %self.fallback_model,
                        %reason,
                        "preferred model unavailable, falling back"
                    );
                    let request = ForecastRequest {
                        coordinate,
                        model: ModelChoice::Fallback,
                    };
                    // Used unconditionally; a failure here is surfaced.
                    let response = self.provider.fetch_forecast(&request).await?;
                    let model = response
                        .resolved_model
                        .clone()
                        .unwrap_or_else(|| self.fallback_model.clone());
                    break (response, model);
                }
            }
        };

        self.tabulate(model, &response)
    }

    /// Assemble the retained response into the two aligned output tables.
    fn tabulate(&self, model: String, response: &RawModelResponse) -> Result<MergedForecastResult> {
        let hourly_table = assemble(&response.hourly, &HOURLY_TABLE)?;
        let daily_table = assemble(&response.daily, &DAILY_TABLE)?;

        Ok(MergedForecastResult {
            model,
            hourly: self.hourly_records(&hourly_table)?,
            daily: self.daily_records(&daily_table)?,
        })
    }

    fn hourly_records(&self, table: &TimeSeriesTable) -> Result<Vec<HourlyRecord>> {
        let temperature_2m = column(table, "temperature_2m")?;
        let apparent_temperature = column(table, "apparent_temperature")?;
        let precipitation = column(table, "precipitation")?;
        let thunderstorm_probability = column(table, "thunderstorm_probability")?;
        let cloud_cover = column(table, "cloud_cover")?;
        let wind_speed_10m = column(table, "wind_speed_10m")?;
        let wind_gusts_10m = column(table, "wind_gusts_10m")?;

        Ok(table
            .times()
            .iter()
            .enumerate()
            .map(|(i, time)| HourlyRecord {
                time: self.localize(*time),
                temperature_2m: temperature_2m[i],
                apparent_temperature: apparent_temperature[i],
                precipitation: precipitation[i],
                thunderstorm_probability: thunderstorm_probability[i],
                cloud_cover: cloud_cover[i],
                wind_speed_10m: wind_speed_10m[i],
                wind_gusts_10m: wind_gusts_10m[i],
            })
            .collect())
    }

    fn daily_records(&self, table: &TimeSeriesTable) -> Result<Vec<DailyRecord>> {
        let temp_max = column(table, "temperature_2m_max")?;
        let temp_min = column(table, "temperature_2m_min")?;
        let sunrise = column(table, "sunrise")?;
        let sunset = column(table, "sunset")?;

        Ok(table
            .times()
            .iter()
            .enumerate()
            .map(|(i, date)| DailyRecord {
                date: self.localize(*date),
                temp_max: temp_max[i],
                temp_min: temp_min[i],
                // epoch-second integers representing instants, not magnitudes
                sunrise: self.epoch_instant(sunrise[i]),
                sunset: self.epoch_instant(sunset[i]),
            })
            .collect())
    }

    /// Interpret a reconstructed timestamp in the forecast's named zone.
    /// The axis stays in that zone end to end; it is never silently
    /// reinterpreted as UTC downstream.
    fn localize(&self, time: DateTime<Utc>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.zone).fixed_offset()
    }

    fn epoch_instant(&self, value: Option<f64>) -> Option<DateTime<FixedOffset>> {
        value
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
            .map(|instant| self.localize(instant))
    }
}

fn column<'a>(table: &'a TimeSeriesTable, name: &str) -> Result<&'a [Option<f64>]> {
    table
        .column(name)
        .ok_or_else(|| WxError::data_integrity(format!("column `{name}` missing after assembly")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{HourlySeries, VariableBlock};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const HOURS: i64 = 3;

    fn hourly_block() -> VariableBlock {
        let mut series = HashMap::new();
        for name in HOURLY_TABLE {
            series.insert(
                name.to_string(),
                (0..HOURS).map(|i| Some(i as f64)).collect(),
            );
        }
        VariableBlock {
            start: 1_700_000_000,
            end: 1_700_000_000 + HOURS * 3600,
            interval: 3600,
            series,
        }
    }

    fn daily_block() -> VariableBlock {
        let mut series = HashMap::new();
        series.insert("temperature_2m_max".to_string(), vec![Some(34.0)]);
        series.insert("temperature_2m_min".to_string(), vec![Some(21.0)]);
        series.insert("sunrise".to_string(), vec![Some(1_700_020_000.0)]);
        series.insert("sunset".to_string(), vec![Some(1_700_055_000.0)]);
        VariableBlock {
            start: 1_700_000_000,
            end: 1_700_000_000 + 86_400,
            interval: 86_400,
            series,
        }
    }

    fn response(echoed: Option<&str>) -> RawModelResponse {
        RawModelResponse {
            resolved_model: echoed.map(str::to_string),
            hourly: hourly_block(),
            daily: daily_block(),
        }
    }

    /// Scripted provider that records which model each request targeted.
    struct FakeProvider {
        preferred: Result<RawModelResponse>,
        fallback: Result<RawModelResponse>,
        requests: Mutex<Vec<ModelChoice>>,
    }

    impl FakeProvider {
        fn new(preferred: Result<RawModelResponse>, fallback: Result<RawModelResponse>) -> Self {
            Self {
                preferred,
                fallback,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ModelChoice> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn clone_result(result: &Result<RawModelResponse>) -> Result<RawModelResponse> {
        match result {
            Ok(response) => Ok(response.clone()),
            Err(err) => Err(WxError::upstream(err.to_string())),
        }
    }

    #[async_trait]
    impl ForecastProvider for FakeProvider {
        async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<RawModelResponse> {
            self.requests.lock().unwrap().push(request.model);
            match request.model {
                ModelChoice::Preferred => clone_result(&self.preferred),
                ModelChoice::Fallback => clone_result(&self.fallback),
            }
        }

        async fn fetch_hourly_series(
            &self,
            _coordinate: Coordinate,
            _variable: &str,
            _forecast_days: u16,
            _model: &str,
        ) -> Result<HourlySeries> {
            unimplemented!("not used by the resolver")
        }
    }

    fn resolver(provider: FakeProvider) -> MergedForecastResolver {
        MergedForecastResolver::new(
            Arc::new(provider),
            "gfs_hrrr",
            "gfs_seamless",
            chrono_tz::America::New_York,
        )
    }

    #[tokio::test]
    async fn test_verified_preferred_model_is_used() {
        let provider = FakeProvider::new(
            Ok(response(Some("gfs_hrrr"))),
            Err(WxError::upstream("should not be called")),
        );
        let resolver = resolver(provider);

        let result = resolver.resolve(41.48, -81.81).await.unwrap();
        assert_eq!(result.model, "gfs_hrrr");
        assert_eq!(result.hourly.len(), HOURS as usize);
        assert_eq!(result.daily.len(), 1);
    }

    #[tokio::test]
    async fn test_silent_substitution_triggers_fallback() {
        let provider = FakeProvider::new(
            Ok(response(Some("gfs_seamless"))),
            Ok(response(Some("gfs_seamless"))),
        );
        let resolver = resolver(provider);

        let result = resolver.resolve(41.48, -81.81).await.unwrap();
        assert_eq!(result.model, "gfs_seamless");
    }

    #[tokio::test]
    async fn test_missing_echo_triggers_fallback() {
        let provider = FakeProvider::new(Ok(response(None)), Ok(response(None)));
        let resolver = resolver(provider);

        let result = resolver.resolve(41.48, -81.81).await.unwrap();
        // requested fallback identifier reported when nothing is echoed
        assert_eq!(result.model, "gfs_seamless");
    }

    #[tokio::test]
    async fn test_preferred_fault_recovers_via_fallback() {
        let provider = FakeProvider::new(
            Err(WxError::upstream("503 from provider")),
            Ok(response(Some("gfs_seamless"))),
        );
        let resolver = resolver(provider);

        let result = resolver.resolve(41.48, -81.81).await.unwrap();
        assert_eq!(result.model, "gfs_seamless");
    }

    #[tokio::test]
    async fn test_fallback_fault_is_surfaced() {
        let provider = FakeProvider::new(
            Err(WxError::upstream("preferred down")),
            Err(WxError::upstream("fallback down")),
        );
        let resolver = resolver(provider);

        let err = resolver.resolve(41.48, -81.81).await.unwrap_err();
        assert!(matches!(err, WxError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_invalid_coordinate_issues_no_request() {
        let provider = FakeProvider::new(
            Ok(response(Some("gfs_hrrr"))),
            Ok(response(Some("gfs_seamless"))),
        );
        let requests_probe = Arc::new(provider);
        let resolver = MergedForecastResolver::new(
            requests_probe.clone(),
            "gfs_hrrr",
            "gfs_seamless",
            chrono_tz::America::New_York,
        );

        let err = resolver.resolve(200.0, -81.81).await.unwrap_err();
        assert!(matches!(err, WxError::InvalidCoordinate { .. }));
        assert!(requests_probe.requests().is_empty());
    }

    #[tokio::test]
    async fn test_request_order_is_preferred_then_fallback() {
        let provider = Arc::new(FakeProvider::new(
            Ok(response(Some("ecmwf_ifs025"))),
            Ok(response(Some("gfs_seamless"))),
        ));
        let resolver = MergedForecastResolver::new(
            provider.clone(),
            "gfs_hrrr",
            "gfs_seamless",
            chrono_tz::America::New_York,
        );

        resolver.resolve(41.48, -81.81).await.unwrap();
        assert_eq!(
            provider.requests(),
            vec![ModelChoice::Preferred, ModelChoice::Fallback]
        );
    }

    #[tokio::test]
    async fn test_short_variable_array_is_fatal() {
        let mut bad = response(Some("gfs_hrrr"));
        bad.hourly
            .series
            .insert("precipitation".to_string(), vec![Some(0.0)]);
        let provider = FakeProvider::new(Ok(bad), Err(WxError::upstream("unused")));
        let resolver = resolver(provider);

        let err = resolver.resolve(41.48, -81.81).await.unwrap_err();
        assert!(matches!(err, WxError::DataIntegrity { .. }));
    }

    #[test]
    fn test_localize_keeps_the_named_zone() {
        let provider = FakeProvider::new(
            Ok(response(Some("gfs_hrrr"))),
            Err(WxError::upstream("unused")),
        );
        let resolver = resolver(provider);

        // 2023-11-14T22:13:20Z is 17:13:20 -05:00 in America/New_York
        let instant = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let local = resolver.localize(instant);
        assert_eq!(local.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(local.timestamp(), instant.timestamp());
    }
}
