//! Configuration management for the `lakewx` backend
//!
//! Handles loading configuration from an optional `config.toml`, environment
//! variable overrides, and provides validation for all settings. Defaults
//! match the production lakefront deployment (Lakewood, OH).

use crate::WxError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `lakewx` backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WxConfig {
    /// Forecast provider configuration
    pub provider: ProviderConfig,
    /// Web server configuration
    pub server: ServerConfig,
    /// Snow tail job configuration
    pub snow: SnowConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Forecast provider (Open-Meteo) client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the provider API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    /// Maximum retries of a single request inside the client
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
    /// Response cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Response cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// High-resolution regional model queried first
    #[serde(default = "default_preferred_model")]
    pub preferred_model: String,
    /// Globally-available blend queried when the preferred model is unavailable
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    /// Named time zone the hourly/daily axes are requested in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory the static client is served from
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Snow tail job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowConfig {
    /// Fixed latitude the feed is built for
    #[serde(default = "default_snow_lat")]
    pub lat: f64,
    /// Fixed longitude the feed is built for
    #[serde(default = "default_snow_lon")]
    pub lon: f64,
    /// Object name the artifact is written to
    #[serde(default = "default_object_name")]
    pub object_name: String,
    /// Forecast horizon in days
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u16,
    /// Model endpoint queried for the snowfall series
    #[serde(default = "default_snow_model")]
    pub model: String,
    /// Blob store base URL; required non-empty before the job runs
    #[serde(default)]
    pub blob_base_url: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_provider_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_provider_timeout() -> u64 {
    20
}

fn default_provider_max_retries() -> u32 {
    5
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_dir() -> String {
    ".lakewx-cache".to_string()
}

fn default_preferred_model() -> String {
    "gfs_hrrr".to_string()
}

fn default_fallback_model() -> String {
    "gfs_seamless".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_snow_lat() -> f64 {
    41.48
}

fn default_snow_lon() -> f64 {
    -81.81
}

fn default_object_name() -> String {
    "snow_tail.json".to_string()
}

fn default_forecast_days() -> u16 {
    7
}

fn default_snow_model() -> String {
    "gfs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WxConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                base_url: default_provider_base_url(),
                timeout_seconds: default_provider_timeout(),
                max_retries: default_provider_max_retries(),
                cache_ttl_seconds: default_cache_ttl(),
                cache_dir: default_cache_dir(),
                preferred_model: default_preferred_model(),
                fallback_model: default_fallback_model(),
                timezone: default_timezone(),
            },
            server: ServerConfig {
                port: default_port(),
                static_dir: default_static_dir(),
            },
            snow: SnowConfig {
                lat: default_snow_lat(),
                lon: default_snow_lon(),
                object_name: default_object_name(),
                forecast_days: default_forecast_days(),
                model: default_snow_model(),
                blob_base_url: String::new(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
        }
    }
}

impl WxConfig {
    /// Load configuration from `config.toml` (if present) and environment
    /// variables with the `LAKEWX_` prefix
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from a specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. LAKEWX_SNOW__BLOB_BASE_URL
        builder = builder.add_source(
            Environment::with_prefix("LAKEWX")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: WxConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds == 0 || self.provider.timeout_seconds > 300 {
            return Err(
                WxError::config("Provider timeout must be between 1 and 300 seconds").into(),
            );
        }

        if self.provider.max_retries > 10 {
            return Err(WxError::config("Provider max retries cannot exceed 10").into());
        }

        if !(-90.0..=90.0).contains(&self.snow.lat) {
            return Err(WxError::config("Snow job latitude must be within [-90, 90]").into());
        }

        if !(-180.0..=180.0).contains(&self.snow.lon) {
            return Err(WxError::config("Snow job longitude must be within [-180, 180]").into());
        }

        if self.snow.forecast_days == 0 || self.snow.forecast_days > 16 {
            return Err(WxError::config("Forecast horizon must be between 1 and 16 days").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WxError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(
                WxError::config("Provider base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        if self.provider.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(WxError::config(format!(
                "Unknown time zone '{}'",
                self.provider.timezone
            ))
            .into());
        }

        if self.snow.object_name.trim().is_empty() {
            return Err(WxError::config("Snow artifact object name cannot be empty").into());
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// The named zone the forecast axes are requested and reported in
    pub fn zone(&self) -> crate::Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| WxError::config(format!("Unknown time zone '{}'", self.timezone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WxConfig::default();
        assert_eq!(config.provider.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.provider.preferred_model, "gfs_hrrr");
        assert_eq!(config.provider.fallback_model, "gfs_seamless");
        assert_eq!(config.provider.timezone, "America/New_York");
        assert_eq!(config.snow.lat, 41.48);
        assert_eq!(config.snow.lon, -81.81);
        assert_eq!(config.snow.object_name, "snow_tail.json");
        assert_eq!(config.snow.forecast_days, 7);
        assert_eq!(config.snow.model, "gfs");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = WxConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = WxConfig::default();
        config.logging.level = "loud".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = WxConfig::default();
        config.provider.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout"));

        let mut config = WxConfig::default();
        config.snow.lat = 91.0;
        assert!(config.validate().is_err());

        let mut config = WxConfig::default();
        config.snow.forecast_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_timezone() {
        let mut config = WxConfig::default();
        config.provider.timezone = "America/Lakewood".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("time zone"));
    }

    #[test]
    fn test_zone_parses() {
        let config = WxConfig::default();
        let zone = config.provider.zone().unwrap();
        assert_eq!(zone, chrono_tz::America::New_York);
    }
}
