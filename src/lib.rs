//! `lakewx` - lakefront weather backend
//!
//! This library provides the forecast acquisition-and-normalization pipeline
//! behind the lakefront weather page: merged multi-model forecast resolution
//! with a preferred/fallback chain, time-axis reconstruction of provider
//! variable blocks, and the snow accumulation feed written by the periodic
//! snow tail job.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod snow;
pub mod storage;
pub mod timeseries;
pub mod web;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use config::WxConfig;
pub use error::WxError;
pub use models::{Coordinate, MergedForecastResult, SnowAccumulationArtifact};
pub use resolver::MergedForecastResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WxError>;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
