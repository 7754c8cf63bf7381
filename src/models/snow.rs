//! Artifact written by the snow tail job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact time-indexed snow accumulation feed. Built once per job
/// invocation, handed to the blob sink, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowAccumulationArtifact {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub model: String,
    pub lat: f64,
    pub lon: f64,
    /// Hour labels, each carrying an explicit UTC marker
    pub hours: Vec<String>,
    /// Running accumulation in inches, non-decreasing
    pub snow_accum_in: Vec<f64>,
}
