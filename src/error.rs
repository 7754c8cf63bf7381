//! Error types and handling for the `lakewx` backend

use thiserror::Error;

/// Main error type for the `lakewx` backend
#[derive(Error, Debug)]
pub enum WxError {
    /// Bad or missing caller input; surfaces as a 4xx response
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    /// Provider request failed after the client's own retries were exhausted
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// A variable array disagrees with the reconstructed time axis.
    /// Never repaired silently; repair could misalign unrelated variables.
    #[error("Data integrity fault: {message}")]
    DataIntegrity { message: String },

    /// Blob store write failed or no destination is configured
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Provider response cache errors
    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl WxError {
    /// Create a new invalid-coordinate error
    pub fn invalid_coordinate<S: Into<String>>(message: S) -> Self {
        Self::InvalidCoordinate {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a new data-integrity error
    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault rather than ours or upstream's
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, WxError::InvalidCoordinate { .. })
    }
}

impl From<reqwest::Error> for WxError {
    fn from(err: reqwest::Error) -> Self {
        WxError::upstream(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for WxError {
    fn from(err: reqwest_middleware::Error) -> Self {
        WxError::upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let coord_err = WxError::invalid_coordinate("lat out of range");
        assert!(matches!(coord_err, WxError::InvalidCoordinate { .. }));

        let upstream_err = WxError::upstream("connection failed");
        assert!(matches!(upstream_err, WxError::Upstream { .. }));

        let integrity_err = WxError::data_integrity("short array");
        assert!(matches!(integrity_err, WxError::DataIntegrity { .. }));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(WxError::invalid_coordinate("x").is_client_error());
        assert!(!WxError::upstream("x").is_client_error());
        assert!(!WxError::data_integrity("x").is_client_error());
        assert!(!WxError::storage("x").is_client_error());
    }

    #[test]
    fn test_error_messages() {
        let err = WxError::invalid_coordinate("Missing or invalid lat/lng parameters");
        assert!(err.to_string().contains("lat/lng"));

        let err = WxError::data_integrity("snowfall has 10 values for 12 timestamps");
        assert!(err.to_string().starts_with("Data integrity fault"));
    }
}
