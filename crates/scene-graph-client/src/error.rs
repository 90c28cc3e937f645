//! Error types for the analysis client and configuration.

use std::path::PathBuf;
use thiserror::Error;

use scene_graph_core::SceneGraphError;

/// Result type for analysis calls.
pub type AnalysisCallResult<T> = Result<T, AnalysisError>;

/// Errors that can occur while calling the analysis service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request could not be sent or the response could not be read.
    #[error("Request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("Analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a valid analysis payload.
    #[error("Failed to decode analysis response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload parsed but failed validation.
    #[error("Invalid analysis payload: {0}")]
    Payload(#[from] SceneGraphError),

    /// The configured media type could not be attached to the upload.
    #[error("Invalid media type '{media_type}' for upload")]
    MediaType { media_type: String },
}

impl AnalysisError {
    /// Create a network error for an endpoint.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AnalysisError::Status { status, .. } => Some(*status),
            AnalysisError::Network { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading, editing or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown configuration key.
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// A value that does not fit its key.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// IO error reading or writing the config file.
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No config directory could be determined for this platform.
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
