//! Error types for scene graph payloads and image intake.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type SceneGraphResult<T> = Result<T, SceneGraphError>;

/// Errors raised while validating payloads or accepting files.
#[derive(Debug, Error)]
pub enum SceneGraphError {
    /// Two objects in the same scene graph share an id.
    #[error("Duplicate object id '{id}' in scene graph")]
    DuplicateObjectId { id: String },

    /// An object was sent without an id.
    #[error("Object at index {index} has an empty id")]
    EmptyObjectId { index: usize },

    /// Bounding box values that cannot be placed on a canvas.
    #[error("Object '{id}' has invalid geometry: {message}")]
    InvalidGeometry { id: String, message: String },

    /// The processed image could not be decoded from base64.
    #[error("Processed image is not valid base64: {0}")]
    ImageDecode(#[from] base64::DecodeError),

    /// Intake was handed something that is not an image.
    #[error("{name} is not an image (detected {media_type})")]
    NotAnImage { name: String, media_type: String },

    /// Intake was handed a zero-length file.
    #[error("{name} is empty")]
    EmptyFile { name: String },

    /// Failed to read a file from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneGraphError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            id: id.into(),
            message: message.into(),
        }
    }
}
