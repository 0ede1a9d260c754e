//! Error types for the hazard engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HazardError {
    /// The capture device could not be opened (missing hardware, permissions, busy).
    #[error("unable to access camera: {0}")]
    Camera(String),

    /// An operation needed an active video source and there was none.
    #[error("no active video source")]
    NoSource,

    /// Uploaded video had no content.
    #[error("uploaded video '{0}' is empty")]
    EmptyUpload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type HazardResult<T> = Result<T, HazardError>;
