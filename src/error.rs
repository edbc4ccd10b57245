//! Error taxonomy for the inspection pipeline
//!
//! Building blocks return these errors; the pipeline layer turns them into
//! degraded record fields instead of passing them on.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, InspectError>;

#[derive(Debug, Error)]
pub enum InspectError {
    /// Image file exists but cannot be decoded
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Image could not be written
    #[error("failed to write image {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Filesystem access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Classifier never loaded or failed to load
    #[error("predictor unavailable: {0}")]
    PredictorUnavailable(String),

    /// Classifier was loaded but could not score the input
    #[error("inference failed: {0}")]
    Inference(String),

    /// History or settings file could not be encoded/decoded
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InspectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InspectError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        InspectError::Decode {
            path: path.into(),
            source,
        }
    }
}
