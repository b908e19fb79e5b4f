//! Custom error types for parallax-depth.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Device;

/// Main error type for the parallax-depth library.
#[derive(Error, Debug)]
pub enum Error {
    /// The input image does not exist.
    #[error("image not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Failed to decode an image file.
    #[error("failed to load image from {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The image decoded to zero pixels.
    #[error("image {} has no pixels", path.display())]
    EmptyImage { path: PathBuf },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// The requested execution device is not available in this build or on this machine.
    #[error("device {device} is not available")]
    DeviceUnavailable { device: Device },

    /// Failed to create or write the model cache.
    #[error("model cache error at {}: {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Failed to encode the depth map.
    #[error("failed to encode depth map: {source}")]
    ImageEncode {
        #[source]
        source: image::ImageError,
    },

    /// Failed to write the depth map.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse failure categories reported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input path missing.
    NotFound,
    /// Unreadable or corrupt image.
    Decode,
    /// Weight fetch or initialization failure, unsupported device.
    ModelLoad,
    /// Failure during the forward pass.
    Inference,
    /// Output write failure.
    Io,
}

impl Error {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ImageLoad { .. } | Self::EmptyImage { .. } => ErrorKind::Decode,
            Self::ModelDownload { .. }
            | Self::ModelLoad { .. }
            | Self::DeviceUnavailable { .. }
            | Self::CacheDir { .. } => ErrorKind::ModelLoad,
            Self::Inference { .. } | Self::ShapeMismatch { .. } => ErrorKind::Inference,
            Self::ImageEncode { .. } | Self::OutputWrite { .. } => ErrorKind::Io,
        }
    }
}

/// Result type alias for parallax-depth operations.
pub type Result<T> = std::result::Result<T, Error>;
