//! Depth estimation backends.
//!
//! Every backend implements [`DepthEstimator`]; the pipeline only ever holds a
//! `Box<dyn DepthEstimator>` produced by [`ModelKind::load`].

mod depth_anything;
mod device;
mod loader;
mod midas;
mod session;

pub use depth_anything::DepthAnything;
pub use device::Device;
pub use loader::{ModelCache, ModelFile, CACHE_ENV};
pub use midas::{Midas, MidasSize};

use std::fmt;

use image::RgbImage;
use ndarray::Array2;

use crate::error::Result;

/// Raw model output, `(rows, cols)` at the model's native resolution.
pub type DepthField = Array2<f32>;

/// A loaded, device-bound depth model.
pub trait DepthEstimator {
    /// Human-readable model name for logging.
    fn name(&self) -> &str;

    /// Run one forward pass over `image`.
    ///
    /// The returned field's resolution is whatever the model produces and is
    /// not guaranteed to match the image.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn estimate(&mut self, image: &RgbImage) -> Result<DepthField>;
}

/// Selectable depth backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// Depth Anything V2 (transformer).
    #[default]
    DepthAnythingV2,
    /// MiDaS of the given size.
    Midas(MidasSize),
}

impl ModelKind {
    /// Load the backend and bind it to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be fetched or the session cannot be built.
    pub fn load(self, cache: &ModelCache, device: Device) -> Result<Box<dyn DepthEstimator>> {
        let estimator: Box<dyn DepthEstimator> = match self {
            Self::DepthAnythingV2 => Box::new(DepthAnything::load(cache, device)?),
            Self::Midas(size) => Box::new(Midas::load(cache, device, size)?),
        };
        Ok(estimator)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthAnythingV2 => f.write_str("Depth Anything V2"),
            Self::Midas(size) => write!(f, "MiDaS {size}"),
        }
    }
}
