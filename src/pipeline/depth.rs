//! Main depth map generation pipeline.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::image::{self, GrayImage, RgbImage};
use crate::model::{DepthEstimator, Device, ModelCache, ModelKind};

use super::postprocess::{invert, normalize, quantize, resize_bilinear};

/// Configuration for the depth map pipeline.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Depth backend to run.
    pub model: ModelKind,

    /// Requested execution device. `None` auto-detects.
    pub device: Option<Device>,

    /// Invert polarity (white = far instead of white = near).
    pub invert: bool,
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loaded,
    Inferred,
    Normalized,
    Encoded,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Inferred => "inferred",
            Self::Normalized => "normalized",
            Self::Encoded => "encoded",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Main pipeline turning photos into depth maps.
pub struct Pipeline {
    config: Config,
    device: Device,
    estimator: Box<dyn DepthEstimator>,
    stage: Stage,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    ///
    /// Resolves the device once and loads the model, downloading it if it is
    /// not already cached. When auto-detecting, a device that fails to
    /// initialize is skipped in favour of the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unavailable or the model cannot be loaded.
    pub fn new(config: Config) -> Result<Self> {
        let candidates = Device::candidates(config.device)?;
        let cache = ModelCache::new()?;

        let (device, estimator) =
            Device::load_first(&candidates, |device| config.model.load(&cache, device))?;
        tracing::info!("Using device: {device}");

        Ok(Self::with_estimator(
            Config {
                device: Some(device),
                ..config
            },
            estimator,
        ))
    }

    /// Create a pipeline around an already loaded estimator.
    #[must_use]
    pub fn with_estimator(config: Config, estimator: Box<dyn DepthEstimator>) -> Self {
        let device = config.device.unwrap_or(Device::Cpu);

        Self {
            config,
            device,
            estimator,
            stage: Stage::Idle,
        }
    }

    /// Device the pipeline runs on.
    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    /// Last stage the pipeline reached.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    /// Estimate depth for an image and return the 8-bit depth map.
    ///
    /// The result always has the same dimensions as `rgb`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn generate(&mut self, rgb: &RgbImage) -> Result<GrayImage> {
        let (width, height) = rgb.dimensions();

        tracing::info!("Estimating depth with {}...", self.estimator.name());
        let raw = self.estimator.estimate(rgb)?;
        tracing::debug!("Model output {}x{}", raw.ncols(), raw.nrows());
        self.advance(Stage::Inferred);

        let field = resize_bilinear(normalize(raw), width, height);
        self.advance(Stage::Normalized);

        let mut depth_map = quantize(&field);
        if self.config.invert {
            invert(&mut depth_map);
        }

        Ok(depth_map)
    }

    /// Generate a depth map for the image at `input_path` and save it as PNG.
    ///
    /// Nothing is written unless every stage succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, inference or writing fails.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input_path: P,
        output_path: Q,
    ) -> Result<()> {
        let input_path = input_path.as_ref();

        self.stage = Stage::Idle;
        tracing::info!("Loading image: {}", input_path.display());

        let rgb = image::load_image(input_path)?;
        self.process_image(rgb, output_path)
    }

    /// Generate a depth map for an already loaded image and save it as PNG.
    ///
    /// The image is consumed; nothing is written unless every stage succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if inference, encoding or writing fails.
    pub fn process_image<Q: AsRef<Path>>(&mut self, rgb: RgbImage, output_path: Q) -> Result<()> {
        let output_path = output_path.as_ref();

        tracing::info!("Image loaded: {}x{}", rgb.width(), rgb.height());
        self.stage = Stage::Idle;
        self.advance(Stage::Loaded);

        let depth_map = self.generate(&rgb)?;
        drop(rgb);

        let bytes = image::encode_png(&depth_map)?;
        self.advance(Stage::Encoded);

        image::write_bytes(&bytes, output_path)?;
        tracing::info!("Depth map saved to: {}", output_path.display());
        self.advance(Stage::Done);

        Ok(())
    }
}
