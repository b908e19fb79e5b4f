//! Depth Anything V2 backend.

use image::{imageops::FilterType, RgbImage};
use ort::session::Session;

use crate::error::Result;
use crate::image::{to_input_tensor, Preprocess, Resize, IMAGENET_MEAN, IMAGENET_STD};

use super::session::run_depth;
use super::{DepthEstimator, DepthField, Device, ModelCache, ModelFile};

/// Patch size of the ViT encoder; input sides must be multiples of it.
const PATCH_SIZE: u32 = 14;

/// Target input size of the Depth Anything processor.
const INPUT_SIZE: u32 = 518;

/// Preprocessing used by Depth Anything V2.
pub const PREPROCESS: Preprocess = Preprocess {
    resize: Resize::KeepAspect {
        target: INPUT_SIZE,
        multiple: PATCH_SIZE,
    },
    filter: FilterType::CatmullRom,
    mean: IMAGENET_MEAN,
    std: IMAGENET_STD,
};

/// Transformer-based single image depth estimator.
pub struct DepthAnything {
    session: Session,
}

impl DepthAnything {
    /// Load Depth Anything V2 Small and bind it to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be fetched or loaded.
    pub fn load(cache: &ModelCache, device: Device) -> Result<Self> {
        tracing::info!("Loading Depth Anything V2 model...");
        let session = cache.load_session(ModelFile::DepthAnythingV2Small, device)?;
        tracing::info!("Depth Anything V2 model loaded on {device}");

        Ok(Self { session })
    }
}

impl DepthEstimator for DepthAnything {
    fn name(&self) -> &str {
        "Depth Anything V2"
    }

    fn estimate(&mut self, image: &RgbImage) -> Result<DepthField> {
        let input = to_input_tensor(image, &PREPROCESS);
        tracing::debug!("Depth Anything input shape: {:?}", input.shape());

        run_depth(&mut self.session, input)
    }
}
