//! MiDaS backends in three sizes.

use std::fmt;
use std::str::FromStr;

use image::{imageops::FilterType, RgbImage};
use ort::session::Session;

use crate::error::Result;
use crate::image::{to_input_tensor, Preprocess, Resize, IMAGENET_MEAN, IMAGENET_STD};

use super::session::run_depth;
use super::{DepthEstimator, DepthField, Device, ModelCache, ModelFile};

/// MiDaS checkpoint size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MidasSize {
    /// MiDaS v2.1 small, 256x256 convolutional network.
    Small,
    /// DPT hybrid, 384x384.
    Base,
    /// DPT large, 384x384.
    #[default]
    Large,
}

impl MidasSize {
    /// Short lowercase name, as accepted on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Base => "base",
            Self::Large => "large",
        }
    }

    /// Model file for this size.
    #[must_use]
    pub const fn file(&self) -> ModelFile {
        match self {
            Self::Small => ModelFile::MidasSmall,
            Self::Base => ModelFile::DptHybrid,
            Self::Large => ModelFile::DptLarge,
        }
    }

    /// Preprocessing expected by this checkpoint.
    #[must_use]
    pub const fn preprocess(&self) -> Preprocess {
        match self {
            Self::Small => Preprocess {
                resize: Resize::Exact {
                    width: 256,
                    height: 256,
                },
                filter: FilterType::CatmullRom,
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
            Self::Base | Self::Large => Preprocess {
                resize: Resize::Exact {
                    width: 384,
                    height: 384,
                },
                filter: FilterType::CatmullRom,
                mean: [0.5; 3],
                std: [0.5; 3],
            },
        }
    }
}

impl fmt::Display for MidasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MidasSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "base" => Ok(Self::Base),
            "large" => Ok(Self::Large),
            other => Err(format!("unknown MiDaS size '{other}' (expected small, base or large)")),
        }
    }
}

/// MiDaS family depth estimator.
pub struct Midas {
    session: Session,
    size: MidasSize,
    preprocess: Preprocess,
}

impl Midas {
    /// Load the MiDaS checkpoint of `size` and bind it to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be fetched or loaded.
    pub fn load(cache: &ModelCache, device: Device, size: MidasSize) -> Result<Self> {
        tracing::info!("Loading MiDaS {size} model...");
        let session = cache.load_session(size.file(), device)?;
        tracing::info!("MiDaS {size} model loaded on {device}");

        Ok(Self {
            session,
            size,
            preprocess: size.preprocess(),
        })
    }
}

impl DepthEstimator for Midas {
    fn name(&self) -> &str {
        match self.size {
            MidasSize::Small => "MiDaS small",
            MidasSize::Base => "MiDaS base",
            MidasSize::Large => "MiDaS large",
        }
    }

    fn estimate(&mut self, image: &RgbImage) -> Result<DepthField> {
        let input = to_input_tensor(image, &self.preprocess);
        tracing::debug!("MiDaS input shape: {:?}", input.shape());

        run_depth(&mut self.session, input)
    }
}
