//! Image loading and model input preparation.

use std::path::Path;

use image::{imageops::FilterType, ImageReader, RgbImage};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{InputTensor, RGB_CHANNELS};

/// How an image is resized before it is fed to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Resize to a fixed input size, ignoring aspect ratio.
    Exact { width: u32, height: u32 },
    /// Scale toward `target` keeping the aspect ratio, with both sides rounded
    /// to a multiple of `multiple`.
    KeepAspect { target: u32, multiple: u32 },
}

impl Resize {
    /// Output `(width, height)` for an input of the given size.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match *self {
            Self::Exact { width, height } => (width, height),
            Self::KeepAspect { target, multiple } => {
                let target = f64::from(target);
                let mut scale_w = target / f64::from(width);
                let mut scale_h = target / f64::from(height);

                // Scale as little as possible
                if (1.0 - scale_w).abs() < (1.0 - scale_h).abs() {
                    scale_h = scale_w;
                } else {
                    scale_w = scale_h;
                }

                let multiple = f64::from(multiple.max(1));
                let constrain = |value: f64| -> u32 {
                    let rounded = (value / multiple).round().max(1.0) * multiple;
                    rounded as u32
                };

                (
                    constrain(scale_w * f64::from(width)),
                    constrain(scale_h * f64::from(height)),
                )
            }
        }
    }
}

/// Model-specific preprocessing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Preprocess {
    pub resize: Resize,
    pub filter: FilterType,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

/// Load an image from disk as an RGB buffer.
///
/// The format is detected from the file contents, falling back to the
/// extension. Grayscale, alpha, palette and 16-bit images are all converted to
/// 8-bit RGB.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the path does not exist, and
/// [`Error::ImageLoad`] or [`Error::EmptyImage`] if it cannot be decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }

    let load_err = |source: image::ImageError| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    };

    let img = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|err| load_err(err.into()))?
        .decode()
        .map_err(load_err)?;

    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(Error::EmptyImage {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!("Decoded {}x{} image", rgb.width(), rgb.height());

    Ok(rgb)
}

/// Convert an RGB image into a normalized NCHW tensor for a model.
///
/// The image is:
/// 1. Resized according to `preprocess.resize`
/// 2. Scaled from [0, 255] to [0, 1]
/// 3. Normalized per channel with `preprocess.mean` and `preprocess.std`
#[must_use]
pub fn to_input_tensor(img: &RgbImage, preprocess: &Preprocess) -> InputTensor {
    let (width, height) = preprocess.resize.output_size(img.width(), img.height());

    let resized = if (width, height) == img.dimensions() {
        img.clone()
    } else {
        image::imageops::resize(img, width, height, preprocess.filter)
    };

    let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, height as usize, width as usize));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..RGB_CHANNELS {
            let value = f32::from(pixel[c]) / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - preprocess.mean[c]) / preprocess.std[c];
        }
    }

    tensor
}
