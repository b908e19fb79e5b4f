//! Image loading, preprocessing, and depth map saving utilities.

mod load;
mod save;

pub use load::{load_image, to_input_tensor, Preprocess, Resize};
pub use save::{default_output_path, encode_png, save_depth_map, write_bytes};

pub use ::image::{GrayImage, RgbImage};

use ndarray::Array4;

/// Model input tensor in NCHW format (batch, channels, height, width).
pub type InputTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// ImageNet channel means, used by most depth estimation backbones.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
