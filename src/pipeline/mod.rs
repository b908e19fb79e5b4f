//! Depth map generation pipeline.

mod depth;
mod postprocess;

pub use depth::{Config, Pipeline, Stage};
pub use postprocess::{invert, normalize, quantize, resize_bilinear};
