//! # `parallax-depth`
//!
//! Generate grayscale depth maps from single photos, for lock screen style
//! parallax effects.
//!
//! A monocular depth model (Depth Anything V2 or MiDaS, run through ONNX
//! Runtime) estimates relative depth, which is normalized, resampled to the
//! photo's size and written as an 8-bit PNG where white is near.
//!
//! ## Example
//!
//! ```no_run
//! use parallax_depth::{Config, Pipeline};
//!
//! # fn main() -> parallax_depth::Result<()> {
//! let config = Config::default();
//! let mut pipeline = Pipeline::new(config)?;
//!
//! pipeline.process("photo.jpg", "photo_depth.png")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, ErrorKind, Result};
pub use model::{DepthEstimator, DepthField, Device, MidasSize, ModelKind};
pub use pipeline::{Config, Pipeline};
