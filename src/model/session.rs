//! Shared ONNX Runtime inference helpers for depth backends.

use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::InputTensor;

use super::DepthField;

/// Run a single-input depth model and extract its depth field.
///
/// # Errors
///
/// Returns an error if inference fails or the output is not a single 2D map.
pub(crate) fn run_depth(session: &mut Session, input: InputTensor) -> Result<DepthField> {
    let input_value = Tensor::from_array(input).map_err(|source| Error::Inference { source })?;

    let outputs = session
        .run(ort::inputs![input_value])
        .map_err(|source| Error::Inference { source })?;

    // Get first output
    let output = outputs
        .values()
        .next()
        .ok_or_else(|| Error::ShapeMismatch {
            expected: "predicted_depth output".to_string(),
            actual: "no output".to_string(),
        })?;

    let (shape_info, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    let dims: Vec<i64> = shape_info.iter().copied().collect();
    field_from_raw(&dims, data)
}

/// Build a depth field from a raw tensor of shape `(H, W)`, `(1, H, W)` or `(1, 1, H, W)`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub(crate) fn field_from_raw(dims: &[i64], data: &[f32]) -> Result<DepthField> {
    let mismatch = || Error::ShapeMismatch {
        expected: "(H, W), (1, H, W) or (1, 1, H, W) depth map".to_string(),
        actual: format!("{dims:?}"),
    };

    if !(2..=4).contains(&dims.len()) || dims.iter().any(|&d| d <= 0) {
        return Err(mismatch());
    }

    let (batch, map) = dims.split_at(dims.len() - 2);
    if batch.iter().any(|&d| d != 1) {
        return Err(mismatch());
    }

    // Safe: all dimensions checked positive above
    let (rows, cols) = (map[0] as usize, map[1] as usize);

    Array2::from_shape_vec((rows, cols), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{} values", rows * cols),
        actual: format!("{} values", data.len()),
    })
}
