//! Depth field post-processing: normalization, resampling and quantization.

use image::{GrayImage, Luma};
use ndarray::Array2;

use crate::model::DepthField;

/// Rescale a depth field so its minimum maps to 0.0 and its maximum to 1.0.
///
/// A flat field (or one whose range is not finite) becomes all zeros.
#[must_use]
pub fn normalize(mut field: DepthField) -> DepthField {
    let (min, max) = field
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !range.is_finite() || range <= 0.0 {
        tracing::debug!("Flat depth field (min={min}, max={max}), emitting zeros");
        field.fill(0.0);
        return field;
    }

    field.mapv_inplace(|v| (v - min) / range);
    field
}

/// Bilinearly resample a field to `width` x `height`.
///
/// Samples at pixel centres and clamps at the borders. A field that already has
/// the requested size is returned unchanged.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn resize_bilinear(field: DepthField, width: u32, height: u32) -> DepthField {
    let (dst_h, dst_w) = (height as usize, width as usize);
    let (src_h, src_w) = field.dim();

    if (src_h, src_w) == (dst_h, dst_w) || src_h == 0 || src_w == 0 {
        return field;
    }

    let scale_y = src_h as f32 / dst_h as f32;
    let scale_x = src_w as f32 / dst_w as f32;

    // Source index pairs and weights per output column / row
    let axis = |dst: usize, src_len: usize, scale: f32| -> Vec<(usize, usize, f32)> {
        (0..dst)
            .map(|i| {
                let pos = ((i as f32 + 0.5) * scale - 0.5).max(0.0);
                let i0 = (pos.floor() as usize).min(src_len - 1);
                let i1 = (i0 + 1).min(src_len - 1);
                let t = (pos - i0 as f32).clamp(0.0, 1.0);
                (i0, i1, t)
            })
            .collect()
    };
    let rows = axis(dst_h, src_h, scale_y);
    let cols = axis(dst_w, src_w, scale_x);

    Array2::from_shape_fn((dst_h, dst_w), |(y, x)| {
        let (y0, y1, ty) = rows[y];
        let (x0, x1, tx) = cols[x];

        let top = field[[y0, x0]].mul_add(1.0 - tx, field[[y0, x1]] * tx);
        let bottom = field[[y1, x0]].mul_add(1.0 - tx, field[[y1, x1]] * tx);
        top.mul_add(1.0 - ty, bottom * ty)
    })
}

/// Quantize a normalized field to 8-bit: `round(v * 255)` clamped to [0, 255].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(field: &DepthField) -> GrayImage {
    let (rows, cols) = field.dim();

    // Safe: dimensions come from a u32-sized image
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = field[[y as usize, x as usize]];
        let byte = if value.is_nan() {
            0
        } else {
            (value * 255.0).round().clamp(0.0, 255.0) as u8
        };
        Luma([byte])
    })
}

/// Complement every pixel of a depth map in place (`255 - v`).
pub fn invert(depth_map: &mut GrayImage) {
    for pixel in depth_map.pixels_mut() {
        pixel[0] = u8::MAX - pixel[0];
    }
}
