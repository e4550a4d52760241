//! Utility functions for image regions and coordinate conversion.

pub mod image_conversion;

use crate::keypoints::FaceBox;
use opencv::core::Rect;

/// Clamp and convert f32 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamped before the cast
#[allow(clippy::cast_precision_loss)]
pub fn clamp_to_i32(value: f32, min: i32, max: i32) -> i32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min as f32, max as f32) as i32
}

/// Square crop around a face box for landmark detection.
///
/// The box is grown by `shift` of its size on every side, squared off and
/// kept inside the frame. Returns `None` when the result would be empty.
#[must_use]
pub fn face_roi(face: &FaceBox, max_width: i32, max_height: i32, shift: f32) -> Option<Rect> {
    if max_width <= 0 || max_height <= 0 {
        return None;
    }

    let x_shift = clamp_to_i32(face.width * shift, 0, max_width);
    let y_shift = clamp_to_i32(face.height * shift, 0, max_height);

    let x = (clamp_to_i32(face.x, 0, max_width) - x_shift).max(0);
    let y = (clamp_to_i32(face.y, 0, max_height) - y_shift).max(0);
    let width = (clamp_to_i32(face.width, 0, max_width) + 2 * x_shift).min(max_width - x);
    let height = (clamp_to_i32(face.height, 0, max_height) + 2 * y_shift).min(max_height - y);

    // Make it square, limited by the smaller frame dimension
    let side = width.max(height).min(max_width).min(max_height);
    if side <= 0 {
        return None;
    }

    let x = x.min(max_width - side);
    let y = y.min(max_height - side);

    Some(Rect::new(x, y, side, side))
}
