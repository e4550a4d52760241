//! Image conversion utilities between `OpenCV` frames, model tensors and
//! `image` buffers.

use crate::{Error, Result};
use image::RgbImage;
use ndarray::Array4;
use opencv::core::{Mat, Scalar, Size, Vec3f, CV_32F, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// Memory layout expected by a model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// Batch, channels, height, width
    Nchw,
    /// Batch, height, width, channels
    Nhwc,
}

/// Per-pixel normalization: `(pixel - offset) / scale`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub offset: f32,
    pub scale: f32,
}

impl Normalization {
    /// Map [0, 255] to [0, 1]
    pub const UNIT: Self = Self {
        offset: 0.0,
        scale: 255.0,
    };

    /// Map [0, 255] to roughly [-1, 1]
    pub const CENTERED: Self = Self {
        offset: crate::constants::IMAGE_NORMALIZATION_OFFSET,
        scale: crate::constants::IMAGE_NORMALIZATION_SCALE,
    };

    #[must_use]
    pub fn apply(&self, pixel: f32) -> f32 {
        (pixel - self.offset) / self.scale
    }
}

/// Resize an image to exactly `width` x `height`
///
/// # Errors
///
/// Returns an error if `OpenCV` fails to resize the image
pub fn resize_to(image: &Mat, width: i32, height: i32) -> Result<Mat> {
    let mut resized = Mat::default();
    imgproc::resize(
        image,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;
    Ok(resized)
}

/// Convert a BGR 8-bit frame into a single-image RGB float tensor
///
/// # Errors
///
/// Returns an error if the image is empty or not 3-channel, or if colour
/// conversion fails
#[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
pub fn mat_to_tensor(image: &Mat, normalization: Normalization, layout: TensorLayout) -> Result<Array4<f32>> {
    let rows = image.rows();
    let cols = image.cols();
    if rows <= 0 || cols <= 0 || image.channels() != 3 {
        return Err(Error::InvalidInput(format!(
            "Expected a non-empty 3-channel image, got {}x{}x{}",
            rows,
            cols,
            image.channels()
        )));
    }

    let mut rgb_image = Mat::default();
    imgproc::cvt_color(image, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

    let mut float_image = Mat::default();
    rgb_image.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

    let (height, width) = (rows as usize, cols as usize);
    let mut array = match layout {
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, height, width)),
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, height, width, 3)),
    };

    for row in 0..rows {
        for col in 0..cols {
            let pixel = float_image.at_2d::<Vec3f>(row, col)?;
            let (r, c) = (row as usize, col as usize);
            for ch in 0..3 {
                let value = normalization.apply(pixel[ch]);
                match layout {
                    TensorLayout::Nchw => array[[0, ch, r, c]] = value,
                    TensorLayout::Nhwc => array[[0, r, c, ch]] = value,
                }
            }
        }
    }

    Ok(array)
}

/// Convert a BGR 8-bit frame into an RGB image buffer
///
/// # Errors
///
/// Returns an error if the frame is not `CV_8UC3` or its data cannot be read
#[allow(clippy::cast_sign_loss)]
pub fn mat_to_rgb_image(frame: &Mat) -> Result<RgbImage> {
    if frame.typ() != CV_8UC3 || frame.empty() {
        return Err(Error::InvalidInput(
            "Capture requires a non-empty 8-bit BGR frame".to_string(),
        ));
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let bytes = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width, height, bytes)
        .ok_or_else(|| Error::InvalidInput(format!("Frame buffer does not match {width}x{height} RGB")))
}

/// Convert an RGB image buffer back into a BGR 8-bit frame
///
/// # Errors
///
/// Returns an error if the image is empty or too large for `OpenCV`
pub fn rgb_image_to_mat(image: &RgbImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    let (Ok(cols), Ok(rows)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(Error::InvalidInput(format!("Image {width}x{height} is too large")));
    };
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidInput("Image is empty".to_string()));
    }

    let mut rgb = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
    rgb.data_bytes_mut()?.copy_from_slice(image.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}
