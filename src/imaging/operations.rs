//! Array operations that make up the correction pipeline.
//!
//! Each step is a plain function over [`Image`] so it can be tested without
//! files or a decoder. [`ImageCorrector`](crate::correct::ImageCorrector)
//! strings them together in a fixed order: flip, clip, subtract.

use super::decoder::Image;
use crate::config::Orientation;
use ndarray::{ArrayView2, Axis};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("background shape {background:?} does not match image shape {image:?}")]
pub struct ShapeMismatch {
    /// `(rows, cols)` of the background.
    pub background: (usize, usize),
    /// `(rows, cols)` of the sample image.
    pub image: (usize, usize),
}

/// Apply the orientation flips, horizontal first, then vertical.
///
/// Returns a new standard-layout array; the input is untouched.
pub fn flip(image: ArrayView2<'_, f64>, orientation: Orientation) -> Image {
    let mut view = image;
    if orientation.flip_horizontal {
        view.invert_axis(Axis(1));
    }
    if orientation.flip_vertical {
        view.invert_axis(Axis(0));
    }
    view.as_standard_layout().into_owned()
}

/// Replace every negative intensity with zero. NaN is left as is.
pub fn clip_negative(image: &mut Image) {
    image.mapv_inplace(|v| if v < 0.0 { 0.0 } else { v });
}

/// Subtract `background` element-wise. Shapes must match exactly.
pub fn subtract_background(mut image: Image, background: &Image) -> Result<Image, ShapeMismatch> {
    if image.dim() != background.dim() {
        return Err(ShapeMismatch {
            background: background.dim(),
            image: image.dim(),
        });
    }
    image -= background;
    Ok(image)
}

/// Summary statistics of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStats {
    pub rows: usize,
    pub cols: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Shape plus min/max/mean over the finite samples.
///
/// An image with no finite samples reports NaN for all three.
pub fn stats(image: &Image) -> ImageStats {
    let (rows, cols) = image.dim();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in image.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        count += 1;
    }
    if count == 0 {
        return ImageStats {
            rows,
            cols,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
        };
    }
    ImageStats {
        rows,
        cols,
        min,
        max,
        mean: sum / count as f64,
    }
}
