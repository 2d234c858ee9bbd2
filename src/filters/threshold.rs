//! Adaptive (local mean) thresholding.

use ndarray::{Array2, ArrayView2};

use super::core::BorderMode;
use crate::error::{FilterError, FilterResult};

/// Binarize `plane` against the mean of its `block_size x block_size`
/// neighborhood minus `offset`.
///
/// A pixel becomes `max_value` when `src > round(mean) - offset`, else 0.
/// The neighborhood mean uses replicated borders.
pub fn adaptive_threshold_mean(
    plane: ArrayView2<u8>,
    max_value: u8,
    block_size: usize,
    offset: f32,
) -> FilterResult<Array2<u8>> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(FilterError::invalid_parameter(format!(
            "adaptive threshold block size must be odd and >= 3, got {}",
            block_size
        )));
    }

    let (height, width) = plane.dim();
    let radius = (block_size / 2) as isize;
    let area = (block_size * block_size) as f32;

    // Integral image over the replicated-border padding
    let pad = radius as usize;
    let ph = height + 2 * pad;
    let pw = width + 2 * pad;
    let mut integral = Array2::<u64>::zeros((ph + 1, pw + 1));
    for y in 0..ph {
        let sy = BorderMode::Replicate.index(y as isize - radius, height);
        let mut row_sum = 0u64;
        for x in 0..pw {
            let sx = BorderMode::Replicate.index(x as isize - radius, width);
            row_sum += plane[[sy, sx]] as u64;
            integral[[y + 1, x + 1]] = integral[[y, x + 1]] + row_sum;
        }
    }

    let threshold_delta = offset.ceil() as i32;
    Ok(Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, x0) = (y, x);
        let (y1, x1) = (y + block_size, x + block_size);
        let sum = integral[[y1, x1]] + integral[[y0, x0]] - integral[[y0, x1]] - integral[[y1, x0]];
        let mean = (sum as f32 / area).round() as i32;
        if plane[[y, x]] as i32 - mean > -threshold_delta {
            max_value
        } else {
            0
        }
    }))
}
