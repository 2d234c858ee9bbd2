//! Smoothing filters: Gaussian, median and bilateral.
//!
//! All functions accept images with 1 or 3 channels and return an image of
//! the same shape.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::core::{convolve_separable, gaussian_kernel_1d, saturate_u8, BorderMode};
use crate::error::FilterResult;

/// Apply Gaussian blur with an odd `ksize` kernel.
///
/// Uses separable 2-pass convolution with replicated borders. A non-positive
/// `sigma` is derived from the kernel size.
pub fn gaussian_blur(input: ArrayView3<u8>, ksize: usize, sigma: f32) -> FilterResult<Array3<u8>> {
    let taps = gaussian_kernel_1d(ksize, sigma)?;
    Ok(convolve_separable(input, &taps, BorderMode::Replicate))
}

/// Apply a `ksize x ksize` median filter per channel.
///
/// # Arguments
/// * `input` - Image with 1 or 3 channels (height, width, channels)
/// * `ksize` - Odd aperture size
///
/// # Returns
/// Median-filtered image with same channel count
pub fn median_blur(input: ArrayView3<u8>, ksize: usize) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let radius = (ksize / 2) as isize;
    let window_size = ksize * ksize;

    let mut output_flat = vec![0u8; height * width * channels];
    output_flat
        .par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let mut values: Vec<u8> = Vec::with_capacity(window_size);
            for x in 0..width {
                for c in 0..channels {
                    values.clear();
                    for dy in -radius..=radius {
                        let sy = BorderMode::Replicate.index(y as isize + dy, height);
                        for dx in -radius..=radius {
                            let sx = BorderMode::Replicate.index(x as isize + dx, width);
                            values.push(input[[sy, sx, c]]);
                        }
                    }
                    values.sort_unstable();
                    row[x * channels + c] = values[values.len() / 2];
                }
            }
        });

    Array3::from_shape_vec((height, width, channels), output_flat)
        .expect("Shape mismatch in median_blur")
}

// ============================================================================
// Bilateral
// ============================================================================

/// Edge-preserving smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    /// Neighborhood diameter in pixels.
    pub diameter: usize,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            diameter: 15,
            sigma_color: 80.0,
            sigma_space: 80.0,
        }
    }
}

/// Apply bilateral filtering.
///
/// Each output pixel averages a circular neighborhood weighted by spatial
/// distance and by the L1 color distance to the center pixel.
pub fn bilateral_filter(input: ArrayView3<u8>, params: BilateralParams) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let radius = (params.diameter / 2).max(1) as isize;

    let color_coeff = -0.5 / (params.sigma_color * params.sigma_color);
    let space_coeff = -0.5 / (params.sigma_space * params.sigma_space);

    // Circular support with precomputed spatial weights
    let mut offsets: Vec<(isize, isize, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dy * dy + dx * dx) as f32;
            if r2 > (radius * radius) as f32 {
                continue;
            }
            offsets.push((dy, dx, (r2 * space_coeff).exp()));
        }
    }

    // Color weight indexed by summed absolute channel difference
    let color_weights: Vec<f32> = (0..=255 * channels)
        .map(|d| {
            let d = d as f32;
            (d * d * color_coeff).exp()
        })
        .collect();

    let mut output_flat = vec![0u8; height * width * channels];
    output_flat
        .par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let mut sum = vec![0.0f32; channels];
            for x in 0..width {
                sum.iter_mut().for_each(|s| *s = 0.0);
                let mut weight_sum = 0.0f32;

                for &(dy, dx, space_weight) in &offsets {
                    let sy = BorderMode::Reflect101.index(y as isize + dy, height);
                    let sx = BorderMode::Reflect101.index(x as isize + dx, width);

                    let mut diff = 0usize;
                    for c in 0..channels {
                        diff += (input[[sy, sx, c]] as i32 - input[[y, x, c]] as i32).unsigned_abs() as usize;
                    }
                    let weight = space_weight * color_weights[diff];

                    for c in 0..channels {
                        sum[c] += input[[sy, sx, c]] as f32 * weight;
                    }
                    weight_sum += weight;
                }

                for c in 0..channels {
                    row[x * channels + c] = saturate_u8(sum[c] / weight_sum);
                }
            }
        });

    Array3::from_shape_vec((height, width, channels), output_flat)
        .expect("Shape mismatch in bilateral_filter")
}
