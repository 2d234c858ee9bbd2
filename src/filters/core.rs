//! Core utilities for frame filters.
//!
//! This module provides shared functionality used by multiple filters:
//! - Border handling for neighborhood operations
//! - Convolution kernels and 2D correlation
//! - Gaussian kernel generation
//! - Fixed 3x3 color matrices
//! - Saturating blend utilities

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use rayon::prelude::*;

use crate::error::{FilterError, FilterResult};

/// Round and saturate a working value into the 0-255 range.
#[inline]
pub fn saturate_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// Border Handling
// ============================================================================

/// How out-of-bounds neighbor coordinates are mapped back into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// `aaa|abcd|ddd` - nearest edge pixel is reused.
    #[default]
    Replicate,
    /// `dcb|abcd|cba` - mirror without repeating the edge pixel.
    Reflect101,
}

impl BorderMode {
    /// Map a possibly out-of-range coordinate onto `0..len`.
    #[inline]
    pub fn index(self, i: isize, len: usize) -> usize {
        let last = len as isize - 1;
        match self {
            BorderMode::Replicate => i.clamp(0, last) as usize,
            BorderMode::Reflect101 => {
                if last == 0 {
                    return 0;
                }
                let mut i = i;
                while i < 0 || i > last {
                    if i < 0 {
                        i = -i;
                    }
                    if i > last {
                        i = 2 * last - i;
                    }
                }
                i as usize
            }
        }
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Immutable odd-sized square weight matrix for 2D correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f32>,
}

impl Kernel {
    /// Build a kernel from a square, odd-sized weight matrix.
    pub fn new(weights: Array2<f32>) -> FilterResult<Self> {
        let (rows, cols) = weights.dim();
        if rows == 0 || rows != cols {
            return Err(FilterError::invalid_kernel(format!(
                "kernel must be square and non-empty, got {}x{}",
                rows, cols
            )));
        }
        if rows % 2 == 0 {
            return Err(FilterError::invalid_kernel(format!(
                "kernel size must be odd, got {}",
                rows
            )));
        }
        Ok(Self { weights })
    }

    fn from_3x3(rows: [[f32; 3]; 3]) -> Self {
        Self {
            weights: Array2::from_shape_fn((3, 3), |(y, x)| rows[y][x]),
        }
    }

    /// Strong sharpen: `[[-1,-1,-1],[-1,9,-1],[-1,-1,-1]]`.
    pub fn sharpen() -> Self {
        Self::from_3x3([[-1.0, -1.0, -1.0], [-1.0, 9.0, -1.0], [-1.0, -1.0, -1.0]])
    }

    /// Light 4-neighbour sharpen used by auto-enhance: `[[0,-1,0],[-1,5,-1],[0,-1,0]]`.
    pub fn edge_preserving_sharpen() -> Self {
        Self::from_3x3([[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]])
    }

    /// Separable Gaussian expanded into a full 2D kernel.
    pub fn gaussian(ksize: usize, sigma: f32) -> FilterResult<Self> {
        let k1d = gaussian_kernel_1d(ksize, sigma)?;
        let size = k1d.len();
        Self::new(Array2::from_shape_fn((size, size), |(y, x)| k1d[y] * k1d[x]))
    }

    pub fn size(&self) -> usize {
        self.weights.dim().0
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    pub fn sum(&self) -> f32 {
        self.weights.sum()
    }
}

/// Fixed binomial kernels used when sigma is derived from a small kernel size.
const SMALL_GAUSSIAN_TABLES: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Sigma implied by a kernel size when none is given.
pub fn auto_sigma(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Generate a normalized 1D Gaussian kernel of odd length `ksize`.
///
/// A non-positive `sigma` is derived from `ksize`; sizes up to 7 then use
/// the fixed binomial tables.
pub fn gaussian_kernel_1d(ksize: usize, sigma: f32) -> FilterResult<Vec<f32>> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(FilterError::invalid_kernel(format!(
            "gaussian kernel size must be odd and positive, got {}",
            ksize
        )));
    }

    if sigma <= 0.0 && ksize <= 7 {
        return Ok(SMALL_GAUSSIAN_TABLES[ksize / 2].to_vec());
    }

    let sigma = if sigma > 0.0 { sigma } else { auto_sigma(ksize) };
    let half = (ksize / 2) as f32;
    let mut kernel: Vec<f32> = (0..ksize)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    Ok(kernel)
}

// ============================================================================
// Convolution
// ============================================================================

/// Correlate every channel of `input` with `kernel`.
///
/// Each output channel is the weighted neighborhood sum, rounded and
/// saturated to 0-255. Out-of-bounds taps are resolved with `border`.
pub fn convolve(input: ArrayView3<u8>, kernel: &Kernel, border: BorderMode) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let size = kernel.size();
    let half = (size / 2) as isize;
    let weights = kernel.weights();

    let mut output_flat = vec![0u8; height * width * channels];
    output_flat
        .par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for ky in 0..size {
                        let sy = border.index(y as isize + ky as isize - half, height);
                        for kx in 0..size {
                            let sx = border.index(x as isize + kx as isize - half, width);
                            sum += input[[sy, sx, c]] as f32 * weights[[ky, kx]];
                        }
                    }
                    row[x * channels + c] = saturate_u8(sum);
                }
            }
        });

    Array3::from_shape_vec((height, width, channels), output_flat)
        .expect("Shape mismatch in convolve")
}

/// Apply a separable kernel (same 1D taps horizontally then vertically).
pub fn convolve_separable(input: ArrayView3<u8>, taps: &[f32], border: BorderMode) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let half = (taps.len() / 2) as isize;

    // Work in f32 for precision between passes
    let mut temp = vec![0.0f32; height * width * channels];
    temp.par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in taps.iter().enumerate() {
                        let sx = border.index(x as isize + ki as isize - half, width);
                        sum += input[[y, sx, c]] as f32 * kv;
                    }
                    row[x * channels + c] = sum;
                }
            }
        });

    let stride = width * channels;
    let mut output_flat = vec![0u8; height * width * channels];
    output_flat
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in taps.iter().enumerate() {
                        let sy = border.index(y as isize + ki as isize - half, height);
                        sum += temp[sy * stride + x * channels + c] * kv;
                    }
                    row[x * channels + c] = saturate_u8(sum);
                }
            }
        });

    Array3::from_shape_vec((height, width, channels), output_flat)
        .expect("Shape mismatch in convolve_separable")
}

// ============================================================================
// Color Matrix
// ============================================================================

/// Immutable 3x3 linear transform applied to each pixel's channel triple.
///
/// Row `i` produces output channel `i` from the input channels in stored order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    rows: [[f32; 3]; 3],
}

impl ColorMatrix {
    pub const fn new(rows: [[f32; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Classic sepia tone matrix.
    pub const fn sepia() -> Self {
        Self::new([
            [0.272, 0.534, 0.131],
            [0.349, 0.686, 0.168],
            [0.393, 0.769, 0.189],
        ])
    }

    #[inline]
    pub fn apply_pixel(&self, px: [u8; 3]) -> [u8; 3] {
        let mut out = [0u8; 3];
        for (i, row) in self.rows.iter().enumerate() {
            let v = row[0] * px[0] as f32 + row[1] * px[1] as f32 + row[2] * px[2] as f32;
            out[i] = saturate_u8(v);
        }
        out
    }

    /// Transform every pixel of a 3-channel image.
    pub fn transform(&self, input: ArrayView3<u8>) -> Array3<u8> {
        let (height, width, _) = input.dim();
        let mut output = Array3::<u8>::zeros((height, width, 3));
        for y in 0..height {
            for x in 0..width {
                let px = [input[[y, x, 0]], input[[y, x, 1]], input[[y, x, 2]]];
                let out = self.apply_pixel(px);
                for c in 0..3 {
                    output[[y, x, c]] = out[c];
                }
            }
        }
        output
    }
}

// ============================================================================
// Blending
// ============================================================================

/// `a * alpha + b * beta + gamma`, saturated per channel.
pub fn add_weighted(a: ArrayView3<u8>, alpha: f32, b: ArrayView3<u8>, beta: f32, gamma: f32) -> Array3<u8> {
    let mut output = Array3::<u8>::zeros(a.dim());
    ndarray::Zip::from(&mut output)
        .and(&a)
        .and(&b)
        .for_each(|o, &va, &vb| {
            *o = saturate_u8(va as f32 * alpha + vb as f32 * beta + gamma);
        });
    output
}

/// `input * alpha + beta`, saturated per channel.
pub fn scale_offset(input: ArrayView3<u8>, alpha: f32, beta: f32) -> Array3<u8> {
    input.mapv(|v| saturate_u8(v as f32 * alpha + beta))
}

/// Per-channel bitwise AND of two images of equal shape.
pub fn bitwise_and(a: ArrayView3<u8>, b: ArrayView3<u8>) -> Array3<u8> {
    let mut output = Array3::<u8>::zeros(a.dim());
    ndarray::Zip::from(&mut output)
        .and(&a)
        .and(&b)
        .for_each(|o, &va, &vb| *o = va & vb);
    output
}

/// Broadcast a single plane into a 3-channel image.
pub fn replicate_channels(plane: ArrayView2<u8>) -> Array3<u8> {
    let (height, width) = plane.dim();
    Array3::from_shape_fn((height, width, 3), |(y, x, _)| plane[[y, x]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(height: usize, width: usize) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| ((y * 40 + x * 25 + c * 7) % 256) as u8)
    }

    #[test]
    fn test_border_replicate() {
        assert_eq!(BorderMode::Replicate.index(-2, 5), 0);
        assert_eq!(BorderMode::Replicate.index(6, 5), 4);
        assert_eq!(BorderMode::Replicate.index(3, 5), 3);
    }

    #[test]
    fn test_border_reflect101() {
        assert_eq!(BorderMode::Reflect101.index(-1, 5), 1);
        assert_eq!(BorderMode::Reflect101.index(-2, 5), 2);
        assert_eq!(BorderMode::Reflect101.index(5, 5), 3);
        assert_eq!(BorderMode::Reflect101.index(-3, 1), 0);
    }

    #[test]
    fn test_kernel_rejects_even() {
        assert!(Kernel::new(Array2::<f32>::zeros((2, 2))).is_err());
        assert!(Kernel::new(Array2::<f32>::zeros((3, 5))).is_err());
    }

    #[test]
    fn test_sharpen_kernels_sum_to_one() {
        assert_eq!(Kernel::sharpen().sum(), 1.0);
        assert_eq!(Kernel::edge_preserving_sharpen().sum(), 1.0);
    }

    #[test]
    fn test_gaussian_small_table() {
        let k = gaussian_kernel_1d(5, 0.0).unwrap();
        assert_eq!(k, vec![0.0625, 0.25, 0.375, 0.25, 0.0625]);
    }

    #[test]
    fn test_gaussian_auto_sigma_normalized() {
        let k = gaussian_kernel_1d(21, 0.0).unwrap();
        assert_eq!(k.len(), 21);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((auto_sigma(21) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_convolve_identity() {
        let img = ramp(4, 5);
        let mut w = Array2::<f32>::zeros((3, 3));
        w[[1, 1]] = 1.0;
        let out = convolve(img.view(), &Kernel::new(w).unwrap(), BorderMode::Replicate);
        assert_eq!(out, img);
    }

    #[test]
    fn test_convolve_flat_sharpen_unchanged() {
        let img = Array3::<u8>::from_elem((6, 6, 3), 90);
        let out = convolve(img.view(), &Kernel::sharpen(), BorderMode::Replicate);
        // Replicated borders keep a flat image flat, corners included
        assert!(out.iter().all(|&v| v == 90));
    }

    #[test]
    fn test_convolve_saturates() {
        let mut img = Array3::<u8>::zeros((3, 3, 3));
        img[[1, 1, 0]] = 200;
        let out = convolve(img.view(), &Kernel::sharpen(), BorderMode::Replicate);
        assert_eq!(out[[1, 1, 0]], 255);
        assert_eq!(out[[0, 0, 0]], 0);
    }

    #[test]
    fn test_separable_matches_full_kernel() {
        let img = ramp(7, 9);
        let taps = gaussian_kernel_1d(5, 0.0).unwrap();
        let full = convolve(img.view(), &Kernel::gaussian(5, 0.0).unwrap(), BorderMode::Replicate);
        let sep = convolve_separable(img.view(), &taps, BorderMode::Replicate);
        for (a, b) in full.iter().zip(sep.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_sepia_matrix_on_white() {
        assert_eq!(ColorMatrix::sepia().apply_pixel([255, 255, 255]), [239, 255, 255]);
    }

    #[test]
    fn test_add_weighted_and_offset() {
        let a = Array3::<u8>::from_elem((1, 1, 3), 100);
        let b = Array3::<u8>::from_elem((1, 1, 3), 200);
        assert_eq!(add_weighted(a.view(), 0.8, b.view(), 0.2, 0.0)[[0, 0, 0]], 120);
        assert_eq!(scale_offset(a.view(), 0.8, -20.0)[[0, 0, 1]], 60);
        assert_eq!(scale_offset(a.view(), 0.1, -20.0)[[0, 0, 2]], 0);
    }

    #[test]
    fn test_bitwise_and_mask() {
        let a = Array3::<u8>::from_elem((1, 2, 3), 0b1011_0110);
        let mut mask = Array3::<u8>::zeros((1, 2, 3));
        mask.slice_mut(ndarray::s![.., 1, ..]).fill(255);
        let out = bitwise_and(a.view(), mask.view());
        assert_eq!(out[[0, 0, 1]], 0);
        assert_eq!(out[[0, 1, 1]], 0b1011_0110);
    }
}
