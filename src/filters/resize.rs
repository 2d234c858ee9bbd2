//! Resampling: bicubic interpolation and area averaging.
//!
//! Both resamplers are separable. Pixel centers sit at half-integer
//! coordinates, so scaling by an exact integer factor keeps the image
//! aligned.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::core::saturate_u8;
use crate::error::{FilterError, FilterResult};

/// Keys cubic convolution coefficient.
const CUBIC_A: f32 = -0.75;

/// Per-destination list of `(source index, weight)` taps along one axis.
type AxisTaps = Vec<Vec<(usize, f32)>>;

fn cubic_weights(t: f32) -> [f32; 4] {
    let a = CUBIC_A;
    let w0 = ((a * (t + 1.0) - 5.0 * a) * (t + 1.0) + 8.0 * a) * (t + 1.0) - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let u = 1.0 - t;
    let w2 = ((a + 2.0) * u - (a + 3.0)) * u * u + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

fn cubic_taps(src_len: usize, dst_len: usize) -> AxisTaps {
    let scale = src_len as f32 / dst_len as f32;
    (0..dst_len)
        .map(|d| {
            let f = (d as f32 + 0.5) * scale - 0.5;
            let s = f.floor();
            let w = cubic_weights(f - s);
            (0..4)
                .map(|k| {
                    let idx = (s as isize + k as isize - 1).clamp(0, src_len as isize - 1) as usize;
                    (idx, w[k])
                })
                .collect()
        })
        .collect()
}

fn area_taps(src_len: usize, dst_len: usize) -> AxisTaps {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            let span = end - start;
            (first..last)
                .filter_map(|s| {
                    let overlap = (end.min(s as f64 + 1.0) - start.max(s as f64)).max(0.0);
                    (overlap > 1e-9).then_some((s, (overlap / span) as f32))
                })
                .collect()
        })
        .collect()
}

/// Run a horizontal then a vertical pass with the given taps.
fn resample(input: ArrayView3<u8>, x_taps: &AxisTaps, y_taps: &AxisTaps) -> Array3<u8> {
    let (height, _, channels) = input.dim();
    let new_w = x_taps.len();
    let new_h = y_taps.len();

    let stride = new_w * channels;
    let mut temp = vec![0.0f32; height * stride];
    temp.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, taps) in x_taps.iter().enumerate() {
                for c in 0..channels {
                    row[x * channels + c] = taps
                        .iter()
                        .map(|&(sx, w)| input[[y, sx, c]] as f32 * w)
                        .sum();
                }
            }
        });

    let mut output_flat = vec![0u8; new_h * stride];
    output_flat
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..new_w {
                for c in 0..channels {
                    let v: f32 = y_taps[y]
                        .iter()
                        .map(|&(sy, w)| temp[sy * stride + x * channels + c] * w)
                        .sum();
                    row[x * channels + c] = saturate_u8(v);
                }
            }
        });

    Array3::from_shape_vec((new_h, new_w, channels), output_flat)
        .expect("Shape mismatch in resample")
}

fn check_size(new_width: usize, new_height: usize) -> FilterResult<()> {
    if new_width == 0 || new_height == 0 {
        return Err(FilterError::invalid_parameter(format!(
            "target size must be non-zero, got {}x{}",
            new_width, new_height
        )));
    }
    Ok(())
}

/// Resize with bicubic interpolation (a = -0.75, clamped borders).
pub fn resize_bicubic(input: ArrayView3<u8>, new_width: usize, new_height: usize) -> FilterResult<Array3<u8>> {
    check_size(new_width, new_height)?;
    let (height, width, _) = input.dim();
    Ok(resample(
        input,
        &cubic_taps(width, new_width),
        &cubic_taps(height, new_height),
    ))
}

/// Resize by averaging the exact source area covered by each output pixel.
pub fn resize_area(input: ArrayView3<u8>, new_width: usize, new_height: usize) -> FilterResult<Array3<u8>> {
    check_size(new_width, new_height)?;
    let (height, width, _) = input.dim();
    Ok(resample(
        input,
        &area_taps(width, new_width),
        &area_taps(height, new_height),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_weights_sum_to_one() {
        for t in [0.0f32, 0.25, 0.5, 0.75] {
            let sum: f32 = cubic_weights(t).iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        assert!((cubic_weights(0.0)[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_area_halving_averages_blocks() {
        let mut img = Array3::<u8>::zeros((2, 2, 1));
        img[[0, 0, 0]] = 10;
        img[[0, 1, 0]] = 20;
        img[[1, 0, 0]] = 30;
        img[[1, 1, 0]] = 40;
        let out = resize_area(img.view(), 1, 1).unwrap();
        assert_eq!(out[[0, 0, 0]], 25);
    }

    #[test]
    fn test_area_fractional_weights_normalized() {
        for taps in area_taps(7, 3) {
            let sum: f32 = taps.iter().map(|&(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_bicubic_flat_stays_flat() {
        let img = Array3::<u8>::from_elem((5, 6, 3), 77);
        let up = resize_bicubic(img.view(), 12, 10).unwrap();
        assert_eq!(up.dim(), (10, 12, 3));
        assert!(up.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_up_then_down_keeps_size() {
        let img = Array3::from_shape_fn((6, 9, 3), |(y, x, c)| (y * 30 + x * 20 + c) as u8);
        let up = resize_bicubic(img.view(), 18, 12).unwrap();
        let down = resize_area(up.view(), 9, 6).unwrap();
        assert_eq!(down.dim(), img.dim());
    }

    #[test]
    fn test_zero_target_rejected() {
        let img = Array3::<u8>::zeros((2, 2, 3));
        assert!(resize_area(img.view(), 0, 2).is_err());
    }
}
