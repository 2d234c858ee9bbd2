//! Oil painting effect.
//!
//! The effect is exposed as the [`OilPaintProvider`] capability so any
//! equivalent operator can be plugged into the style filters. The built-in
//! [`HistogramOilPaint`] picks, for every pixel, the most common intensity
//! bucket in its neighborhood and outputs the mean color of that bucket.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::color_space::bgr_to_gray;
use super::core::BorderMode;
use crate::error::{FilterError, FilterResult};

/// Oil paint operator: `oil_paint(frame, size, dyn_ratio) -> frame`, size-preserving.
pub trait OilPaintProvider: Send + Sync {
    /// Apply the effect to a BGR image.
    ///
    /// # Arguments
    /// * `input` - BGR image (height, width, 3)
    /// * `size` - Neighborhood side length
    /// * `dyn_ratio` - Intensity bucket width; larger values flatten more
    fn oil_paint(&self, input: ArrayView3<u8>, size: usize, dyn_ratio: u8) -> FilterResult<Array3<u8>>;
}

/// Neighborhood intensity-histogram oil painting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramOilPaint;

impl OilPaintProvider for HistogramOilPaint {
    fn oil_paint(&self, input: ArrayView3<u8>, size: usize, dyn_ratio: u8) -> FilterResult<Array3<u8>> {
        if size == 0 || dyn_ratio == 0 {
            return Err(FilterError::invalid_parameter(format!(
                "oil paint size and dynamic ratio must be positive, got {} and {}",
                size, dyn_ratio
            )));
        }

        let (height, width, channels) = input.dim();
        if channels != 3 {
            return Err(FilterError::invalid_frame("oil paint expects a BGR image"));
        }

        let buckets = bgr_to_gray(input).mapv(|v| v / dyn_ratio);
        let bins = 255 / dyn_ratio as usize + 1;
        let before = (size / 2) as isize;
        let after = (size - 1) as isize - before;

        let mut output_flat = vec![0u8; height * width * 3];
        output_flat
            .par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(y, row)| {
                let mut counts = vec![0u32; bins];
                let mut sums = vec![[0u32; 3]; bins];
                for x in 0..width {
                    counts.iter_mut().for_each(|c| *c = 0);
                    sums.iter_mut().for_each(|s| *s = [0; 3]);

                    for dy in -before..=after {
                        let sy = BorderMode::Replicate.index(y as isize + dy, height);
                        for dx in -before..=after {
                            let sx = BorderMode::Replicate.index(x as isize + dx, width);
                            let bucket = buckets[[sy, sx]] as usize;
                            counts[bucket] += 1;
                            for c in 0..3 {
                                sums[bucket][c] += input[[sy, sx, c]] as u32;
                            }
                        }
                    }

                    // First bucket wins ties
                    let mut mode = 0;
                    for (i, &count) in counts.iter().enumerate() {
                        if count > counts[mode] {
                            mode = i;
                        }
                    }
                    let n = counts[mode].max(1);
                    for c in 0..3 {
                        row[x * 3 + c] = ((sums[mode][c] + n / 2) / n) as u8;
                    }
                }
            });

        Ok(Array3::from_shape_vec((height, width, 3), output_flat)
            .expect("Shape mismatch in oil_paint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_image_unchanged() {
        let img = Array3::<u8>::from_elem((6, 6, 3), 64);
        let out = HistogramOilPaint.oil_paint(img.view(), 7, 1).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_majority_color_wins() {
        let mut img = Array3::<u8>::from_elem((5, 5, 3), 200);
        img[[2, 2, 0]] = 10;
        img[[2, 2, 1]] = 10;
        img[[2, 2, 2]] = 10;
        let out = HistogramOilPaint.oil_paint(img.view(), 3, 1).unwrap();
        assert_eq!(out[[2, 2, 0]], 200);
    }

    #[test]
    fn test_rejects_zero_ratio() {
        let img = Array3::<u8>::zeros((3, 3, 3));
        assert!(HistogramOilPaint.oil_paint(img.view(), 7, 0).is_err());
    }

    #[test]
    fn test_rejects_gray_input() {
        let img = Array3::<u8>::zeros((3, 3, 1));
        assert!(HistogramOilPaint.oil_paint(img.view(), 7, 1).is_err());
    }
}
