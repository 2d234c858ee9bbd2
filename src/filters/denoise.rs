//! Non-local means denoising.
//!
//! Every pixel is replaced by a weighted mean of the pixels in its search
//! window, weighted by how similar their surrounding template patches are.
//! Patch distances are computed per search offset with an integral image, so
//! the cost is independent of the template size.

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rayon::prelude::*;

use super::color_space::{bgr_to_lab, lab_to_bgr};
use super::core::{saturate_u8, BorderMode};
use crate::error::{FilterError, FilterResult};

/// Weights below this are treated as zero.
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Parameters of colored non-local means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NlMeansParams {
    /// Filter strength for the lightness channel.
    pub h: f32,
    /// Filter strength for the two chroma channels.
    pub h_color: f32,
    /// Odd side length of the comparison patch.
    pub template_window: usize,
    /// Odd side length of the area searched for similar patches.
    pub search_window: usize,
}

impl Default for NlMeansParams {
    fn default() -> Self {
        Self {
            h: 10.0,
            h_color: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

impl NlMeansParams {
    fn validate(&self) -> FilterResult<()> {
        for (name, size) in [("template", self.template_window), ("search", self.search_window)] {
            if size == 0 || size % 2 == 0 {
                return Err(FilterError::invalid_parameter(format!(
                    "{} window must be odd and positive, got {}",
                    name, size
                )));
            }
        }
        if self.h <= 0.0 || self.h_color <= 0.0 {
            return Err(FilterError::invalid_parameter("filter strength must be positive"));
        }
        Ok(())
    }
}

/// Non-local means over all channels of `input` jointly.
pub fn nl_means(input: ArrayView3<u8>, h: f32, template_window: usize, search_window: usize) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let tr = template_window / 2;
    let sr = search_window / 2;
    let pad = tr + sr;

    let ph = height + 2 * pad;
    let pw = width + 2 * pad;
    let padded = Array3::from_shape_fn((ph, pw, channels), |(y, x, c)| {
        let sy = BorderMode::Reflect101.index(y as isize - pad as isize, height);
        let sx = BorderMode::Reflect101.index(x as isize - pad as isize, width);
        input[[sy, sx, c]] as f32
    });

    // Distance grid covers every template around every output pixel
    let gh = height + 2 * tr;
    let gw = width + 2 * tr;
    let template_area = (template_window * template_window) as f32;
    let inv_h2 = 1.0 / (h * h * channels as f32);

    let mut weight_sum = vec![0.0f32; height * width];
    let mut value_sum = vec![0.0f32; height * width * channels];
    let mut integral = Array2::<f32>::zeros((gh + 1, gw + 1));

    for dy in -(sr as isize)..=(sr as isize) {
        for dx in -(sr as isize)..=(sr as isize) {
            for gy in 0..gh {
                let py = gy + sr;
                let qy = (py as isize + dy) as usize;
                let mut row_sum = 0.0f32;
                for gx in 0..gw {
                    let px = gx + sr;
                    let qx = (px as isize + dx) as usize;
                    let mut d = 0.0f32;
                    for c in 0..channels {
                        let diff = padded[[qy, qx, c]] - padded[[py, px, c]];
                        d += diff * diff;
                    }
                    row_sum += d;
                    integral[[gy + 1, gx + 1]] = integral[[gy, gx + 1]] + row_sum;
                }
            }

            let integral = &integral;
            let padded = &padded;
            weight_sum
                .par_chunks_mut(width)
                .zip(value_sum.par_chunks_mut(width * channels))
                .enumerate()
                .for_each(|(y, (w_row, v_row))| {
                    for x in 0..width {
                        let (y1, x1) = (y + template_window, x + template_window);
                        let ssd = integral[[y1, x1]] + integral[[y, x]]
                            - integral[[y, x1]]
                            - integral[[y1, x]];
                        let weight = (-(ssd.max(0.0) / template_area) * inv_h2).exp();
                        if weight < WEIGHT_THRESHOLD {
                            continue;
                        }
                        let qy = (y + pad) as isize + dy;
                        let qx = (x + pad) as isize + dx;
                        w_row[x] += weight;
                        for c in 0..channels {
                            v_row[x * channels + c] += weight * padded[[qy as usize, qx as usize, c]];
                        }
                    }
                });
        }
    }

    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        saturate_u8(value_sum[(y * width + x) * channels + c] / weight_sum[y * width + x])
    })
}

/// Denoise a BGR image in LAB space: lightness with `h`, chroma with `h_color`.
pub fn denoise_colored(input: ArrayView3<u8>, params: NlMeansParams) -> FilterResult<Array3<u8>> {
    params.validate()?;

    let lab = bgr_to_lab(input);
    let lightness = lab.slice(s![.., .., 0..1]);
    let chroma = lab.slice(s![.., .., 1..3]);

    let lightness = nl_means(lightness, params.h, params.template_window, params.search_window);
    let chroma = nl_means(chroma, params.h_color, params.template_window, params.search_window);

    let merged = ndarray::concatenate(Axis(2), &[lightness.view(), chroma.view()])
        .map_err(|e| FilterError::invalid_frame(e.to_string()))?;
    Ok(lab_to_bgr(merged.view()))
}
