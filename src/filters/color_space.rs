//! Color space conversion between BGR, grayscale, YUV and CIE LAB.
//!
//! All conversions are 8-bit and size-preserving. Gray and YUV use the
//! standard 14-bit fixed-point coefficients, so a BGR -> YUV -> BGR round
//! trip of a neutral pixel is exact. LAB uses sRGB linearization with a D65
//! white point; L is scaled to 0-255 and a/b are offset by 128.

use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use rayon::prelude::*;

use crate::error::{FilterError, FilterResult};
use crate::frame::Frame;

/// Pixel representation of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Bgr,
    Gray,
    Yuv,
    Lab,
}

impl ColorSpace {
    pub fn channels(self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            _ => 3,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorSpace::Bgr => "BGR",
            ColorSpace::Gray => "GRAY",
            ColorSpace::Yuv => "YUV",
            ColorSpace::Lab => "LAB",
        };
        f.write_str(name)
    }
}

const SHIFT: i32 = 14;
const ROUND: i32 = 1 << (SHIFT - 1);

// Luma weights (B, G, R), sum to 1 << 14
const Y_B: i32 = 1868;
const Y_G: i32 = 9617;
const Y_R: i32 = 4899;

const U_SCALE: i32 = 8061; // 0.492
const V_SCALE: i32 = 14369; // 0.877
const CHROMA_DELTA: i32 = 128 << SHIFT;

const B_FROM_U: i32 = 33292; // 2.032
const G_FROM_U: i32 = -6472; // -0.395
const G_FROM_V: i32 = -9519; // -0.581
const R_FROM_V: i32 = 18678; // 1.140

#[inline]
fn clamp_i32(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[inline]
fn luma(b: i32, g: i32, r: i32) -> i32 {
    (b * Y_B + g * Y_G + r * Y_R + ROUND) >> SHIFT
}

/// Convert `input` from one color space to another.
///
/// Supported pairs: BGR <-> Gray, BGR <-> YUV, BGR <-> LAB. The source frame
/// must carry the channel count of `from`.
pub fn convert(frame: &Frame, from: ColorSpace, to: ColorSpace) -> FilterResult<Frame> {
    let supported = matches!(
        (from, to),
        (ColorSpace::Bgr, ColorSpace::Gray)
            | (ColorSpace::Gray, ColorSpace::Bgr)
            | (ColorSpace::Bgr, ColorSpace::Yuv)
            | (ColorSpace::Yuv, ColorSpace::Bgr)
            | (ColorSpace::Bgr, ColorSpace::Lab)
            | (ColorSpace::Lab, ColorSpace::Bgr)
    );
    if !supported {
        return Err(FilterError::UnsupportedConversion { from, to });
    }
    if frame.channels() != from.channels() {
        return Err(FilterError::invalid_frame(format!(
            "{} -> {} needs {} channel(s), frame has {}",
            from,
            to,
            from.channels(),
            frame.channels()
        )));
    }

    let input = frame.view();
    match (from, to) {
        (ColorSpace::Bgr, ColorSpace::Gray) => Frame::from_plane(bgr_to_gray(input)),
        (ColorSpace::Gray, ColorSpace::Bgr) => Frame::from_array(gray_to_bgr(frame.plane(0))),
        (ColorSpace::Bgr, ColorSpace::Yuv) => Frame::from_array(bgr_to_yuv(input)),
        (ColorSpace::Yuv, ColorSpace::Bgr) => Frame::from_array(yuv_to_bgr(input)),
        (ColorSpace::Bgr, ColorSpace::Lab) => Frame::from_array(bgr_to_lab(input)),
        (ColorSpace::Lab, ColorSpace::Bgr) => Frame::from_array(lab_to_bgr(input)),
        _ => Err(FilterError::UnsupportedConversion { from, to }),
    }
}

/// Apply `f` to every 3-channel pixel, one row per rayon task.
fn map_pixels<F>(input: ArrayView3<u8>, f: F) -> Array3<u8>
where
    F: Fn([u8; 3]) -> [u8; 3] + Sync,
{
    let (height, width, _) = input.dim();
    let mut output_flat = vec![0u8; height * width * 3];
    output_flat
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let out = f([input[[y, x, 0]], input[[y, x, 1]], input[[y, x, 2]]]);
                row[x * 3..x * 3 + 3].copy_from_slice(&out);
            }
        });

    Array3::from_shape_vec((height, width, 3), output_flat)
        .expect("Shape mismatch in map_pixels")
}

// ============================================================================
// Gray
// ============================================================================

/// Luma plane of a BGR image.
pub fn bgr_to_gray(input: ArrayView3<u8>) -> Array2<u8> {
    let (height, width, _) = input.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let b = input[[y, x, 0]] as i32;
        let g = input[[y, x, 1]] as i32;
        let r = input[[y, x, 2]] as i32;
        clamp_i32(luma(b, g, r))
    })
}

/// Replicate a gray plane into three identical channels.
pub fn gray_to_bgr(plane: ArrayView2<u8>) -> Array3<u8> {
    super::core::replicate_channels(plane)
}

// ============================================================================
// YUV
// ============================================================================

pub fn bgr_to_yuv(input: ArrayView3<u8>) -> Array3<u8> {
    map_pixels(input, |[b, g, r]| {
        let (b, g, r) = (b as i32, g as i32, r as i32);
        let y = luma(b, g, r);
        let u = ((b - y) * U_SCALE + CHROMA_DELTA + ROUND) >> SHIFT;
        let v = ((r - y) * V_SCALE + CHROMA_DELTA + ROUND) >> SHIFT;
        [clamp_i32(y), clamp_i32(u), clamp_i32(v)]
    })
}

pub fn yuv_to_bgr(input: ArrayView3<u8>) -> Array3<u8> {
    map_pixels(input, |[y, u, v]| {
        let y = y as i32;
        let u = u as i32 - 128;
        let v = v as i32 - 128;
        let b = y + ((u * B_FROM_U + ROUND) >> SHIFT);
        let g = y + ((u * G_FROM_U + v * G_FROM_V + ROUND) >> SHIFT);
        let r = y + ((v * R_FROM_V + ROUND) >> SHIFT);
        [clamp_i32(b), clamp_i32(g), clamp_i32(r)]
    })
}

// ============================================================================
// LAB
// ============================================================================

// D65 reference white
const WHITE_X: f64 = 0.950456;
const WHITE_Z: f64 = 1.088754;

const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 903.3;

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f64) -> f64 {
    let cube = f * f * f;
    if cube > LAB_EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

#[inline]
fn round_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub fn bgr_to_lab(input: ArrayView3<u8>) -> Array3<u8> {
    let mut linear = [0.0f64; 256];
    for (i, v) in linear.iter_mut().enumerate() {
        *v = srgb_to_linear(i as f64 / 255.0);
    }

    map_pixels(input, |[b, g, r]| {
        let (b, g, r) = (linear[b as usize], linear[g as usize], linear[r as usize]);

        let x = 0.412453 * r + 0.357580 * g + 0.180423 * b;
        let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
        let z = 0.019334 * r + 0.119193 * g + 0.950227 * b;

        let fx = lab_f(x / WHITE_X);
        let fy = lab_f(y);
        let fz = lab_f(z / WHITE_Z);

        let l = if y > LAB_EPSILON {
            116.0 * y.cbrt() - 16.0
        } else {
            LAB_KAPPA * y
        };
        let a = 500.0 * (fx - fy);
        let bb = 200.0 * (fy - fz);

        [round_u8(l * 255.0 / 100.0), round_u8(a + 128.0), round_u8(bb + 128.0)]
    })
}

pub fn lab_to_bgr(input: ArrayView3<u8>) -> Array3<u8> {
    map_pixels(input, |[l, a, b]| {
        let l = l as f64 * 100.0 / 255.0;
        let a = a as f64 - 128.0;
        let b = b as f64 - 128.0;

        let (y, fy) = if l <= LAB_KAPPA * LAB_EPSILON {
            let y = l / LAB_KAPPA;
            (y, 7.787 * y + 16.0 / 116.0)
        } else {
            let fy = (l + 16.0) / 116.0;
            (fy * fy * fy, fy)
        };
        let x = WHITE_X * lab_f_inv(fy + a / 500.0);
        let z = WHITE_Z * lab_f_inv(fy - b / 200.0);

        let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
        let g = -0.969256 * x + 1.875992 * y + 0.041556 * z;
        let bl = 0.055648 * x - 0.204043 * y + 1.057311 * z;

        let encode = |c: f64| round_u8(linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0);
        [encode(bl), encode(g), encode(r)]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(bgr: [u8; 3]) -> Frame {
        Frame::filled(4, 3, bgr).unwrap()
    }

    #[test]
    fn test_gray_weights() {
        let gray = convert(&frame_of([255, 0, 0]), ColorSpace::Bgr, ColorSpace::Gray).unwrap();
        assert_eq!(gray.channels(), 1);
        // 0.114 * 255 = 29.07
        assert_eq!(gray.get(0, 0, 0), 29);

        let gray = convert(&frame_of([0, 0, 255]), ColorSpace::Bgr, ColorSpace::Gray).unwrap();
        assert_eq!(gray.get(2, 1, 0), 76);
    }

    #[test]
    fn test_gray_to_bgr_replicates() {
        let gray = convert(&frame_of([10, 200, 60]), ColorSpace::Bgr, ColorSpace::Gray).unwrap();
        let bgr = convert(&gray, ColorSpace::Gray, ColorSpace::Bgr).unwrap();
        assert_eq!(bgr.channels(), 3);
        let v = gray.get(0, 0, 0);
        assert_eq!([bgr.get(0, 0, 0), bgr.get(0, 0, 1), bgr.get(0, 0, 2)], [v, v, v]);
    }

    #[test]
    fn test_yuv_neutral_round_trip() {
        for v in [0u8, 64, 128, 200, 255] {
            let yuv = convert(&frame_of([v, v, v]), ColorSpace::Bgr, ColorSpace::Yuv).unwrap();
            assert_eq!(yuv.get(0, 0, 0), v);
            assert_eq!(yuv.get(0, 0, 1), 128);
            assert_eq!(yuv.get(0, 0, 2), 128);
            let back = convert(&yuv, ColorSpace::Yuv, ColorSpace::Bgr).unwrap();
            assert_eq!(back, frame_of([v, v, v]));
        }
    }

    #[test]
    fn test_yuv_color_round_trip_close() {
        let src = frame_of([40, 120, 220]);
        let yuv = convert(&src, ColorSpace::Bgr, ColorSpace::Yuv).unwrap();
        let back = convert(&yuv, ColorSpace::Yuv, ColorSpace::Bgr).unwrap();
        for c in 0..3 {
            assert!((back.get(0, 0, c) as i32 - src.get(0, 0, c) as i32).abs() <= 2);
        }
    }

    #[test]
    fn test_yuv_pure_red_clamps_v() {
        let src = frame_of([0, 0, 255]);
        let yuv = convert(&src, ColorSpace::Bgr, ColorSpace::Yuv).unwrap();
        // V would be 285 before clamping
        assert_eq!([yuv.get(0, 0, 0), yuv.get(0, 0, 1), yuv.get(0, 0, 2)], [76, 91, 255]);
        let back = convert(&yuv, ColorSpace::Yuv, ColorSpace::Bgr).unwrap();
        assert_eq!([back.get(0, 0, 0), back.get(0, 0, 1), back.get(0, 0, 2)], [1, 17, 221]);
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = convert(&frame_of([255, 255, 255]), ColorSpace::Bgr, ColorSpace::Lab).unwrap();
        assert_eq!([white.get(0, 0, 0), white.get(0, 0, 1), white.get(0, 0, 2)], [255, 128, 128]);
        let black = convert(&frame_of([0, 0, 0]), ColorSpace::Bgr, ColorSpace::Lab).unwrap();
        assert_eq!([black.get(0, 0, 0), black.get(0, 0, 1), black.get(0, 0, 2)], [0, 128, 128]);
    }

    #[test]
    fn test_lab_gray_is_neutral() {
        let lab = convert(&frame_of([128, 128, 128]), ColorSpace::Bgr, ColorSpace::Lab).unwrap();
        assert_eq!(lab.get(0, 0, 1), 128);
        assert_eq!(lab.get(0, 0, 2), 128);
        let back = convert(&lab, ColorSpace::Lab, ColorSpace::Bgr).unwrap();
        for c in 0..3 {
            assert!((back.get(1, 1, c) as i32 - 128).abs() <= 1);
        }
    }

    #[test]
    fn test_lab_color_round_trip_close() {
        let src = frame_of([30, 160, 210]);
        let lab = convert(&src, ColorSpace::Bgr, ColorSpace::Lab).unwrap();
        let back = convert(&lab, ColorSpace::Lab, ColorSpace::Bgr).unwrap();
        for c in 0..3 {
            assert!((back.get(0, 0, c) as i32 - src.get(0, 0, c) as i32).abs() <= 4);
        }
    }

    #[test]
    fn test_unsupported_pair() {
        let err = convert(&frame_of([1, 2, 3]), ColorSpace::Yuv, ColorSpace::Lab).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedConversion { .. }));
    }

    #[test]
    fn test_channel_mismatch_is_invalid_frame() {
        let gray = convert(&frame_of([9, 9, 9]), ColorSpace::Bgr, ColorSpace::Gray).unwrap();
        let err = convert(&gray, ColorSpace::Bgr, ColorSpace::Lab).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrame { .. }));
    }
}
