//! Color adjustment filters: Saturation, Brightness.
//!
//! Both are multiplicative: a factor of 1.0 is the identity. Results are
//! clamped to 0-255 and truncated, as an `Image.blend` style enhancer does.
//!
//! ## Supported Formats
//!
//! - **Grayscale**: (height, width, 1) - saturation is a no-op
//! - **BGR**: (height, width, 3)

use ndarray::{Array3, ArrayView3};


#[inline]
fn truncate_u8(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Luma used as the fully desaturated reference, from B, G, R.
#[inline]
fn desaturated(b: u8, g: u8, r: u8) -> f32 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as f32
}

// ============================================================================
// Saturation
// ============================================================================

/// Scale color saturation.
///
/// Each pixel is pushed away from (factor > 1) or towards (factor < 1) its
/// own gray value: `out = gray + factor * (pixel - gray)`.
///
/// # Arguments
/// * `input` - Image with 1 or 3 channels in B, G, R order
/// * `factor` - 0.0 = grayscale, 1.0 = unchanged, 1.2 = 20% more vivid
pub fn saturation_u8(input: ArrayView3<u8>, factor: f32) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    if channels == 1 {
        return input.to_owned();
    }

    let mut output = Array3::<u8>::zeros((height, width, channels));
    for y in 0..height {
        for x in 0..width {
            let b = input[[y, x, 0]];
            let g = input[[y, x, 1]];
            let r = input[[y, x, 2]];
            let gray = desaturated(b, g, r);

            output[[y, x, 0]] = truncate_u8(gray + (b as f32 - gray) * factor);
            output[[y, x, 1]] = truncate_u8(gray + (g as f32 - gray) * factor);
            output[[y, x, 2]] = truncate_u8(gray + (r as f32 - gray) * factor);
        }
    }
    output
}

// ============================================================================
// Brightness
// ============================================================================

/// Scale brightness by blending towards black: `out = pixel * factor`.
pub fn brightness_u8(input: ArrayView3<u8>, factor: f32) -> Array3<u8> {
    input.mapv(|v| truncate_u8(v as f32 * factor))
}
