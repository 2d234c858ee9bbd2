//! Primitive filter modules for frame processing.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Gray8 | (H, W, 1) or (H, W) | u8 | Single luminance channel, 0-255 |
//! | BGR8 | (H, W, 3) | u8 | Blue, green, red, 0-255 |
//!
//! Primitives take `ndarray` views and return owned arrays. They do not
//! validate channel semantics; the [`Frame`](crate::Frame) level functions in
//! [`extensions`](crate::extensions) do.
//!
//! ## Filter Categories
//!
//! - **Core**: borders, kernels, convolution, color matrices, blending
//! - **Color space**: BGR to/from gray, YUV, LAB
//! - **Histogram**: equalization, CLAHE
//! - **Smoothing**: Gaussian, median, bilateral
//! - **Threshold**: adaptive mean threshold
//! - **Resampling**: bicubic, area
//! - **Denoise**: non-local means
//! - **Color adjust**: saturation, brightness
//! - **Noise**: seeded additive noise
//! - **Oil paint**: pluggable oil painting operator

pub mod core;
pub mod color_space;
pub mod histogram;
pub mod blur;
pub mod threshold;
pub mod resize;
pub mod denoise;
pub mod color_adjust;
pub mod noise;
pub mod oil_paint;
