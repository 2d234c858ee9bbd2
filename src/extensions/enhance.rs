//! Image enhancement filters.
//!
//! | Filter | Method |
//! |--------|--------|
//! | `histogram_equalization` | Equalize Y in YUV space |
//! | `clahe` | CLAHE on L in LAB space |
//! | `gaussian_blur` | 5x5 Gaussian |
//! | `sharpen` | 3x3 strong sharpen kernel |
//! | `denoise` | Colored non-local means |
//! | `super_resolution` | Bicubic upscale then area downscale |
//! | `auto_enhance` | CLAHE, light sharpen, saturation, brightness |

use std::fmt;
use std::str::FromStr;

use ndarray::Axis;

use super::pipeline::{Pipeline, Stage};
use crate::error::{FilterError, FilterResult};
use crate::filters::blur;
use crate::filters::color_space::{bgr_to_lab, bgr_to_yuv, lab_to_bgr, yuv_to_bgr};
use crate::filters::core::{convolve, BorderMode, Kernel};
use crate::filters::denoise::{denoise_colored, NlMeansParams};
use crate::filters::histogram::{self, ClaheParams};
use crate::filters::resize::{resize_area, resize_bicubic};
use crate::frame::Frame;

/// Tunable parameters of the enhancement family.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceParams {
    pub clahe: ClaheParams,
    pub blur_ksize: usize,
    /// 0.0 derives sigma from the kernel size.
    pub blur_sigma: f32,
    pub nl_means: NlMeansParams,
    pub upscale: usize,
    pub saturation: f32,
    pub brightness: f32,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            clahe: ClaheParams::default(),
            blur_ksize: 5,
            blur_sigma: 0.0,
            nl_means: NlMeansParams::default(),
            upscale: 2,
            saturation: 1.2,
            brightness: 1.1,
        }
    }
}

/// Recognized enhancement filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhanceFilter {
    HistogramEqualization,
    Clahe,
    GaussianBlur,
    Sharpen,
    Denoise,
    SuperResolution,
    AutoEnhance,
}

impl EnhanceFilter {
    pub const ALL: [EnhanceFilter; 7] = [
        EnhanceFilter::HistogramEqualization,
        EnhanceFilter::Clahe,
        EnhanceFilter::GaussianBlur,
        EnhanceFilter::Sharpen,
        EnhanceFilter::Denoise,
        EnhanceFilter::SuperResolution,
        EnhanceFilter::AutoEnhance,
    ];

    /// Used when a requested name is not recognized.
    pub const DEFAULT: EnhanceFilter = EnhanceFilter::AutoEnhance;

    pub fn name(self) -> &'static str {
        match self {
            EnhanceFilter::HistogramEqualization => "histogram_equalization",
            EnhanceFilter::Clahe => "clahe",
            EnhanceFilter::GaussianBlur => "gaussian_blur",
            EnhanceFilter::Sharpen => "sharpen",
            EnhanceFilter::Denoise => "denoise",
            EnhanceFilter::SuperResolution => "super_resolution",
            EnhanceFilter::AutoEnhance => "auto_enhance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Run this filter on a BGR frame.
    pub fn apply(self, frame: &Frame, params: &EnhanceParams) -> FilterResult<Frame> {
        match self {
            EnhanceFilter::HistogramEqualization => histogram_equalization(frame),
            EnhanceFilter::Clahe => clahe(frame, params.clahe),
            EnhanceFilter::GaussianBlur => gaussian_blur(frame, params.blur_ksize, params.blur_sigma),
            EnhanceFilter::Sharpen => sharpen(frame),
            EnhanceFilter::Denoise => denoise(frame, params.nl_means),
            EnhanceFilter::SuperResolution => super_resolution(frame, params.upscale),
            EnhanceFilter::AutoEnhance => auto_enhance_pipeline(params).apply(frame),
        }
    }
}

impl fmt::Display for EnhanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnhanceFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| FilterError::UnknownFilter {
            family: "enhancement",
            name: s.to_string(),
        })
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Equalize the luma histogram, leaving chroma untouched.
pub fn histogram_equalization(frame: &Frame) -> FilterResult<Frame> {
    frame.require_color()?;
    let mut yuv = bgr_to_yuv(frame.view());
    let equalized = histogram::equalize_hist(yuv.index_axis(Axis(2), 0));
    yuv.index_axis_mut(Axis(2), 0).assign(&equalized);
    Frame::from_array(yuv_to_bgr(yuv.view()))
}

/// CLAHE on the LAB lightness channel.
pub fn clahe(frame: &Frame, params: ClaheParams) -> FilterResult<Frame> {
    frame.require_color()?;
    let mut lab = bgr_to_lab(frame.view());
    let lightness = histogram::clahe(lab.index_axis(Axis(2), 0), params);
    lab.index_axis_mut(Axis(2), 0).assign(&lightness);
    Frame::from_array(lab_to_bgr(lab.view()))
}

pub fn gaussian_blur(frame: &Frame, ksize: usize, sigma: f32) -> FilterResult<Frame> {
    frame.require_color()?;
    Frame::from_array(blur::gaussian_blur(frame.view(), ksize, sigma)?)
}

pub fn sharpen(frame: &Frame) -> FilterResult<Frame> {
    frame.require_color()?;
    Frame::from_array(convolve(frame.view(), &Kernel::sharpen(), BorderMode::Replicate))
}

pub fn denoise(frame: &Frame, params: NlMeansParams) -> FilterResult<Frame> {
    frame.require_color()?;
    Frame::from_array(denoise_colored(frame.view(), params)?)
}

/// Upscale by `scale` with bicubic interpolation and average back down.
pub fn super_resolution(frame: &Frame, scale: usize) -> FilterResult<Frame> {
    frame.require_color()?;
    if scale == 0 {
        return Err(FilterError::invalid_parameter("upscale factor must be positive"));
    }
    let (width, height) = frame.dimensions();
    let up = resize_bicubic(frame.view(), width * scale, height * scale)?;
    let down = resize_area(up.view(), width, height)?;
    Frame::from_array(down)
}

/// CLAHE, then light sharpening, then saturation and brightness boosts.
pub fn auto_enhance_pipeline(params: &EnhanceParams) -> Pipeline {
    Pipeline::new(
        "auto_enhance",
        vec![
            Stage::Clahe(params.clahe),
            Stage::Convolve(Kernel::edge_preserving_sharpen()),
            Stage::Saturation(params.saturation),
            Stage::Brightness(params.brightness),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn gradient(width: usize, height: usize) -> Frame {
        Frame::from_array(Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (40 + x * 3 + y * 2 + c * 10).min(255) as u8
        }))
        .unwrap()
    }

    #[test]
    fn test_names_round_trip() {
        for filter in EnhanceFilter::ALL {
            assert_eq!(filter.name().parse::<EnhanceFilter>().unwrap(), filter);
        }
        assert!("bogus".parse::<EnhanceFilter>().is_err());
    }

    #[test]
    fn test_all_filters_preserve_shape() {
        let frame = gradient(19, 13);
        let params = EnhanceParams::default();
        for filter in EnhanceFilter::ALL {
            let out = filter.apply(&frame, &params).unwrap();
            assert_eq!(out.dimensions(), (19, 13), "{}", filter);
            assert_eq!(out.channels(), 3, "{}", filter);
        }
    }

    #[test]
    fn test_histogram_equalization_stretches_contrast() {
        let frame = gradient(16, 16);
        let out = histogram_equalization(&frame).unwrap();
        let max_in = frame.view().iter().copied().max().unwrap();
        let max_out = out.view().iter().copied().max().unwrap();
        assert!(max_out > max_in);
    }

    #[test]
    fn test_histogram_equalization_gray_stays_gray() {
        let frame = gradient(8, 8);
        let gray = crate::filters::color_space::convert(
            &frame,
            crate::filters::color_space::ColorSpace::Bgr,
            crate::filters::color_space::ColorSpace::Gray,
        )
        .unwrap();
        let gray_bgr = crate::filters::color_space::convert(
            &gray,
            crate::filters::color_space::ColorSpace::Gray,
            crate::filters::color_space::ColorSpace::Bgr,
        )
        .unwrap();
        let out = histogram_equalization(&gray_bgr).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(out.get(x, y, 0), out.get(x, y, 1));
                assert_eq!(out.get(x, y, 1), out.get(x, y, 2));
            }
        }
    }

    #[test]
    fn test_sharpen_flat_frame_unchanged() {
        let frame = Frame::filled(10, 10, [60, 120, 180]).unwrap();
        assert_eq!(sharpen(&frame).unwrap(), frame);
    }

    #[test]
    fn test_super_resolution_flat_unchanged() {
        let frame = Frame::filled(7, 5, [10, 20, 30]).unwrap();
        assert_eq!(super_resolution(&frame, 2).unwrap(), frame);
    }

    #[test]
    fn test_rejects_gray_frame() {
        let gray = Frame::from_plane(ndarray::Array2::<u8>::zeros((4, 4))).unwrap();
        let err = sharpen(&gray).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrame { .. }));
    }

    #[test]
    fn test_auto_enhance_pipeline_stages() {
        let pipeline = auto_enhance_pipeline(&EnhanceParams::default());
        let names: Vec<_> = pipeline.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["clahe", "convolve", "saturation", "brightness"]);
    }
}
