//! Artistic style filters.
//!
//! Cartoon and watercolor are expressed as [`Pipeline`]s so their stages can
//! be inspected and tested on their own. Oil painting goes through an
//! [`OilPaintProvider`]. Vintage draws its noise from a caller-supplied
//! generator.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use rand::RngCore;

use super::pipeline::{EdgeMaskParams, MaskSource, Pipeline, Stage};
use crate::error::{FilterError, FilterResult};
use crate::filters::blur::{gaussian_blur, BilateralParams};
use crate::filters::color_space::{bgr_to_gray, gray_to_bgr};
use crate::filters::core::{saturate_u8, scale_offset, ColorMatrix};
use crate::filters::noise::add_uniform_noise;
use crate::filters::oil_paint::OilPaintProvider;
use crate::frame::Frame;

/// Sepia, noise and darkening settings of the vintage filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VintageParams {
    pub matrix: ColorMatrix,
    /// Noise is drawn from `[0, noise_amplitude)`; 0 disables it.
    pub noise_amplitude: u8,
    pub scale: f32,
    pub offset: f32,
}

impl Default for VintageParams {
    fn default() -> Self {
        Self {
            matrix: ColorMatrix::sepia(),
            noise_amplitude: 50,
            scale: 0.8,
            offset: -20.0,
        }
    }
}

/// Tunable parameters of the style family.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleParams {
    pub sketch_ksize: usize,
    pub bilateral: BilateralParams,
    pub edge_median_ksize: usize,
    pub edge_block_size: usize,
    pub edge_offset: f32,
    /// Weight of the smoothed frame blended back into the cartoon edges.
    pub cartoon_input_weight: f32,
    pub oil_size: usize,
    pub oil_dyn_ratio: u8,
    pub watercolor_blur_ksize: usize,
    pub vintage: VintageParams,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            sketch_ksize: 21,
            bilateral: BilateralParams::default(),
            edge_median_ksize: 5,
            edge_block_size: 9,
            edge_offset: 9.0,
            cartoon_input_weight: 0.2,
            oil_size: 7,
            oil_dyn_ratio: 1,
            watercolor_blur_ksize: 3,
            vintage: VintageParams::default(),
        }
    }
}

/// Recognized style filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFilter {
    PencilSketch,
    Cartoon,
    OilPainting,
    Watercolor,
    Vintage,
}

impl StyleFilter {
    pub const ALL: [StyleFilter; 5] = [
        StyleFilter::PencilSketch,
        StyleFilter::Cartoon,
        StyleFilter::OilPainting,
        StyleFilter::Watercolor,
        StyleFilter::Vintage,
    ];

    /// Used when a requested name is not recognized.
    pub const DEFAULT: StyleFilter = StyleFilter::Cartoon;

    pub fn name(self) -> &'static str {
        match self {
            StyleFilter::PencilSketch => "pencil_sketch",
            StyleFilter::Cartoon => "cartoon",
            StyleFilter::OilPainting => "oil_painting",
            StyleFilter::Watercolor => "watercolor",
            StyleFilter::Vintage => "vintage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether the filter consumes random numbers.
    pub fn is_stochastic(self) -> bool {
        matches!(self, StyleFilter::Vintage)
    }

    /// Run this filter on a BGR frame.
    ///
    /// # Arguments
    /// * `frame` - BGR input
    /// * `params` - Style parameters
    /// * `oil` - Oil paint operator, only used by `OilPainting`
    /// * `rng` - Noise source, only used by `Vintage`
    pub fn apply(
        self,
        frame: &Frame,
        params: &StyleParams,
        oil: &dyn OilPaintProvider,
        rng: &mut dyn RngCore,
    ) -> FilterResult<Frame> {
        match self {
            StyleFilter::PencilSketch => pencil_sketch(frame, params.sketch_ksize),
            StyleFilter::Cartoon => cartoon_pipeline(params).apply(frame),
            StyleFilter::OilPainting => oil_painting(frame, oil, params.oil_size, params.oil_dyn_ratio),
            StyleFilter::Watercolor => watercolor_pipeline(params).apply(frame),
            StyleFilter::Vintage => vintage(frame, &params.vintage, rng),
        }
    }
}

impl fmt::Display for StyleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StyleFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| FilterError::UnknownFilter {
            family: "style",
            name: s.to_string(),
        })
    }
}

// ============================================================================
// Pencil Sketch
// ============================================================================

/// Color-dodge divide: `round(gray * 256 / denom)`, saturated. A zero
/// denominator gives 0.
fn dodge_divide(gray: &Array2<u8>, blurred_inverted: &Array2<u8>) -> Array2<u8> {
    let mut output = Array2::<u8>::zeros(gray.dim());
    ndarray::Zip::from(&mut output)
        .and(gray)
        .and(blurred_inverted)
        .for_each(|o, &g, &b| {
            let denom = 255 - b as u32;
            *o = if denom == 0 {
                0
            } else {
                saturate_u8(g as f32 * 256.0 / denom as f32)
            };
        });
    output
}

/// Grayscale pencil drawing, replicated to three channels.
pub fn pencil_sketch(frame: &Frame, ksize: usize) -> FilterResult<Frame> {
    frame.require_color()?;
    let gray = bgr_to_gray(frame.view());
    let inverted = gray.mapv(|v| 255 - v);
    let blurred = gaussian_blur(inverted.view().insert_axis(ndarray::Axis(2)), ksize, 0.0)?
        .remove_axis(ndarray::Axis(2));
    let sketch = dodge_divide(&gray, &blurred);
    Frame::from_array(gray_to_bgr(sketch.view()))
}

// ============================================================================
// Cartoon / Watercolor
// ============================================================================

fn edge_mask_params(params: &StyleParams, source: MaskSource) -> EdgeMaskParams {
    EdgeMaskParams {
        source,
        median_ksize: None,
        block_size: params.edge_block_size,
        offset: params.edge_offset,
        input_weight: 0.0,
    }
}

/// Bilateral smoothing, then dark edges from the smoothed frame blended with it.
pub fn cartoon_pipeline(params: &StyleParams) -> Pipeline {
    let edges = EdgeMaskParams {
        median_ksize: Some(params.edge_median_ksize),
        input_weight: params.cartoon_input_weight,
        ..edge_mask_params(params, MaskSource::Input)
    };
    Pipeline::new(
        "cartoon",
        vec![Stage::Bilateral(params.bilateral), Stage::EdgeMask(edges)],
    )
}

/// Two bilateral passes masked by edges of the original frame, then a light blur.
pub fn watercolor_pipeline(params: &StyleParams) -> Pipeline {
    Pipeline::new(
        "watercolor",
        vec![
            Stage::Bilateral(params.bilateral),
            Stage::Bilateral(params.bilateral),
            Stage::EdgeMask(edge_mask_params(params, MaskSource::Original)),
            Stage::GaussianBlur {
                ksize: params.watercolor_blur_ksize,
                sigma: 0.0,
            },
        ],
    )
}

// ============================================================================
// Oil Painting
// ============================================================================

pub fn oil_painting(frame: &Frame, provider: &dyn OilPaintProvider, size: usize, dyn_ratio: u8) -> FilterResult<Frame> {
    frame.require_color()?;
    let painted = Frame::from_array(provider.oil_paint(frame.view(), size, dyn_ratio)?)?;
    if painted.dimensions() != frame.dimensions() || !painted.is_color() {
        return Err(FilterError::invalid_frame(format!(
            "oil paint provider returned {}x{}x{} for a {}x{} frame",
            painted.width(),
            painted.height(),
            painted.channels(),
            frame.width(),
            frame.height()
        )));
    }
    Ok(painted)
}

// ============================================================================
// Vintage
// ============================================================================

/// Sepia tone, additive noise, then `scale * v + offset`.
pub fn vintage(frame: &Frame, params: &VintageParams, rng: &mut dyn RngCore) -> FilterResult<Frame> {
    frame.require_color()?;
    let toned = params.matrix.transform(frame.view());
    let noisy = add_uniform_noise(toned.view(), params.noise_amplitude, rng);
    Frame::from_array(scale_offset(noisy.view(), params.scale, params.offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::oil_paint::HistogramOilPaint;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn checker(width: usize, height: usize) -> Frame {
        Frame::from_array(Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            if (x / 4 + y / 4) % 2 == 0 {
                30 + c as u8 * 5
            } else {
                210 - c as u8 * 5
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_names_round_trip() {
        for filter in StyleFilter::ALL {
            assert_eq!(StyleFilter::from_name(filter.name()), Some(filter));
        }
        assert_eq!(StyleFilter::from_name("sketch"), None);
    }

    #[test]
    fn test_all_filters_preserve_shape() {
        let frame = checker(17, 11);
        let params = StyleParams::default();
        let mut rng = StdRng::seed_from_u64(0);
        for filter in StyleFilter::ALL {
            let out = filter.apply(&frame, &params, &HistogramOilPaint, &mut rng).unwrap();
            assert_eq!(out.dimensions(), (17, 11), "{}", filter);
            assert_eq!(out.channels(), 3, "{}", filter);
        }
    }

    #[test]
    fn test_pencil_sketch_white() {
        let frame = Frame::filled(16, 16, [255, 255, 255]).unwrap();
        let out = pencil_sketch(&frame, 21).unwrap();
        assert!(out.view().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_pencil_sketch_channels_equal() {
        let out = pencil_sketch(&checker(12, 12), 21).unwrap();
        for y in 0..12 {
            for x in 0..12 {
                assert_eq!(out.get(x, y, 0), out.get(x, y, 1));
                assert_eq!(out.get(x, y, 0), out.get(x, y, 2));
            }
        }
    }

    #[test]
    fn test_dodge_divide_zero_denominator() {
        let gray = Array2::from_elem((1, 1), 200u8);
        let blurred = Array2::from_elem((1, 1), 255u8);
        assert_eq!(dodge_divide(&gray, &blurred)[[0, 0]], 0);
    }

    #[test]
    fn test_cartoon_black_stays_black() {
        let frame = Frame::filled(32, 32, [0, 0, 0]).unwrap();
        let out = cartoon_pipeline(&StyleParams::default()).apply(&frame).unwrap();
        assert!(out.view().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_watercolor_masks_from_original() {
        let pipeline = watercolor_pipeline(&StyleParams::default());
        let masks: Vec<_> = pipeline
            .stages()
            .iter()
            .filter_map(|s| match s {
                Stage::EdgeMask(p) => Some(p.source),
                _ => None,
            })
            .collect();
        assert_eq!(masks, vec![MaskSource::Original]);
    }

    #[test]
    fn test_vintage_white_without_noise() {
        let frame = Frame::filled(4, 4, [255, 255, 255]).unwrap();
        let params = VintageParams {
            noise_amplitude: 0,
            ..VintageParams::default()
        };
        let out = vintage(&frame, &params, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(out.get(0, 0, 0), 171);
        assert_eq!(out.get(0, 0, 1), 184);
        assert_eq!(out.get(0, 0, 2), 184);
    }

    #[test]
    fn test_vintage_seeded() {
        let frame = checker(8, 8);
        let params = VintageParams::default();
        let a = vintage(&frame, &params, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = vintage(&frame, &params, &mut StdRng::seed_from_u64(5)).unwrap();
        let c = vintage(&frame, &params, &mut StdRng::seed_from_u64(6)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    struct Shrinking;

    impl OilPaintProvider for Shrinking {
        fn oil_paint(&self, _input: ndarray::ArrayView3<u8>, _size: usize, _dyn_ratio: u8) -> FilterResult<Array3<u8>> {
            Ok(Array3::zeros((2, 2, 3)))
        }
    }

    #[test]
    fn test_oil_painting_rejects_resized_output() {
        let frame = checker(8, 8);
        let err = oil_painting(&frame, &Shrinking, 7, 1).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrame { .. }));
    }
}
