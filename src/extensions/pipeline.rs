//! Ordered multi-stage filters.
//!
//! A [`Pipeline`] feeds each stage's output into the next stage. Stages see
//! both the current frame and the pipeline's original input, so a stage can
//! derive a mask from the untouched source after earlier stages smoothed it.
//! Every stage must hand back a 3-channel frame of the input's size.

use ndarray::Axis;

use super::enhance;
use crate::error::{FilterError, FilterResult};
use crate::filters::blur::{bilateral_filter, gaussian_blur, median_blur, BilateralParams};
use crate::filters::color_adjust::{brightness_u8, saturation_u8};
use crate::filters::color_space::bgr_to_gray;
use crate::filters::core::{add_weighted, bitwise_and, convolve, replicate_channels, BorderMode, Kernel};
use crate::filters::histogram::ClaheParams;
use crate::filters::threshold::adaptive_threshold_mean;
use crate::frame::Frame;

/// Which frame an edge mask is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSource {
    /// The output of the previous stage.
    Input,
    /// The frame the pipeline was started with.
    Original,
}

/// Dark-edge mask extraction combined with the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMaskParams {
    pub source: MaskSource,
    /// Median pre-blur of the grayscale mask source.
    pub median_ksize: Option<usize>,
    /// Adaptive threshold neighborhood.
    pub block_size: usize,
    /// Subtracted from the local mean before comparing.
    pub offset: f32,
    /// Weight of the unmasked input blended back in; 0.0 keeps only the masked frame.
    pub input_weight: f32,
}

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Clahe(ClaheParams),
    Convolve(Kernel),
    Saturation(f32),
    Brightness(f32),
    Bilateral(BilateralParams),
    GaussianBlur { ksize: usize, sigma: f32 },
    EdgeMask(EdgeMaskParams),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Clahe(_) => "clahe",
            Stage::Convolve(_) => "convolve",
            Stage::Saturation(_) => "saturation",
            Stage::Brightness(_) => "brightness",
            Stage::Bilateral(_) => "bilateral",
            Stage::GaussianBlur { .. } => "gaussian_blur",
            Stage::EdgeMask(_) => "edge_mask",
        }
    }

    /// Run the stage on `input`; `source` is the pipeline's original frame.
    pub fn apply(&self, input: &Frame, source: &Frame) -> FilterResult<Frame> {
        input.require_color()?;
        match self {
            Stage::Clahe(params) => enhance::clahe(input, *params),
            Stage::Convolve(kernel) => Frame::from_array(convolve(input.view(), kernel, BorderMode::Replicate)),
            Stage::Saturation(factor) => Frame::from_array(saturation_u8(input.view(), *factor)),
            Stage::Brightness(factor) => Frame::from_array(brightness_u8(input.view(), *factor)),
            Stage::Bilateral(params) => Frame::from_array(bilateral_filter(input.view(), *params)),
            Stage::GaussianBlur { ksize, sigma } => Frame::from_array(gaussian_blur(input.view(), *ksize, *sigma)?),
            Stage::EdgeMask(params) => edge_mask(input, source, params),
        }
    }
}

fn edge_mask(input: &Frame, source: &Frame, params: &EdgeMaskParams) -> FilterResult<Frame> {
    let mask_source = match params.source {
        MaskSource::Input => input,
        MaskSource::Original => source,
    };
    mask_source.require_color()?;

    let mut gray = bgr_to_gray(mask_source.view());
    if let Some(ksize) = params.median_ksize {
        gray = median_blur(gray.view().insert_axis(Axis(2)), ksize).remove_axis(Axis(2));
    }
    let mask = adaptive_threshold_mean(gray.view(), 255, params.block_size, params.offset)?;
    let masked = bitwise_and(input.view(), replicate_channels(mask.view()).view());

    if params.input_weight > 0.0 {
        let w = params.input_weight;
        Frame::from_array(add_weighted(masked.view(), 1.0 - w, input.view(), w, 0.0))
    } else {
        Frame::from_array(masked)
    }
}

/// Ordered, immutable list of stages applied in sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    name: &'static str,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: &'static str, stages: Vec<Stage>) -> Self {
        Self { name, stages }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Apply every stage in order.
    ///
    /// Fails with `InvalidFrame` if a stage changes the frame's size or
    /// channel count.
    pub fn apply(&self, frame: &Frame) -> FilterResult<Frame> {
        frame.require_color()?;
        let mut current = frame.clone();
        for stage in &self.stages {
            let next = stage.apply(&current, frame)?;
            if next.dimensions() != current.dimensions() || next.channels() != 3 {
                return Err(FilterError::invalid_frame(format!(
                    "stage '{}' of '{}' produced {}x{}x{} from {}x{}x3",
                    stage.name(),
                    self.name,
                    next.width(),
                    next.height(),
                    next.channels(),
                    current.width(),
                    current.height()
                )));
            }
            tracing::trace!(pipeline = self.name, stage = stage.name(), "stage complete");
            current = next;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pipeline_is_identity() {
        let frame = Frame::filled(4, 4, [1, 2, 3]).unwrap();
        let out = Pipeline::new("noop", Vec::new()).apply(&frame).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_stages_run_in_order() {
        let frame = Frame::filled(3, 3, [200, 200, 200]).unwrap();
        let brighten_then_halve = Pipeline::new(
            "order",
            vec![Stage::Brightness(2.0), Stage::Brightness(0.5)],
        );
        let halve_then_brighten = Pipeline::new(
            "order",
            vec![Stage::Brightness(0.5), Stage::Brightness(2.0)],
        );
        // 200 * 2 saturates before halving
        assert_eq!(brighten_then_halve.apply(&frame).unwrap().get(0, 0, 0), 127);
        assert_eq!(halve_then_brighten.apply(&frame).unwrap().get(0, 0, 0), 200);
    }

    #[test]
    fn test_rejects_gray_input() {
        let gray = Frame::from_plane(ndarray::Array2::<u8>::zeros((4, 4))).unwrap();
        let pipeline = Pipeline::new("p", vec![Stage::Saturation(1.0)]);
        assert!(pipeline.apply(&gray).is_err());
    }

    #[test]
    fn test_edge_mask_uses_original_source() {
        // Source has a dark line; the current input is flat
        let mut source = Frame::filled(12, 12, [200, 200, 200]).unwrap().into_array();
        for y in 0..12 {
            for c in 0..3 {
                source[[y, 6, c]] = 10;
            }
        }
        let source = Frame::from_array(source).unwrap();
        let input = Frame::filled(12, 12, [150, 150, 150]).unwrap();
        let params = EdgeMaskParams {
            source: MaskSource::Original,
            median_ksize: None,
            block_size: 9,
            offset: 9.0,
            input_weight: 0.0,
        };
        let out = Stage::EdgeMask(params).apply(&input, &source).unwrap();
        assert_eq!(out.get(6, 4, 0), 0);
        assert_eq!(out.get(0, 4, 0), 150);
    }
}
