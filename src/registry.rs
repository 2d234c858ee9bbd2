//! Name-based filter dispatch.
//!
//! The [`Registry`] maps a family and a filter name to a concrete filter and
//! runs it. Unrecognized names fall back to the family default
//! (`auto_enhance` / `cartoon`) unless strict mode is on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::FilterConfig;
use crate::error::{FilterError, FilterResult};
use crate::extensions::{EnhanceFilter, EnhanceParams, StyleFilter, StyleParams};
use crate::filters::oil_paint::{HistogramOilPaint, OilPaintProvider};
use crate::frame::Frame;

/// Filter family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Enhance,
    Style,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Enhance => "enhance",
            Family::Style => "style",
        }
    }

    /// Every recognized filter name of this family.
    pub fn filter_names(self) -> Vec<&'static str> {
        match self {
            Family::Enhance => EnhanceFilter::ALL.iter().map(|f| f.name()).collect(),
            Family::Style => StyleFilter::ALL.iter().map(|f| f.name()).collect(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Family {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enhance" | "enhancement" => Ok(Family::Enhance),
            "style" => Ok(Family::Style),
            other => Err(FilterError::invalid_parameter(format!(
                "unknown filter family '{}'",
                other
            ))),
        }
    }
}

/// A resolved filter of either family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Enhance(EnhanceFilter),
    Style(StyleFilter),
}

impl Filter {
    pub fn family(self) -> Family {
        match self {
            Filter::Enhance(_) => Family::Enhance,
            Filter::Style(_) => Family::Style,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Enhance(f) => f.name(),
            Filter::Style(f) => f.name(),
        }
    }
}

/// Dispatches filter names to implementations.
///
/// Holds the parameters of both families, the oil paint operator and the
/// fallback policy. Shared across threads by the batch runner.
#[derive(Clone)]
pub struct Registry {
    enhance_params: EnhanceParams,
    style_params: StyleParams,
    oil_paint: Arc<dyn OilPaintProvider>,
    default_enhancement: EnhanceFilter,
    default_style: StyleFilter,
    strict: bool,
    vintage_seed: u64,
    max_frame_size: Option<(usize, usize)>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("enhance_params", &self.enhance_params)
            .field("style_params", &self.style_params)
            .field("default_enhancement", &self.default_enhancement)
            .field("default_style", &self.default_style)
            .field("strict", &self.strict)
            .field("vintage_seed", &self.vintage_seed)
            .field("max_frame_size", &self.max_frame_size)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            enhance_params: EnhanceParams::default(),
            style_params: StyleParams::default(),
            oil_paint: Arc::new(HistogramOilPaint),
            default_enhancement: EnhanceFilter::DEFAULT,
            default_style: StyleFilter::DEFAULT,
            strict: false,
            vintage_seed: 0,
            max_frame_size: None,
        }
    }

    /// Build a registry from validated configuration.
    pub fn from_config(config: &FilterConfig) -> FilterResult<Self> {
        config.validate()?;
        let mut registry = Self::new();
        registry.default_enhancement = config.default_enhancement.parse()?;
        registry.default_style = config.default_style.parse()?;
        registry.strict = config.strict;
        registry.vintage_seed = config.vintage.seed;
        registry.style_params.vintage.noise_amplitude = config.vintage.noise_amplitude;
        if config.enforce_max_frame_size {
            registry.max_frame_size = Some((config.max_frame_size[0], config.max_frame_size[1]));
        }
        Ok(registry)
    }

    pub fn with_oil_paint_provider(mut self, provider: Arc<dyn OilPaintProvider>) -> Self {
        self.oil_paint = provider;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_enhance_params(mut self, params: EnhanceParams) -> Self {
        self.enhance_params = params;
        self
    }

    pub fn with_style_params(mut self, params: StyleParams) -> Self {
        self.style_params = params;
        self
    }

    pub fn with_vintage_seed(mut self, seed: u64) -> Self {
        self.vintage_seed = seed;
        self
    }

    pub fn with_max_frame_size(mut self, width: usize, height: usize) -> Self {
        self.max_frame_size = Some((width, height));
        self
    }

    pub fn enhance_params(&self) -> &EnhanceParams {
        &self.enhance_params
    }

    pub fn style_params(&self) -> &StyleParams {
        &self.style_params
    }

    pub fn vintage_seed(&self) -> u64 {
        self.vintage_seed
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a filter name within a family.
    ///
    /// Unknown names resolve to the family default, or fail with
    /// `UnknownFilter` in strict mode.
    pub fn resolve(&self, family: Family, name: &str) -> FilterResult<Filter> {
        let found = match family {
            Family::Enhance => EnhanceFilter::from_name(name).map(Filter::Enhance),
            Family::Style => StyleFilter::from_name(name).map(Filter::Style),
        };
        if let Some(filter) = found {
            return Ok(filter);
        }

        if self.strict {
            return Err(FilterError::UnknownFilter {
                family: match family {
                    Family::Enhance => "enhancement",
                    Family::Style => "style",
                },
                name: name.to_string(),
            });
        }

        let fallback = match family {
            Family::Enhance => Filter::Enhance(self.default_enhancement),
            Family::Style => Filter::Style(self.default_style),
        };
        tracing::warn!(
            family = %family,
            requested = name,
            fallback = fallback.name(),
            "unknown filter name, using default"
        );
        Ok(fallback)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Apply an enhancement filter by name.
    pub fn enhance(&self, name: &str, frame: &Frame) -> FilterResult<Frame> {
        self.apply(Family::Enhance, name, frame)
    }

    /// Apply a style filter by name, seeding vintage noise from the registry seed.
    pub fn stylize(&self, name: &str, frame: &Frame) -> FilterResult<Frame> {
        self.apply(Family::Style, name, frame)
    }

    /// Apply a style filter by name with an explicit noise source.
    pub fn stylize_with_rng(&self, name: &str, frame: &Frame, rng: &mut dyn RngCore) -> FilterResult<Frame> {
        let filter = self.resolve(Family::Style, name)?;
        self.apply_filter(filter, frame, rng)
    }

    pub fn apply(&self, family: Family, name: &str, frame: &Frame) -> FilterResult<Frame> {
        let filter = self.resolve(family, name)?;
        self.apply_indexed(filter, frame, 0)
    }

    /// Apply a resolved filter as frame `index` of a batch.
    ///
    /// Vintage noise is seeded with `vintage_seed + index`.
    pub fn apply_indexed(&self, filter: Filter, frame: &Frame, index: usize) -> FilterResult<Frame> {
        let mut rng = StdRng::seed_from_u64(self.vintage_seed.wrapping_add(index as u64));
        self.apply_filter(filter, frame, &mut rng)
    }

    /// Apply a resolved filter. `rng` is only consumed by stochastic filters.
    pub fn apply_filter(&self, filter: Filter, frame: &Frame, rng: &mut dyn RngCore) -> FilterResult<Frame> {
        self.check_frame(frame)?;
        tracing::debug!(
            family = %filter.family(),
            filter = filter.name(),
            width = frame.width(),
            height = frame.height(),
            "applying filter"
        );
        match filter {
            Filter::Enhance(f) => f.apply(frame, &self.enhance_params),
            Filter::Style(f) => f.apply(frame, &self.style_params, self.oil_paint.as_ref(), rng),
        }
    }

    fn check_frame(&self, frame: &Frame) -> FilterResult<()> {
        frame.require_color()?;
        if let Some((max_w, max_h)) = self.max_frame_size {
            if frame.width() > max_w || frame.height() > max_h {
                return Err(FilterError::invalid_frame(format!(
                    "frame {}x{} exceeds maximum {}x{}",
                    frame.width(),
                    frame.height(),
                    max_w,
                    max_h
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse() {
        assert_eq!("enhance".parse::<Family>().unwrap(), Family::Enhance);
        assert_eq!("enhancement".parse::<Family>().unwrap(), Family::Enhance);
        assert_eq!("style".parse::<Family>().unwrap(), Family::Style);
        assert!("detect".parse::<Family>().is_err());
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(Family::Enhance.filter_names().len(), 7);
        assert_eq!(
            Family::Style.filter_names(),
            vec!["pencil_sketch", "cartoon", "oil_painting", "watercolor", "vintage"]
        );
    }

    #[test]
    fn test_resolve_known_and_fallback() {
        let registry = Registry::new();
        assert_eq!(
            registry.resolve(Family::Enhance, "clahe").unwrap(),
            Filter::Enhance(EnhanceFilter::Clahe)
        );
        assert_eq!(
            registry.resolve(Family::Enhance, "bogus").unwrap(),
            Filter::Enhance(EnhanceFilter::AutoEnhance)
        );
        assert_eq!(
            registry.resolve(Family::Style, "bogus").unwrap(),
            Filter::Style(StyleFilter::Cartoon)
        );
    }

    #[test]
    fn test_strict_mode_rejects_unknown() {
        let registry = Registry::new().with_strict(true);
        let err = registry.resolve(Family::Style, "bogus").unwrap_err();
        assert!(matches!(err, FilterError::UnknownFilter { family: "style", .. }));
    }

    #[test]
    fn test_config_defaults_applied() {
        let config = FilterConfig {
            default_style: "vintage".to_string(),
            ..FilterConfig::default()
        };
        let registry = Registry::from_config(&config).unwrap();
        assert_eq!(
            registry.resolve(Family::Style, "nope").unwrap(),
            Filter::Style(StyleFilter::Vintage)
        );
    }

    #[test]
    fn test_max_frame_size_enforced() {
        let registry = Registry::new().with_max_frame_size(8, 8);
        let frame = Frame::filled(9, 4, [1, 1, 1]).unwrap();
        let err = registry.enhance("sharpen", &frame).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrame { .. }));
    }

    #[test]
    fn test_gray_frame_rejected() {
        let gray = Frame::from_plane(ndarray::Array2::<u8>::zeros((4, 4))).unwrap();
        assert!(Registry::new().stylize("cartoon", &gray).is_err());
    }

    #[test]
    fn test_stylize_uses_registry_seed() {
        let frame = Frame::filled(6, 6, [90, 120, 150]).unwrap();
        let a = Registry::new().with_vintage_seed(3).stylize("vintage", &frame).unwrap();
        let b = Registry::new()
            .stylize_with_rng("vintage", &frame, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }
}
