//! Frame-level filter families.
//!
//! - [`enhance`]: clarity and quality improvements
//! - [`style`]: artistic effects
//! - [`pipeline`]: ordered multi-stage composition used by both

pub mod enhance;
pub mod pipeline;
pub mod style;

pub use enhance::{EnhanceFilter, EnhanceParams};
pub use pipeline::{EdgeMaskParams, MaskSource, Pipeline, Stage};
pub use style::{StyleFilter, StyleParams, VintageParams};
