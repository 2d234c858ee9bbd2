//! Error types for frame filtering.

use crate::filters::color_space::ColorSpace;

/// Errors raised by conversions, filters, pipelines and the batch runner.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Unsupported color conversion: {from} -> {to}")]
    UnsupportedConversion { from: ColorSpace, to: ColorSpace },

    #[error("Unknown {family} filter: {name}")]
    UnknownFilter { family: &'static str, name: String },

    #[error("Invalid kernel: {message}")]
    InvalidKernel { message: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Batch cancelled after {completed} frames")]
    Cancelled { completed: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using FilterError.
pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: msg.into(),
        }
    }

    pub fn invalid_kernel(msg: impl Into<String>) -> Self {
        Self::InvalidKernel {
            message: msg.into(),
        }
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
