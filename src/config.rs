//! Filter configuration.
//!
//! Loaded from TOML. Every field is optional; missing values take the
//! defaults below.
//!
//! ```toml
//! default_enhancement = "auto_enhance"
//! default_style = "cartoon"
//! strict = false
//! max_frame_size = [1920, 1080]
//!
//! [batch]
//! workers = 4
//!
//! [vintage]
//! seed = 42
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FilterError, FilterResult};
use crate::extensions::{EnhanceFilter, StyleFilter};

/// Top-level configuration of the registry and batch runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Enhancement filter used for unrecognized names.
    pub default_enhancement: String,

    /// Style filter used for unrecognized names.
    pub default_style: String,

    /// Fail with `UnknownFilter` instead of falling back to the defaults.
    pub strict: bool,

    /// `[width, height]` limit, enforced only with `enforce_max_frame_size`.
    pub max_frame_size: [usize; 2],

    pub enforce_max_frame_size: bool,

    pub batch: BatchConfig,

    pub vintage: VintageConfig,

    pub logging: LoggingConfig,
}

/// Batch runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; 0 uses the global rayon pool.
    pub workers: usize,

    /// Process frames concurrently.
    pub parallel: bool,
}

/// Vintage noise settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VintageConfig {
    /// Base seed; frame `i` of a batch uses `seed + i`.
    pub seed: u64,

    pub noise_amplitude: u8,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "connectpro_filters=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_enhancement: EnhanceFilter::DEFAULT.name().to_string(),
            default_style: StyleFilter::DEFAULT.name().to_string(),
            strict: false,
            max_frame_size: [1920, 1080],
            enforce_max_frame_size: false,
            batch: BatchConfig::default(),
            vintage: VintageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            parallel: true,
        }
    }
}

impl Default for VintageConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            noise_amplitude: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl FilterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> FilterResult<Self> {
        let config: FilterConfig =
            toml::from_str(content).map_err(|e| FilterError::config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FilterError::config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded filter config");
        Ok(config)
    }

    /// Check that the configured default filter names are recognized.
    pub fn validate(&self) -> FilterResult<()> {
        if EnhanceFilter::from_name(&self.default_enhancement).is_none() {
            return Err(FilterError::config(format!(
                "unknown default enhancement filter '{}'",
                self.default_enhancement
            )));
        }
        if StyleFilter::from_name(&self.default_style).is_none() {
            return Err(FilterError::config(format!(
                "unknown default style filter '{}'",
                self.default_style
            )));
        }
        if self.max_frame_size.iter().any(|&v| v == 0) {
            return Err(FilterError::config("max_frame_size must be positive"));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> FilterResult<String> {
        toml::to_string_pretty(self).map_err(|e| FilterError::config(e.to_string()))
    }
}
