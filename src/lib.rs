//! ConnectPro frame filters
//!
//! Image enhancement and artistic style filters for camera frames, with
//! name-based dispatch and a parallel batch runner. Optional Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Frame Format
//! Frames are 8-bit images stored as `ndarray::Array3<u8>`:
//! - **BGR**: (height, width, 3) - blue, green, red; what every filter expects
//! - **Gray**: (height, width, 1) - produced and consumed by color conversion
//!
//! ## Filter Families
//! - **Enhancement**: histogram_equalization, clahe, gaussian_blur, sharpen,
//!   denoise, super_resolution, auto_enhance (default)
//! - **Style**: pencil_sketch, cartoon (default), oil_painting, watercolor, vintage
//!
//! Unknown names fall back to the family default unless the
//! [`Registry`] is strict.
//!
//! ## Example
//! ```
//! use connectpro_filters::{Frame, Registry};
//!
//! let frame = Frame::filled(32, 32, [40, 80, 120]).unwrap();
//! let registry = Registry::new();
//! let sketch = registry.stylize("pencil_sketch", &frame).unwrap();
//! assert_eq!(sketch.dimensions(), (32, 32));
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod extensions;
pub mod filters;
pub mod frame;
pub mod logging;
pub mod registry;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use batch::{BatchOutput, BatchRunner, CancellationToken};
pub use config::FilterConfig;
pub use error::{FilterError, FilterResult};
pub use extensions::{EnhanceFilter, Pipeline, StyleFilter};
pub use filters::color_space::{convert, ColorSpace};
pub use filters::oil_paint::OilPaintProvider;
pub use frame::Frame;
pub use registry::{Family, Filter, Registry};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use std::sync::Arc;

    use crate::batch::BatchRunner;
    use crate::error::FilterError;
    use crate::frame::Frame;
    use crate::registry::{Family, Registry};

    fn to_py_err(err: FilterError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    fn to_frame(image: PyReadonlyArray3<'_, u8>) -> PyResult<Frame> {
        Frame::from_array(image.as_array().to_owned()).map_err(to_py_err)
    }

    fn registry(seed: u64) -> Registry {
        Registry::new().with_vintage_seed(seed)
    }

    // ========================================================================
    // Single Frame
    // ========================================================================

    /// Apply an enhancement filter to a BGR uint8 image (H, W, 3).
    ///
    /// Unknown names use `auto_enhance`.
    #[pyfunction]
    pub fn apply_enhancement<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        name: &str,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let frame = to_frame(image)?;
        let result = py
            .allow_threads(|| registry(0).enhance(name, &frame))
            .map_err(to_py_err)?;
        Ok(result.into_array().into_pyarray(py))
    }

    /// Apply a style filter to a BGR uint8 image (H, W, 3).
    ///
    /// Unknown names use `cartoon`. `seed` drives the vintage noise.
    #[pyfunction]
    #[pyo3(signature = (image, name, seed=0))]
    pub fn apply_style<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        name: &str,
        seed: u64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let frame = to_frame(image)?;
        let result = py
            .allow_threads(|| registry(seed).stylize(name, &frame))
            .map_err(to_py_err)?;
        Ok(result.into_array().into_pyarray(py))
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// Apply one filter to a list of images, preserving order.
    ///
    /// # Arguments
    /// * `images` - BGR uint8 images (H, W, 3)
    /// * `family` - "enhance" or "style"
    /// * `name` - Filter name within the family
    /// * `seed` - Base vintage seed; image `i` uses `seed + i`
    #[pyfunction]
    #[pyo3(signature = (images, family, name, seed=0))]
    pub fn apply_all<'py>(
        py: Python<'py>,
        images: Vec<PyReadonlyArray3<'py, u8>>,
        family: &str,
        name: &str,
        seed: u64,
    ) -> PyResult<Vec<Bound<'py, PyArray3<u8>>>> {
        let family: Family = family.parse().map_err(to_py_err)?;
        let frames = images.into_iter().map(to_frame).collect::<PyResult<Vec<_>>>()?;
        let runner = BatchRunner::new(Arc::new(registry(seed)));
        let results = py
            .allow_threads(|| runner.apply_all(family, name, &frames))
            .map_err(to_py_err)?;
        Ok(results
            .into_iter()
            .map(|frame| frame.into_array().into_pyarray(py))
            .collect())
    }

    /// Names of the filters in a family.
    #[pyfunction]
    pub fn filter_names(family: &str) -> PyResult<Vec<&'static str>> {
        let family: Family = family.parse().map_err(to_py_err)?;
        Ok(family.filter_names())
    }

    // ========================================================================
    // Module Definition
    // ========================================================================

    #[pymodule]
    pub fn connectpro_filters(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(apply_enhancement, m)?)?;
        m.add_function(wrap_pyfunction!(apply_style, m)?)?;
        m.add_function(wrap_pyfunction!(apply_all, m)?)?;
        m.add_function(wrap_pyfunction!(filter_names, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::connectpro_filters;
