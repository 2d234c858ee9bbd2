//! WebAssembly exports for the frame filters.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Frames are
//! passed as flat BGR byte buffers (length = width * height * 3).

use wasm_bindgen::prelude::*;

use crate::error::FilterError;
use crate::frame::Frame;
use crate::registry::Registry;

fn to_js_err(err: FilterError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Enhancement
// ============================================================================

/// Apply an enhancement filter by name.
///
/// # Arguments
/// * `data` - Flat array of BGR bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `name` - Filter name; unknown names use `auto_enhance`
///
/// # Returns
/// Flat array of BGR bytes with the same dimensions
#[wasm_bindgen]
pub fn apply_enhancement_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    name: &str,
) -> Result<Vec<u8>, JsValue> {
    let frame = Frame::from_raw(width, height, 3, data.to_vec()).map_err(to_js_err)?;
    let result = Registry::new().enhance(name, &frame).map_err(to_js_err)?;
    Ok(result.into_raw())
}

// ============================================================================
// Style
// ============================================================================

/// Apply a style filter by name.
///
/// # Arguments
/// * `data` - Flat array of BGR bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `name` - Filter name; unknown names use `cartoon`
/// * `seed` - Vintage noise seed
#[wasm_bindgen]
pub fn apply_style_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    name: &str,
    seed: u64,
) -> Result<Vec<u8>, JsValue> {
    let frame = Frame::from_raw(width, height, 3, data.to_vec()).map_err(to_js_err)?;
    let result = Registry::new()
        .with_vintage_seed(seed)
        .stylize(name, &frame)
        .map_err(to_js_err)?;
    Ok(result.into_raw())
}
