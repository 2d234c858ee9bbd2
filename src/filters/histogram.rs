//! Histogram-based contrast filters: global equalization and CLAHE.
//!
//! Both operate on a single 8-bit plane (luma or lightness); callers are
//! responsible for splitting and re-merging color channels.

use ndarray::{Array2, ArrayView2};

use super::core::BorderMode;

fn histogram(plane: ArrayView2<u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in plane.iter() {
        hist[v as usize] += 1;
    }
    hist
}

/// Equalize the histogram of a single plane.
///
/// The lookup table starts at the first occupied bin, so the darkest value
/// maps to 0 and the brightest to 255. A plane with only one distinct value
/// is returned unchanged.
pub fn equalize_hist(plane: ArrayView2<u8>) -> Array2<u8> {
    let hist = histogram(plane);
    let total = plane.len() as u32;

    let first = hist.iter().position(|&h| h > 0).unwrap_or(0);
    if hist[first] == total {
        return plane.to_owned();
    }

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for i in (first + 1)..256 {
        sum += hist[i];
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }

    plane.mapv(|v| lut[v as usize])
}

// ============================================================================
// CLAHE
// ============================================================================

/// Contrast-limited adaptive histogram equalization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Histogram clip limit relative to a uniform distribution.
    pub clip_limit: f32,
    /// Number of tiles along (x, y).
    pub tiles: (usize, usize),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tiles: (8, 8),
        }
    }
}

/// Clip a tile histogram and redistribute the excess evenly.
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut clipped = 0u32;
    for h in hist.iter_mut() {
        if *h > limit {
            clipped += *h - limit;
            *h = limit;
        }
    }

    let batch = clipped / 256;
    let mut residual = clipped - batch * 256;
    for h in hist.iter_mut() {
        *h += batch;
    }

    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Apply CLAHE to a single plane.
///
/// The plane is split into a `tiles.0 x tiles.1` grid (padded with a
/// reflected border when the size is not divisible). Each tile gets its own
/// clipped equalization table and pixels blend the four nearest tables
/// bilinearly.
pub fn clahe(plane: ArrayView2<u8>, params: ClaheParams) -> Array2<u8> {
    let (height, width) = plane.dim();
    let tiles_x = params.tiles.0.max(1);
    let tiles_y = params.tiles.1.max(1);

    let padded_w = width.div_ceil(tiles_x) * tiles_x;
    let padded_h = height.div_ceil(tiles_y) * tiles_y;
    let tile_w = padded_w / tiles_x;
    let tile_h = padded_h / tiles_y;
    let tile_area = (tile_w * tile_h) as u32;

    let source = if padded_w != width || padded_h != height {
        Array2::from_shape_fn((padded_h, padded_w), |(y, x)| {
            let sy = BorderMode::Reflect101.index(y as isize, height);
            let sx = BorderMode::Reflect101.index(x as isize, width);
            plane[[sy, sx]]
        })
    } else {
        plane.to_owned()
    };

    let limit = if params.clip_limit > 0.0 {
        ((params.clip_limit * tile_area as f32 / 256.0) as u32).max(1)
    } else {
        u32::MAX
    };
    let lut_scale = 255.0 / tile_area as f32;

    // One equalization table per tile, row-major over the grid
    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let tile = source.slice(ndarray::s![
                ty * tile_h..(ty + 1) * tile_h,
                tx * tile_w..(tx + 1) * tile_w
            ]);
            let mut hist = histogram(tile);
            clip_histogram(&mut hist, limit);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0u32;
            for i in 0..256 {
                sum += hist[i];
                lut[i] = (sum as f32 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    Array2::from_shape_fn((height, width), |(y, x)| {
        let v = plane[[y, x]] as usize;

        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = (ty1 + 1).min(tiles_y as isize - 1) as usize;
        let ty1 = ty1.max(0) as usize;

        let txf = x as f32 * inv_tw - 0.5;
        let tx1 = txf.floor() as isize;
        let xa = txf - tx1 as f32;
        let tx2 = (tx1 + 1).min(tiles_x as isize - 1) as usize;
        let tx1 = tx1.max(0) as usize;

        let lut = |ty: usize, tx: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
        let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
        (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8
    })
}
