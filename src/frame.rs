//! In-memory pixel buffer shared by every filter.
//!
//! A `Frame` is an `(height, width, channels)` array of `u8`. Color frames have
//! three channels in B, G, R order; single-channel frames only appear as
//! intermediates (grayscale, masks). Width and height are always non-zero.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{FilterError, FilterResult};

/// Owned 8-bit pixel grid with 1 or 3 channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Array3<u8>,
}

impl Frame {
    /// Wrap an existing array, validating size and channel count.
    pub fn from_array(data: Array3<u8>) -> FilterResult<Self> {
        let (height, width, channels) = data.dim();
        if height == 0 || width == 0 {
            return Err(FilterError::invalid_frame(format!(
                "frame must have non-zero size, got {}x{}",
                width, height
            )));
        }
        if channels != 1 && channels != 3 {
            return Err(FilterError::invalid_frame(format!(
                "frame must have 1 or 3 channels, got {}",
                channels
            )));
        }
        Ok(Self { data })
    }

    /// Build a frame from a row-major interleaved buffer, as handed over by a decoder.
    pub fn from_raw(width: usize, height: usize, channels: usize, pixels: Vec<u8>) -> FilterResult<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                FilterError::invalid_frame(format!(
                    "frame size {}x{}x{} overflows",
                    width, height, channels
                ))
            })?;
        if pixels.len() != expected {
            return Err(FilterError::invalid_frame(format!(
                "buffer holds {} bytes, expected {} for {}x{}x{}",
                pixels.len(),
                expected,
                width,
                height,
                channels
            )));
        }
        let data = Array3::from_shape_vec((height, width, channels), pixels)
            .map_err(|e| FilterError::invalid_frame(e.to_string()))?;
        Self::from_array(data)
    }

    /// Frame with every pixel set to the same BGR value.
    pub fn filled(width: usize, height: usize, bgr: [u8; 3]) -> FilterResult<Self> {
        let data = Array3::from_shape_fn((height, width, 3), |(_, _, c)| bgr[c]);
        Self::from_array(data)
    }

    /// Single-channel frame from a 2D plane.
    pub fn from_plane(plane: Array2<u8>) -> FilterResult<Self> {
        Self::from_array(plane.insert_axis(Axis(2)))
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// `(width, height)` of the frame.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn is_color(&self) -> bool {
        self.channels() == 3
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// View of one channel as a 2D plane.
    pub fn plane(&self, channel: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(2), channel)
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }

    pub fn into_array(self) -> Array3<u8> {
        self.data
    }

    /// Interleaved row-major bytes, for handing to an encoder.
    pub fn into_raw(self) -> Vec<u8> {
        if self.data.is_standard_layout() {
            self.data.into_raw_vec_and_offset().0
        } else {
            self.data.iter().copied().collect()
        }
    }

    /// Pixel value at `(x, y)` for channel `c`.
    pub fn get(&self, x: usize, y: usize, c: usize) -> u8 {
        self.data[[y, x, c]]
    }

    /// Fail unless this is a 3-channel frame.
    pub fn require_color(&self) -> FilterResult<()> {
        if self.is_color() {
            Ok(())
        } else {
            Err(FilterError::invalid_frame(format!(
                "expected a 3-channel frame, got {} channel(s)",
                self.channels()
            )))
        }
    }

    /// Fail unless this is a single-channel frame.
    pub fn require_gray(&self) -> FilterResult<()> {
        if self.channels() == 1 {
            Ok(())
        } else {
            Err(FilterError::invalid_frame(format!(
                "expected a 1-channel frame, got {} channels",
                self.channels()
            )))
        }
    }
}
