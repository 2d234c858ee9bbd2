//! Additive noise.
//!
//! Randomness always comes from a caller-supplied generator so results are
//! reproducible for a given seed and concurrent calls never share state.

use ndarray::{Array3, ArrayView3};
use rand::Rng;

/// Add independent uniform noise in `[0, amplitude)` to every channel of
/// every pixel, saturating at 255.
///
/// Samples are drawn in row-major, channel-minor order. An amplitude of 0
/// returns an unchanged copy without consuming the generator.
pub fn add_uniform_noise<R: Rng + ?Sized>(input: ArrayView3<u8>, amplitude: u8, rng: &mut R) -> Array3<u8> {
    if amplitude == 0 {
        return input.to_owned();
    }

    let (height, width, channels) = input.dim();
    let mut output = Array3::<u8>::zeros((height, width, channels));
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let noise: u8 = rng.gen_range(0..amplitude);
                output[[y, x, c]] = input[[y, x, c]].saturating_add(noise);
            }
        }
    }
    output
}
