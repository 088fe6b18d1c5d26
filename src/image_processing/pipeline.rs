//! The per-frame pipeline: scale, tone, effects in order, then dithering.

use rand::Rng;

use super::buffer::PixelBuffer;
use super::convert::apply_dithering;
use super::effects::apply_effect;
use super::options::ProcessingOptions;
use super::resize::scale;
use super::tone::apply_tone;

/// Run every configured stage on one buffer, drawing randomness from `rng`.
pub fn process_frame_with_rng<R: Rng + ?Sized>(
    buffer: PixelBuffer,
    options: &ProcessingOptions,
    rng: &mut R,
) -> PixelBuffer {
    let tone = options.tone.clamped();

    let mut current = scale(buffer, tone.scale);
    if !tone.is_identity() {
        current = apply_tone(&current, &tone);
    }

    for effect in &options.effects {
        current = apply_effect(&current, effect, rng);
    }

    match &options.dithering {
        Some(dithering) => apply_dithering(&current, dithering, rng),
        None => current,
    }
}

/// [`process_frame_with_rng`] with the thread-local generator.
pub fn process_frame(buffer: PixelBuffer, options: &ProcessingOptions) -> PixelBuffer {
    process_frame_with_rng(buffer, options, &mut rand::rng())
}
