use super::buffer::{clamp, PixelBuffer};
use super::options::ToneSettings;

/// Apply contrast to a single channel value.
/// contrast: -100 to 100
///   - Positive values push values away from middle gray (128)
///   - Negative values flatten towards middle gray
pub fn apply_contrast(value: f32, contrast: f32) -> f32 {
    let factor = (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast));
    clamp(factor * (value - 128.0) + 128.0, 0.0, 255.0)
}

/// Apply a midtone gamma curve to a single channel value.
/// midtones: -100 to 100, positive values brighten the midtones
pub fn apply_midtones(value: f32, midtones: f32) -> f32 {
    let normalized = value / 255.0;
    let adjusted = normalized.powf(1.0 - midtones / 100.0);
    clamp(adjusted * 255.0, 0.0, 255.0)
}

/// Lift (or pull down) the bright end of a single channel value.
/// highlights: -100 to 100
pub fn apply_highlights(value: f32, highlights: f32) -> f32 {
    let normalized = value / 255.0;
    let factor = highlights / 100.0;
    let adjusted = normalized + (1.0 - normalized) * factor;
    clamp(adjusted * 255.0, 0.0, 255.0)
}

/// Run contrast, midtones and highlights over every pixel, in that order.
///
/// Curves whose setting is zero are skipped. Settings are clamped to
/// `[-100, 100]` first. Alpha is left untouched and the scale field is ignored
/// here (see [`super::resize::scale`]).
pub fn apply_tone(img: &PixelBuffer, settings: &ToneSettings) -> PixelBuffer {
    let settings = settings.clamped();
    let mut output = img.clone();

    if settings.is_identity() {
        return output;
    }

    let curve = |mut v: f32| {
        if settings.contrast != 0.0 {
            v = apply_contrast(v, settings.contrast);
        }
        if settings.midtones != 0.0 {
            v = apply_midtones(v, settings.midtones);
        }
        if settings.highlights != 0.0 {
            v = apply_highlights(v, settings.highlights);
        }
        v
    };

    // Every channel value maps through the same curve, so tabulate it once.
    let mut lut = [0u8; 256];
    for (value, entry) in lut.iter_mut().enumerate() {
        *entry = super::buffer::clamp_channel(curve(value as f32));
    }

    for pixel in output.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
        pixel[1] = lut[pixel[1] as usize];
        pixel[2] = lut[pixel[2] as usize];
    }

    output
}
