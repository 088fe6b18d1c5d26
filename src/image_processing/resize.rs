use super::buffer::{index_of, PixelBuffer, CHANNELS};
use super::options::SCALE_RANGE;

/// Output dimensions for a scale factor: `round(w * s) x round(h * s)`, at least 1x1.
pub fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let factor = factor as f64;
    let w = ((width as f64 * factor).round() as u32).max(1);
    let h = ((height as f64 * factor).round() as u32).max(1);
    (w, h)
}

/// Nearest-neighbor resize by `factor`.
///
/// Hard pixel edges are kept on purpose; smoothing would fight the dithered
/// look. The factor is clamped to `[0.1, 10]`. A factor of exactly 1 hands the
/// input back without copying.
pub fn scale(img: PixelBuffer, factor: f32) -> PixelBuffer {
    let factor = if factor.is_nan() {
        1.0
    } else {
        factor.clamp(SCALE_RANGE.0, SCALE_RANGE.1)
    };
    if factor == 1.0 {
        return img;
    }

    let (src_width, src_height) = img.dimensions();
    let (dst_width, dst_height) = scaled_dimensions(src_width, src_height, factor);
    let inv_scale = 1.0 / factor as f64;

    // Column lookup is the same for every row.
    let src_columns: Vec<u32> = (0..dst_width)
        .map(|x| ((x as f64 * inv_scale).floor() as u32).min(src_width - 1))
        .collect();

    let src = img.as_raw();
    let mut data = Vec::with_capacity(dst_width as usize * dst_height as usize * CHANNELS);

    for y in 0..dst_height {
        let src_y = ((y as f64 * inv_scale).floor() as u32).min(src_height - 1);
        for &src_x in &src_columns {
            let i = index_of(src_x, src_y, src_width);
            data.extend_from_slice(&src[i..i + CHANNELS]);
        }
    }

    // Output dimensions are at least 1x1, so this only falls back on a
    // length mismatch, which the loops above rule out.
    PixelBuffer::from_raw(dst_width, dst_height, data).unwrap_or(img)
}
