/// Point-wise dithering: ordered (Bayer), jitter and threshold.
///
/// Unlike error diffusion, every output pixel depends only on its own input
/// value and position, so these methods need no working state.
use rand::Rng;

use super::buffer::{grayscale, PixelBuffer};
use super::options::BayerSize;
use super::palette::{nearest_palette_color, Palette};

pub const BAYER_2X2: [[u8; 2]; 2] = [[0, 2], [3, 1]];

pub const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

pub const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 48, 12, 60, 3, 51, 15, 63],
    [32, 16, 44, 28, 35, 19, 47, 31],
    [8, 56, 4, 52, 11, 59, 7, 55],
    [40, 24, 36, 20, 43, 27, 39, 23],
    [2, 50, 14, 62, 1, 49, 13, 61],
    [34, 18, 46, 30, 33, 17, 45, 29],
    [10, 58, 6, 54, 9, 57, 5, 53],
    [42, 26, 38, 22, 41, 25, 37, 21],
];

/// Raw matrix entry for `(x, y)`, in `0..size²`.
pub fn bayer_value(size: BayerSize, x: u32, y: u32) -> u8 {
    match size {
        BayerSize::Two => BAYER_2X2[(y % 2) as usize][(x % 2) as usize],
        BayerSize::Four => BAYER_4X4[(y % 4) as usize][(x % 4) as usize],
        BayerSize::Eight => BAYER_8X8[(y % 8) as usize][(x % 8) as usize],
    }
}

/// Offset added to each channel at `(x, y)`: the matrix entry normalized to
/// `[-0.5, 0.5)` and scaled by 128.
pub fn bayer_offset(size: BayerSize, x: u32, y: u32) -> f32 {
    let side = size.side();
    let cells = (side * side) as f32;
    (bayer_value(size, x, y) as f32 / cells - 0.5) * 128.0
}

/// Ordered dithering with a Bayer matrix (less noise, regular cross-hatch texture)
pub fn apply_ordered_dithering(img: &PixelBuffer, palette: &Palette, size: BayerSize) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut output = img.clone();

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = img.read_pixel(x, y);
            let offset = bayer_offset(size, x, y);

            let (pr, pg, pb) = nearest_palette_color(
                r as f32 + offset,
                g as f32 + offset,
                b as f32 + offset,
                palette,
            );

            output.put_pixel(x, y, [pr, pg, pb, a]);
        }
    }

    output
}

/// Random dithering: one uniform draw per pixel, shared by R, G and B.
///
/// The offset is `(u - 0.5) * amount * 64` with `u` in `[0, 1)`. Negative
/// amounts are treated as zero.
pub fn apply_jitter_dithering<R: Rng + ?Sized>(
    img: &PixelBuffer,
    palette: &Palette,
    amount: f32,
    rng: &mut R,
) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut output = img.clone();
    let jitter_strength = if amount.is_finite() { amount.max(0.0) } else { 0.0 } * 64.0;

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = img.read_pixel(x, y);
            let random_factor = (rng.random::<f32>() - 0.5) * jitter_strength;

            let (pr, pg, pb) = nearest_palette_color(
                r as f32 + random_factor,
                g as f32 + random_factor,
                b as f32 + random_factor,
                palette,
            );

            output.put_pixel(x, y, [pr, pg, pb, a]);
        }
    }

    output
}

/// Binary split on luma: above `threshold` becomes the palette color closest
/// to white, at or below becomes the one closest to black.
pub fn apply_threshold_dithering(img: &PixelBuffer, palette: &Palette, threshold: f32) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut output = img.clone();

    let light = nearest_palette_color(255.0, 255.0, 255.0, palette);
    let dark = nearest_palette_color(0.0, 0.0, 0.0, palette);

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = img.read_pixel(x, y);
            let luma = grayscale(r as f32, g as f32, b as f32);

            let (pr, pg, pb) = if luma > threshold { light } else { dark };
            output.put_pixel(x, y, [pr, pg, pb, a]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(width: u32, height: u32) -> PixelBuffer {
        let mut img = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y * width) * 255 / (width * height - 1)) as u8;
                img.put_pixel(x, y, [v, v, v, 128]);
            }
        }
        img
    }

    #[test]
    fn test_bayer_matrices_are_permutations() {
        for size in [BayerSize::Two, BayerSize::Four, BayerSize::Eight] {
            let side = size.side();
            let mut seen = vec![false; (side * side) as usize];
            for y in 0..side {
                for x in 0..side {
                    seen[bayer_value(size, x, y) as usize] = true;
                }
            }
            assert!(seen.iter().all(|&s| s), "{:?}", size);
        }
    }

    #[test]
    fn test_bayer_offset_range_and_tiling() {
        assert_eq!(bayer_offset(BayerSize::Four, 0, 0), -64.0);
        assert_eq!(bayer_offset(BayerSize::Four, 4, 4), -64.0);
        // 15/16 - 0.5 = 0.4375 -> 56
        assert_eq!(bayer_offset(BayerSize::Four, 0, 3), 56.0);
        assert_eq!(bayer_offset(BayerSize::Two, 1, 0), 0.0);
    }

    #[test]
    fn test_ordered_output_in_palette() {
        let palette = Palette::from_hex(&["#000000", "#777777", "#FFFFFF"]).unwrap();
        for size in [BayerSize::Two, BayerSize::Four, BayerSize::Eight] {
            let out = apply_ordered_dithering(&ramp(12, 12), &palette, size);
            assert_eq!(out.dimensions(), (12, 12));
            for p in out.pixels() {
                assert!(palette.colors().contains(&(p[0], p[1], p[2])));
                assert_eq!(p[3], 128);
            }
        }
    }

    #[test]
    fn test_ordered_is_deterministic() {
        let img = ramp(9, 9);
        let a = apply_ordered_dithering(&img, &Palette::default(), BayerSize::Eight);
        let b = apply_ordered_dithering(&img, &Palette::default(), BayerSize::Eight);
        assert_eq!(a, b);
    }

    #[test]
    fn test_jitter_seeded_reproducible_and_in_palette() {
        let img = ramp(10, 10);
        let palette = Palette::default();
        let a = apply_jitter_dithering(&img, &palette, 0.5, &mut StdRng::seed_from_u64(7));
        let b = apply_jitter_dithering(&img, &palette, 0.5, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        for p in a.pixels() {
            assert!(palette.colors().contains(&(p[0], p[1], p[2])));
        }
    }

    #[test]
    fn test_jitter_zero_amount_is_plain_quantization() {
        let img = ramp(6, 6);
        let out = apply_jitter_dithering(&img, &Palette::default(), 0.0, &mut StdRng::seed_from_u64(1));
        for (src, dst) in img.pixels().zip(out.pixels()) {
            let expected = if src[0] > 127 { 255 } else { 0 };
            assert_eq!(dst[0], expected);
        }
    }

    #[test]
    fn test_threshold_boundary_goes_dark() {
        let palette = Palette::default();
        let img = PixelBuffer::filled(1, 1, [90, 140, 200, 255]).unwrap();
        let threshold = grayscale(90.0, 140.0, 200.0);

        let at = apply_threshold_dithering(&img, &palette, threshold);
        assert_eq!(at.read_pixel(0, 0), [0, 0, 0, 255]);

        let below = apply_threshold_dithering(&img, &palette, threshold - 0.01);
        assert_eq!(below.read_pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_threshold_uses_nearest_to_black_and_white() {
        let palette = Palette::from_hex(&["#202020", "#E0E0E0", "#FF0000"]).unwrap();
        let mut img = PixelBuffer::new(2, 1).unwrap();
        img.put_pixel(0, 0, [10, 10, 10, 255]);
        img.put_pixel(1, 0, [250, 250, 250, 255]);
        let out = apply_threshold_dithering(&img, &palette, 128.0);
        assert_eq!(out.read_pixel(0, 0), [0x20, 0x20, 0x20, 255]);
        assert_eq!(out.read_pixel(1, 0), [0xE0, 0xE0, 0xE0, 255]);
    }
}
