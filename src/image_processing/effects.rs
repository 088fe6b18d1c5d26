/// Creative per-pixel and per-tile effects.
///
/// Every effect takes a buffer and returns a new one of the same size.
/// Invalid parameters are clamped to the nearest usable value instead of
/// failing.
use rand::Rng;

use super::buffer::PixelBuffer;
use super::glitch::apply_glitch;
use super::options::Effect;

/// Run a single effect from the chain.
///
/// [`Effect::Unknown`] returns the input unchanged.
pub fn apply_effect<R: Rng + ?Sized>(img: &PixelBuffer, effect: &Effect, rng: &mut R) -> PixelBuffer {
    match *effect {
        Effect::Glitch {
            intensity,
            block_size,
        } => apply_glitch(img, intensity, block_size, rng),
        Effect::Posterize { levels } => apply_posterize(img, levels),
        Effect::Invert => apply_invert(img),
        Effect::Mosaic { tile_size } => apply_mosaic(img, tile_size),
        Effect::Chromatic { offset } => apply_chromatic_aberration(img, offset),
        Effect::Unknown => img.clone(),
    }
}

/// Quantize each channel to `levels` evenly spaced steps.
///
/// `levels` is clamped to `[2, 256]`.
pub fn apply_posterize(img: &PixelBuffer, levels: u32) -> PixelBuffer {
    let levels = levels.clamp(2, 256);
    let step = 255.0 / (levels - 1) as f32;
    let mut output = img.clone();

    let mut lut = [0u8; 256];
    for (value, entry) in lut.iter_mut().enumerate() {
        let snapped = (value as f32 / step).round() * step;
        *entry = super::buffer::clamp_channel(snapped);
    }

    for pixel in output.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
        pixel[1] = lut[pixel[1] as usize];
        pixel[2] = lut[pixel[2] as usize];
    }

    output
}

/// `255 - value` on R, G and B.
pub fn apply_invert(img: &PixelBuffer) -> PixelBuffer {
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
    }
    output
}

/// Replace each `tile_size` square with its rounded mean color.
///
/// Edge tiles average only the pixels that exist. Each pixel keeps its own
/// alpha. `tile_size` below 1 is treated as 1.
pub fn apply_mosaic(img: &PixelBuffer, tile_size: u32) -> PixelBuffer {
    let tile_size = tile_size.max(1);
    let (width, height) = img.dimensions();
    let mut output = img.clone();

    for tile_y in (0..height).step_by(tile_size as usize) {
        for tile_x in (0..width).step_by(tile_size as usize) {
            let end_x = (tile_x + tile_size).min(width);
            let end_y = (tile_y + tile_size).min(height);

            let mut total = [0u64; 3];
            let mut pixel_count = 0u64;

            for y in tile_y..end_y {
                for x in tile_x..end_x {
                    let [r, g, b, _] = img.read_pixel(x, y);
                    total[0] += r as u64;
                    total[1] += g as u64;
                    total[2] += b as u64;
                    pixel_count += 1;
                }
            }

            let average = |sum: u64| (sum as f64 / pixel_count as f64).round() as u8;
            let (avg_r, avg_g, avg_b) = (average(total[0]), average(total[1]), average(total[2]));

            for y in tile_y..end_y {
                for x in tile_x..end_x {
                    let alpha = img.read_pixel(x, y)[3];
                    output.put_pixel(x, y, [avg_r, avg_g, avg_b, alpha]);
                }
            }
        }
    }

    output
}

/// Split the color channels horizontally.
///
/// Red is sampled from `x - offset`, green from `x`, blue from `x + offset`,
/// each clamped to the row. Alpha follows the green sample.
pub fn apply_chromatic_aberration(img: &PixelBuffer, offset: i32) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut output = img.clone();
    let max_x = width as i64 - 1;

    for y in 0..height {
        for x in 0..width {
            let red_x = (x as i64 - offset as i64).clamp(0, max_x) as u32;
            let blue_x = (x as i64 + offset as i64).clamp(0, max_x) as u32;

            let red = img.read_pixel(red_x, y);
            let green = img.read_pixel(x, y);
            let blue = img.read_pixel(blue_x, y);

            output.put_pixel(x, y, [red[0], green[1], blue[2], green[3]]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_image(width: u32, height: u32) -> PixelBuffer {
        let mut rng = StdRng::seed_from_u64(11);
        let mut img = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, [rng.random(), rng.random(), rng.random(), rng.random()]);
            }
        }
        img
    }

    #[test]
    fn test_posterize_idempotent() {
        let img = sample_image(16, 16);
        for levels in [2, 3, 4, 5, 7, 16, 255, 256] {
            let once = apply_posterize(&img, levels);
            let twice = apply_posterize(&once, levels);
            assert_eq!(once, twice, "levels = {}", levels);
        }
    }

    #[test]
    fn test_posterize_levels() {
        let img = sample_image(32, 32);
        let out = apply_posterize(&img, 4);
        for (src, dst) in img.pixels().zip(out.pixels()) {
            for c in 0..3 {
                assert!([0, 85, 170, 255].contains(&dst[c]));
            }
            assert_eq!(src[3], dst[3]);
        }
        // levels < 2 clamps to 2
        let binary = apply_posterize(&img, 0);
        assert!(binary.pixels().all(|p| p[..3].iter().all(|&c| c == 0 || c == 255)));
    }

    #[test]
    fn test_invert_round_trip() {
        let img = sample_image(9, 5);
        let inverted = apply_invert(&img);
        assert_ne!(inverted, img);
        assert_eq!(apply_invert(&inverted), img);
        assert_eq!(
            apply_invert(&PixelBuffer::filled(1, 1, [0, 100, 255, 42]).unwrap()).read_pixel(0, 0),
            [255, 155, 0, 42]
        );
    }

    #[test]
    fn test_mosaic_full_tiles_are_uniform() {
        let img = sample_image(10, 10);
        let out = apply_mosaic(&img, 4);

        // Tiles at (0,0), (4,0), (0,4), (4,4) lie fully inside the 10x10 image.
        for (tx, ty) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
            let [r, g, b, _] = out.read_pixel(tx, ty);
            for y in ty..ty + 4 {
                for x in tx..tx + 4 {
                    assert_eq!(out.read_pixel(x, y)[..3], [r, g, b]);
                }
            }
        }
    }

    #[test]
    fn test_mosaic_edge_tile_averages_in_bounds_only() {
        let mut img = PixelBuffer::filled(3, 1, [0, 0, 0, 255]).unwrap();
        img.put_pixel(2, 0, [100, 51, 7, 255]);
        // Tile size 2: tiles [0,1] and the edge tile [2] alone.
        let out = apply_mosaic(&img, 2);
        assert_eq!(out.read_pixel(2, 0), [100, 51, 7, 255]);
        assert_eq!(out.read_pixel(0, 0), [0, 0, 0, 255]);

        let mut img = PixelBuffer::filled(2, 1, [10, 10, 10, 255]).unwrap();
        img.put_pixel(1, 0, [11, 20, 0, 7]);
        let out = apply_mosaic(&img, 0);
        // tile_size 0 behaves like 1: nothing changes.
        assert_eq!(out, img);
        let out = apply_mosaic(&img, 8);
        // (10 + 11) / 2 = 10.5 rounds up, alpha kept per pixel
        assert_eq!(out.read_pixel(0, 0), [11, 15, 5, 255]);
        assert_eq!(out.read_pixel(1, 0), [11, 15, 5, 7]);
    }

    #[test]
    fn test_chromatic_aberration_channels() {
        let mut img = PixelBuffer::new(5, 1).unwrap();
        for x in 0..5 {
            let v = (x * 10) as u8;
            img.put_pixel(x, 0, [v, v + 1, v + 2, 200 + x as u8]);
        }
        let out = apply_chromatic_aberration(&img, 2);

        // x = 2: red from 0, green from 2, blue from 4
        assert_eq!(out.read_pixel(2, 0), [0, 21, 42, 202]);
        // x = 0: red clamps to 0, blue from 2
        assert_eq!(out.read_pixel(0, 0), [0, 1, 22, 200]);
        // x = 4: red from 2, blue clamps to 4
        assert_eq!(out.read_pixel(4, 0), [20, 41, 42, 204]);

        assert_eq!(apply_chromatic_aberration(&img, 0), img);
    }

    #[test]
    fn test_unknown_effect_is_passthrough() {
        let img = sample_image(4, 4);
        let out = apply_effect(&img, &Effect::Unknown, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, img);
    }
}
