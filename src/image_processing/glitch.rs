/// Digital glitch effect
///
/// The image is split into `block_size` squares. Each block, with probability
/// `intensity`, gets one of four random corruptions. Two image-wide passes
/// follow: a random per-row red/blue channel shift and periodic scan-line
/// darkening.
///
/// All work happens in place on a fresh copy, so later blocks can read pixels
/// that earlier blocks already corrupted.
use rand::Rng;

use super::buffer::{clamp_channel, index_of, PixelBuffer};

pub fn apply_glitch<R: Rng + ?Sized>(
    img: &PixelBuffer,
    intensity: f32,
    block_size: u32,
    rng: &mut R,
) -> PixelBuffer {
    let intensity = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    };
    let block_size = block_size.max(1);
    let (width, height) = img.dimensions();
    let mut data = img.clone().into_raw();

    for start_y in (0..height).step_by(block_size as usize) {
        for start_x in (0..width).step_by(block_size as usize) {
            if rng.random::<f32>() < intensity {
                let block = Block {
                    start_x,
                    start_y,
                    end_x: (start_x + block_size).min(width),
                    end_y: (start_y + block_size).min(height),
                };
                glitch_block(&mut data, width, block, block_size, rng);
            }
        }
    }

    apply_color_shift(&mut data, width, height, intensity, rng);
    apply_scan_lines(&mut data, width, height, intensity);

    PixelBuffer::from_raw(width, height, data).unwrap_or_else(|_| img.clone())
}

#[derive(Debug, Clone, Copy)]
struct Block {
    start_x: u32,
    start_y: u32,
    end_x: u32,
    end_y: u32,
}

impl Block {
    fn coords(self) -> impl Iterator<Item = (u32, u32)> {
        (self.start_y..self.end_y)
            .flat_map(move |y| (self.start_x..self.end_x).map(move |x| (x, y)))
    }
}

fn glitch_block<R: Rng + ?Sized>(
    data: &mut [u8],
    width: u32,
    block: Block,
    block_size: u32,
    rng: &mut R,
) {
    match rng.random_range(0..4u8) {
        // Horizontal displacement: copy RGB from a shifted column.
        0 => {
            let size = block_size as i64;
            let shift_amount = rng.random_range(-size..size);
            let max_x = width as i64 - 1;
            for (x, y) in block.coords() {
                let source_x = (x as i64 + shift_amount).clamp(0, max_x) as u32;
                let source_idx = index_of(source_x, y, width);
                let target_idx = index_of(x, y, width);
                data.copy_within(source_idx..source_idx + 3, target_idx);
            }
        }
        // Swap one channel with the next one (R<->G, G<->B or B<->R).
        1 => {
            let channel = rng.random_range(0..3usize);
            let next = (channel + 1) % 3;
            for (x, y) in block.coords() {
                let idx = index_of(x, y, width);
                data.swap(idx + channel, idx + next);
            }
        }
        // Coin flip between inversion and desaturation.
        2 => {
            let invert = rng.random::<f32>() > 0.5;
            for (x, y) in block.coords() {
                let idx = index_of(x, y, width);
                if invert {
                    for c in 0..3 {
                        data[idx + c] = 255 - data[idx + c];
                    }
                } else {
                    let sum = data[idx] as f32 + data[idx + 1] as f32 + data[idx + 2] as f32;
                    let avg = clamp_channel(sum / 3.0);
                    data[idx..idx + 3].fill(avg);
                }
            }
        }
        // Additive noise, same offset on all three channels of a pixel.
        _ => {
            let noise_intensity = rng.random::<f32>() * 100.0;
            for (x, y) in block.coords() {
                let idx = index_of(x, y, width);
                let noise = (rng.random::<f32>() - 0.5) * noise_intensity;
                for c in 0..3 {
                    data[idx + c] = clamp_channel(data[idx + c] as f32 + noise);
                }
            }
        }
    }
}

/// Rows picked with probability `intensity * 0.1` get their red channel
/// pulled from `shift` pixels to the right, and the displaced red value is
/// written into the blue channel of that source pixel. This is a one-way
/// cross-write, not a swap.
fn apply_color_shift<R: Rng + ?Sized>(
    data: &mut [u8],
    width: u32,
    height: u32,
    intensity: f32,
    rng: &mut R,
) {
    let shift_amount = (intensity * 10.0).floor() as u32;
    let max_x = width - 1;

    for y in 0..height {
        if rng.random::<f32>() < intensity * 0.1 {
            for x in 0..width {
                let idx = index_of(x, y, width);
                let shift_x = (x + shift_amount).min(max_x);
                let shift_idx = index_of(shift_x, y, width);

                let temp_r = data[idx];
                data[idx] = data[shift_idx];
                data[shift_idx + 2] = temp_r;
            }
        }
    }
}

/// Darken every `max(2, round((1 - intensity) * 5))`-th row by `intensity * 0.3`.
fn apply_scan_lines(data: &mut [u8], width: u32, height: u32, intensity: f32) {
    let line_spacing = scan_line_spacing(intensity);
    let darkness = intensity * 0.3;

    for y in (0..height).step_by(line_spacing as usize) {
        for x in 0..width {
            let idx = index_of(x, y, width);
            for c in 0..3 {
                data[idx + c] = clamp_channel(data[idx + c] as f32 * (1.0 - darkness));
            }
        }
    }
}

fn scan_line_spacing(intensity: f32) -> u32 {
    (((1.0 - intensity) * 5.0).round() as u32).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_image(width: u32, height: u32) -> PixelBuffer {
        let mut img = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, [(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8, 99]);
            }
        }
        img
    }

    #[test]
    fn test_seeded_glitch_is_reproducible() {
        let img = sample_image(40, 30);
        let a = apply_glitch(&img, 0.7, 8, &mut StdRng::seed_from_u64(42));
        let b = apply_glitch(&img, 0.7, 8, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), img.dimensions());
        assert_ne!(a, img);
    }

    #[test]
    fn test_glitch_keeps_alpha() {
        let img = sample_image(33, 17);
        let out = apply_glitch(&img, 1.0, 4, &mut StdRng::seed_from_u64(5));
        assert!(out.pixels().all(|p| p[3] == 99));
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        // No blocks fire, no rows shift, and scan lines darken by 0.
        let img = sample_image(20, 20);
        let out = apply_glitch(&img, 0.0, 16, &mut StdRng::seed_from_u64(9));
        assert_eq!(out, img);
    }

    #[test]
    fn test_scan_line_spacing() {
        assert_eq!(scan_line_spacing(0.0), 5);
        assert_eq!(scan_line_spacing(0.5), 3); // round(2.5) = 3
        assert_eq!(scan_line_spacing(0.9), 2);
        assert_eq!(scan_line_spacing(1.0), 2);
    }

    #[test]
    fn test_scan_lines_darken_rows() {
        let img = PixelBuffer::filled(4, 6, [200, 200, 200, 255]).unwrap();
        let mut data = img.into_raw();
        apply_scan_lines(&mut data, 4, 6, 1.0);
        let out = PixelBuffer::from_raw(4, 6, data).unwrap();
        // spacing 2, darkness 0.3 -> 140
        for y in 0..6 {
            let expected = if y % 2 == 0 { 140 } else { 200 };
            assert_eq!(out.read_pixel(0, y)[0], expected, "row {}", y);
        }
    }

    #[test]
    fn test_color_shift_cross_writes_red_into_blue() {
        // A single row with intensity 1.0 still only fires with p = 0.1, so
        // drive the helper directly with an always-true rng draw.
        struct Zero;
        impl rand::RngCore for Zero {
            fn next_u32(&mut self) -> u32 {
                0
            }
            fn next_u64(&mut self) -> u64 {
                0
            }
            fn fill_bytes(&mut self, dst: &mut [u8]) {
                dst.fill(0);
            }
        }

        let mut img = PixelBuffer::new(3, 1).unwrap();
        img.put_pixel(0, 0, [10, 0, 0, 255]);
        img.put_pixel(1, 0, [20, 0, 0, 255]);
        img.put_pixel(2, 0, [30, 0, 0, 255]);
        let mut data = img.into_raw();
        // intensity 0.1 -> shift floor(1.0) = 1
        apply_color_shift(&mut data, 3, 1, 0.1, &mut Zero);
        let out = PixelBuffer::from_raw(3, 1, data).unwrap();

        // x=0: red <- red(1)=20, blue(1) <- 10
        // x=1: red <- red(2)=30, blue(2) <- 20
        // x=2: shift clamps to itself: red stays 30, blue(2) <- 30
        assert_eq!(out.read_pixel(0, 0), [20, 0, 0, 255]);
        assert_eq!(out.read_pixel(1, 0), [30, 0, 10, 255]);
        assert_eq!(out.read_pixel(2, 0), [30, 0, 30, 255]);
    }
}
