/// Error-diffusion dithering: Floyd-Steinberg, Atkinson and Sierra.
///
/// All three share one raster-order loop and differ only in their diffusion
/// kernel. The error is written back into the working copy as it goes, so
/// each pixel sees the error accumulated from everything before it. That
/// dependency is what makes these methods strictly sequential within a frame.
use super::buffer::PixelBuffer;
use super::palette::{nearest_palette_color, Palette};

/// A fixed diffusion stencil: `(dx, dy, weight)` taps divided by `divisor`.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionKernel {
    pub name: &'static str,
    pub taps: &'static [(i32, i32, f32)],
    pub divisor: f32,
}

impl DiffusionKernel {
    /// Share of the quantization error the kernel hands on (1.0 = all of it).
    pub fn diffused_fraction(&self) -> f32 {
        self.taps.iter().map(|&(_, _, w)| w).sum::<f32>() / self.divisor
    }
}

/// Floyd-Steinberg error distribution:
/// ```text
///         *   7/16
///  3/16 5/16  1/16
/// ```
pub const FLOYD_STEINBERG: DiffusionKernel = DiffusionKernel {
    name: "floyd-steinberg",
    taps: &[(1, 0, 7.0), (-1, 1, 3.0), (0, 1, 5.0), (1, 1, 1.0)],
    divisor: 16.0,
};

/// Atkinson error distribution (only 6/8 of the error is diffused):
/// ```text
///         *   1/8  1/8
///   1/8  1/8  1/8
///        1/8
/// ```
pub const ATKINSON: DiffusionKernel = DiffusionKernel {
    name: "atkinson",
    taps: &[
        (1, 0, 1.0),
        (2, 0, 1.0),
        (-1, 1, 1.0),
        (0, 1, 1.0),
        (1, 1, 1.0),
        (0, 2, 1.0),
    ],
    divisor: 8.0,
};

/// Sierra (three-row) error distribution:
/// ```text
///                *    5/32  3/32
///  2/32  4/32  5/32  4/32  2/32
///        2/32  3/32  2/32
/// ```
pub const SIERRA: DiffusionKernel = DiffusionKernel {
    name: "sierra",
    taps: &[
        (1, 0, 5.0),
        (2, 0, 3.0),
        (-2, 1, 2.0),
        (-1, 1, 4.0),
        (0, 1, 5.0),
        (1, 1, 4.0),
        (2, 1, 2.0),
        (-1, 2, 2.0),
        (0, 2, 3.0),
        (1, 2, 2.0),
    ],
    divisor: 32.0,
};

pub fn apply_floyd_steinberg_dithering(img: &PixelBuffer, palette: &Palette) -> PixelBuffer {
    apply_error_diffusion(img, palette, &FLOYD_STEINBERG)
}

/// Atkinson dithering - keeps highlights and shadows open because a quarter of
/// the error is discarded.
pub fn apply_atkinson_dithering(img: &PixelBuffer, palette: &Palette) -> PixelBuffer {
    apply_error_diffusion(img, palette, &ATKINSON)
}

/// Sierra dithering - wide three-row kernel, smoother gradients.
pub fn apply_sierra_dithering(img: &PixelBuffer, palette: &Palette) -> PixelBuffer {
    apply_error_diffusion(img, palette, &SIERRA)
}

/// Single raster-order pass of error diffusion with the given kernel.
///
/// Each pixel's RGB is replaced by its nearest palette color and the error
/// (original minus quantized) is spread over the not-yet-visited neighbors.
/// Taps that land outside the image are dropped. Alpha is untouched.
pub fn apply_error_diffusion(
    img: &PixelBuffer,
    palette: &Palette,
    kernel: &DiffusionKernel,
) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let mut working = img.clone();

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = working.read_pixel(x, y);
            let (r, g, b) = (r as f32, g as f32, b as f32);

            let (pr, pg, pb) = nearest_palette_color(r, g, b, palette);
            working.put_pixel(x, y, [pr, pg, pb, a]);

            let error_r = r - pr as f32;
            let error_g = g - pg as f32;
            let error_b = b - pb as f32;

            if error_r == 0.0 && error_g == 0.0 && error_b == 0.0 {
                continue;
            }

            diffuse_error(&mut working, x, y, [error_r, error_g, error_b], kernel);
        }
    }

    working
}

/// Add `error * weight / divisor` to every in-bounds tap around `(x, y)`.
fn diffuse_error(
    working: &mut PixelBuffer,
    x: u32,
    y: u32,
    error: [f32; 3],
    kernel: &DiffusionKernel,
) {
    let (width, height) = working.dimensions();
    for &(dx, dy, weight) in kernel.taps {
        let target_x = x as i64 + dx as i64;
        let target_y = y as i64 + dy as i64;
        if target_x < 0 || target_y < 0 || target_x >= width as i64 || target_y >= height as i64 {
            continue;
        }
        let (tx, ty) = (target_x as u32, target_y as u32);
        let factor = weight / kernel.divisor;

        let [nr, ng, nb, na] = working.read_pixel(tx, ty);
        working.write_pixel(
            tx,
            ty,
            [
                nr as f32 + error[0] * factor,
                ng as f32 + error[1] * factor,
                nb as f32 + error[2] * factor,
            ],
            na,
        );
    }
}
