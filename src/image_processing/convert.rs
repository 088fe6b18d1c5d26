use rand::Rng;

use super::buffer::PixelBuffer;
use super::dithering::{
    apply_atkinson_dithering, apply_floyd_steinberg_dithering, apply_sierra_dithering,
};
use super::options::{DitherMethod, DitheringOptions};
use super::ordered::{apply_jitter_dithering, apply_ordered_dithering, apply_threshold_dithering};

/// Reduce an image to its palette with the configured dithering method
///
/// Every method returns a buffer of the same size whose RGB values are all
/// palette entries, with alpha copied from the input. Selectors that cannot be
/// recognized have already been mapped to Floyd-Steinberg when the options
/// were parsed.
pub fn apply_dithering<R: Rng + ?Sized>(
    img: &PixelBuffer,
    options: &DitheringOptions,
    rng: &mut R,
) -> PixelBuffer {
    let palette = &options.palette;
    match options.method {
        DitherMethod::FloydSteinberg => apply_floyd_steinberg_dithering(img, palette),
        DitherMethod::Atkinson => apply_atkinson_dithering(img, palette),
        DitherMethod::Sierra => apply_sierra_dithering(img, palette),
        DitherMethod::Ordered => apply_ordered_dithering(img, palette, options.bayer_size),
        DitherMethod::Jitter => apply_jitter_dithering(img, palette, options.jitter_amount, rng),
        DitherMethod::Threshold => apply_threshold_dithering(img, palette, options.threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::palette::Palette;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noise_image(width: u32, height: u32) -> PixelBuffer {
        let mut rng = StdRng::seed_from_u64(99);
        let mut img = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, [rng.random(), rng.random(), rng.random(), rng.random()]);
            }
        }
        img
    }

    #[test]
    fn test_every_method_maps_onto_palette() {
        let img = noise_image(13, 7);
        let palette =
            Palette::from_hex(&["#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00"])
                .unwrap();

        for method in DitherMethod::ALL {
            let options = DitheringOptions::new(method, palette.clone());
            let out = apply_dithering(&img, &options, &mut StdRng::seed_from_u64(3));

            assert_eq!(out.dimensions(), img.dimensions(), "{}", method);
            for (src, dst) in img.pixels().zip(out.pixels()) {
                assert!(
                    palette.colors().contains(&(dst[0], dst[1], dst[2])),
                    "{} produced {:?}",
                    method,
                    dst
                );
                assert_eq!(src[3], dst[3], "{} changed alpha", method);
            }
        }
    }

    #[test]
    fn test_unknown_selector_matches_floyd_steinberg() {
        let img = noise_image(8, 8);
        let parsed: DitheringOptions =
            serde_json::from_str(r##"{"method": "blue-noise", "palette": ["#000000", "#FFFFFF"]}"##)
                .unwrap();
        let fallback = apply_dithering(&img, &parsed, &mut StdRng::seed_from_u64(0));
        let expected = apply_floyd_steinberg_dithering(&img, &Palette::default());
        assert_eq!(fallback, expected);
    }
}
