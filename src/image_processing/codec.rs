//! File adapters between the `image` crate and the pixel pipeline.
//!
//! The pipeline itself never touches the filesystem; these helpers decode
//! inputs into [`PixelBuffer`] / [`AnimatedSequence`] and encode results back.

use anyhow::{Context, Result};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, DynamicImage, RgbaImage};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;

use super::buffer::{AnimatedSequence, Frame, PixelBuffer};

/// GIF encoder quantization speed (1 = best quality, 30 = fastest).
const GIF_ENCODER_SPEED: i32 = 10;

pub fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gif"))
        .unwrap_or(false)
}

fn from_rgba(img: RgbaImage) -> Result<PixelBuffer> {
    let (width, height) = img.dimensions();
    PixelBuffer::from_raw(width, height, img.into_raw()).context("Decoded image has no pixels")
}

fn to_rgba(buffer: &PixelBuffer) -> Result<RgbaImage> {
    RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.as_raw().to_vec())
        .context("Pixel buffer does not match its dimensions")
}

/// Load any supported still image as RGBA.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?;
    from_rgba(img.to_rgba8())
}

/// Save a buffer, picking the format from the file extension.
///
/// Formats without an alpha channel (JPEG) get the RGB channels only.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let img = to_rgba(buffer)?;
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);

    if is_jpeg {
        DynamicImage::ImageRgba8(img).to_rgb8().save(path)
    } else {
        img.save(path)
    }
    .with_context(|| format!("Failed to save image: {}", path.display()))
}

/// Decode every frame of a GIF, composited to the full canvas.
///
/// The loop count is not exposed by the decoder, so sequences are loaded as
/// looping forever (0).
pub fn decode_gif<R: BufRead + Seek>(reader: R) -> Result<AnimatedSequence> {
    let decoder = GifDecoder::new(reader).context("Failed to read GIF header")?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .context("Failed to decode GIF frames")?;

    let frames = frames
        .into_iter()
        .map(|frame| {
            let delay_ms = delay_to_ms(frame.delay());
            from_rgba(frame.into_buffer()).map(|buffer| Frame::new(buffer, delay_ms))
        })
        .collect::<Result<Vec<_>>>()?;

    AnimatedSequence::new(frames, 0).context("GIF contains no usable frames")
}

/// Number of frames in a GIF, without compositing them.
pub fn gif_frame_count(path: &Path) -> Result<usize> {
    let file =
        File::open(path).with_context(|| format!("Failed to open GIF: {}", path.display()))?;
    let decoder = GifDecoder::new(BufReader::new(file))
        .with_context(|| format!("Invalid GIF: {}", path.display()))?;
    let mut count = 0;
    for frame in decoder.into_frames() {
        frame.with_context(|| format!("Invalid GIF: {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

pub fn load_gif(path: &Path) -> Result<AnimatedSequence> {
    let file =
        File::open(path).with_context(|| format!("Failed to open GIF: {}", path.display()))?;
    decode_gif(BufReader::new(file)).with_context(|| format!("Invalid GIF: {}", path.display()))
}

/// Encode a sequence as an animated GIF.
///
/// A loop count of 0 repeats forever. Disposal hints are not forwarded; the
/// encoder always writes full frames.
pub fn encode_gif<W: Write>(sequence: &AnimatedSequence, writer: W) -> Result<()> {
    let mut encoder = GifEncoder::new_with_speed(writer, GIF_ENCODER_SPEED);
    let repeat = match sequence.loop_count() {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    };
    encoder
        .set_repeat(repeat)
        .context("Failed to set GIF loop count")?;

    for frame in sequence.frames() {
        let delay = Delay::from_numer_denom_ms(frame.delay_ms, 1);
        let gif_frame = image::Frame::from_parts(to_rgba(&frame.buffer)?, 0, 0, delay);
        encoder
            .encode_frame(gif_frame)
            .context("Failed to encode GIF frame")?;
    }

    Ok(())
}

pub fn save_gif(sequence: &AnimatedSequence, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create GIF: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    encode_gif(sequence, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write GIF: {}", path.display()))
}

fn delay_to_ms(delay: Delay) -> u32 {
    let (numer, denom) = delay.numer_denom_ms();
    (numer as f64 / denom.max(1) as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn checker(width: u32, height: u32, on: [u8; 4]) -> PixelBuffer {
        let mut buffer = PixelBuffer::filled(width, height, [0, 0, 0, 255]).unwrap();
        for y in 0..height {
            for x in 0..width {
                if (x + y) % 2 == 0 {
                    buffer.put_pixel(x, y, on);
                }
            }
        }
        buffer
    }

    #[test]
    fn test_is_gif() {
        assert!(is_gif(Path::new("a/b/anim.GIF")));
        assert!(!is_gif(Path::new("still.png")));
        assert!(!is_gif(Path::new("noext")));
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buffer = checker(7, 5, [255, 255, 255, 128]);

        save_image(&buffer, &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), buffer);
    }

    #[test]
    fn test_jpeg_save_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        save_image(&checker(8, 8, [255, 255, 255, 10]), &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (8, 8));
        assert!(loaded.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_gif_round_trip_keeps_frames_and_delays() {
        let sequence = AnimatedSequence::new(
            vec![
                Frame::new(checker(6, 4, [255, 255, 255, 255]), 50),
                Frame::new(PixelBuffer::filled(6, 4, [255, 255, 255, 255]).unwrap(), 120),
                Frame::new(checker(6, 4, [255, 255, 255, 255]), 30),
            ],
            0,
        )
        .unwrap();

        let mut bytes = Vec::new();
        encode_gif(&sequence, &mut bytes).unwrap();
        let decoded = decode_gif(Cursor::new(bytes)).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
        let delays: Vec<u32> = decoded.frames().iter().map(|f| f.delay_ms).collect();
        assert_eq!(delays, vec![50, 120, 30]);
    }

    #[test]
    fn test_load_gif_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        let sequence = AnimatedSequence::new(
            vec![
                Frame::new(PixelBuffer::filled(3, 3, [0, 0, 0, 255]).unwrap(), 100),
                Frame::new(PixelBuffer::filled(3, 3, [255, 255, 255, 255]).unwrap(), 100),
            ],
            2,
        )
        .unwrap();

        save_gif(&sequence, &path).unwrap();
        let loaded = load_gif(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.loop_count(), 0);
        assert_eq!(loaded.total_duration_ms(), 200);
    }

    #[test]
    fn test_gif_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.gif");
        let sequence = AnimatedSequence::new(
            vec![Frame::new(PixelBuffer::filled(3, 3, [0, 0, 0, 255]).unwrap(), 100)],
            0,
        )
        .unwrap();
        save_gif(&sequence, &single).unwrap();
        assert_eq!(gif_frame_count(&single).unwrap(), 1);

        let broken = dir.path().join("broken.gif");
        std::fs::write(&broken, b"not a gif").unwrap();
        assert!(gif_frame_count(&broken).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to open image"));
    }
}
