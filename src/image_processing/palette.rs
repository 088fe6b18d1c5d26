use serde::{Deserialize, Serialize};

use super::error::{ProcessingError, Result};

/// An RGB palette entry.
pub type Rgb = (u8, u8, u8);

/// Two-color black & white palette used when nothing else is configured.
pub const BLACK_WHITE_PALETTE: [Rgb; 2] = [(0, 0, 0), (255, 255, 255)];

/// Ordered, non-empty list of colors that dithering maps pixels onto.
///
/// Order only matters for ties: the first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(ProcessingError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    /// Parse `#RRGGBB` strings.
    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self> {
        let parsed = colors
            .iter()
            .map(|c| parse_hex_color(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(parsed)
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entries formatted as uppercase `#RRGGBB`.
    pub fn to_hex(&self) -> Vec<String> {
        self.colors
            .iter()
            .map(|&(r, g, b)| format!("#{:02X}{:02X}{:02X}", r, g, b))
            .collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BLACK_WHITE_PALETTE.to_vec(),
        }
    }
}

impl TryFrom<Vec<String>> for Palette {
    type Error = ProcessingError;

    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Palette> for Vec<String> {
    fn from(palette: Palette) -> Self {
        palette.to_hex()
    }
}

/// Parse a single `#RRGGBB` color.
pub fn parse_hex_color(color: &str) -> Result<Rgb> {
    let trimmed = color.trim();
    let hex = trimmed
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| ProcessingError::InvalidColor(color.to_string()))?;

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|_| ProcessingError::InvalidColor(color.to_string()))
    };

    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Closest palette entry by Euclidean distance in RGB space, with that distance.
///
/// Inputs may lie outside `[0, 255]` (ordered and jitter dithering push them
/// there). On an exact tie the earlier entry wins.
pub fn nearest_with_distance(r: f32, g: f32, b: f32, palette: &Palette) -> (Rgb, f32) {
    let mut min_distance = f32::MAX;
    let mut closest_color = palette.colors[0];

    for &(pr, pg, pb) in &palette.colors {
        let dr = r - pr as f32;
        let dg = g - pg as f32;
        let db = b - pb as f32;

        let distance = dr * dr + dg * dg + db * db;

        if distance < min_distance {
            min_distance = distance;
            closest_color = (pr, pg, pb);
        }
    }

    (closest_color, min_distance.sqrt())
}

/// Closest palette entry by Euclidean distance in RGB space.
#[inline]
pub fn nearest_palette_color(r: f32, g: f32, b: f32, palette: &Palette) -> Rgb {
    nearest_with_distance(r, g, b, palette).0
}
