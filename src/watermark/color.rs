//! HEX color conversion.

use super::WatermarkError;
use image::Rgba;

/// Parsed RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to 0.0..=1.0, as PDF color operators expect.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    pub fn with_opacity(self, opacity: f32) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, opacity_to_alpha(opacity)])
    }
}

/// Parse "#RRGGBB" (leading '#' optional, case-insensitive).
///
/// ```ignore
/// assert_eq!(hex_to_rgb("#FF8000").unwrap(), Color::new(255, 128, 0));
/// assert_eq!(hex_to_rgb("ff8000").unwrap(), Color::new(255, 128, 0));
/// ```
pub fn hex_to_rgb(hex: &str) -> Result<Color, WatermarkError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);

    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WatermarkError::InvalidColorFormat(hex.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| WatermarkError::InvalidColorFormat(hex.to_string()))
    };

    Ok(Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Parse a hex color and attach `round(opacity * 255)` as alpha.
pub fn hex_to_rgba(hex: &str, opacity: f32) -> Result<Rgba<u8>, WatermarkError> {
    Ok(hex_to_rgb(hex)?.with_opacity(opacity))
}

fn opacity_to_alpha(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}
