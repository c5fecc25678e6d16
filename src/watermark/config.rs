//! Watermark option types.
//!
//! `WatermarkOptions` is the immutable value every renderer receives. Range
//! checks live in [`WatermarkOptions::validate`] and are run by the boundary
//! (CLI or embedding service); renderers assume the ranges hold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::WatermarkError;

pub const FONT_SIZE_RANGE: (u32, u32) = (10, 200);
pub const SPACING_RANGE: (u32, u32) = (20, 500);
pub const ANGLE_RANGE: (f32, f32) = (-180.0, 180.0);

// Default values
fn default_font_size() -> u32 {
    40
}

fn default_color() -> String {
    "#808080".to_string()
}

fn default_opacity() -> f32 {
    0.3
}

fn default_angle() -> f32 {
    -45.0
}

fn default_spacing() -> u32 {
    100
}

/// Where the watermark goes on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPosition {
    /// Repeating grid covering the whole canvas after rotation
    #[default]
    Tile,
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tile => "tile",
            Self::Center => "center",
            Self::TopLeft => "top_left",
            Self::TopRight => "top_right",
            Self::BottomLeft => "bottom_left",
            Self::BottomRight => "bottom_right",
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomLeft | Self::BottomRight
        )
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tile" | "tiled" => Ok(Self::Tile),
            "center" => Ok(Self::Center),
            "top_left" => Ok(Self::TopLeft),
            "top_right" => Ok(Self::TopRight),
            "bottom_left" => Ok(Self::BottomLeft),
            "bottom_right" => Ok(Self::BottomRight),
            other => Err(WatermarkError::InvalidOptions(format!(
                "unknown position '{}'",
                other
            ))),
        }
    }
}

/// Watermark appearance and placement.
///
/// ```yaml
/// font_size: 40
/// font_color: "#808080"
/// opacity: 0.3
/// angle: -45
/// spacing: 100
/// position: tile
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    /// Font size in pixels (raster) or points (documents), 10..=200
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Text color as "#RRGGBB"
    #[serde(default = "default_color")]
    pub font_color: String,

    /// Opacity from 0.0 (invisible) to 1.0 (opaque)
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Rotation in degrees, counter-clockwise, -180..=180
    #[serde(default = "default_angle")]
    pub angle: f32,

    /// Gap between tiles, 20..=500
    #[serde(default = "default_spacing")]
    pub spacing: u32,

    #[serde(default)]
    pub position: WatermarkPosition,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_color: default_color(),
            opacity: default_opacity(),
            angle: default_angle(),
            spacing: default_spacing(),
            position: WatermarkPosition::default(),
        }
    }
}

impl WatermarkOptions {
    /// Check the documented ranges and the color format.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        let (min, max) = FONT_SIZE_RANGE;
        if !(min..=max).contains(&self.font_size) {
            return Err(WatermarkError::InvalidOptions(format!(
                "font_size must be between {} and {}, got {}",
                min, max, self.font_size
            )));
        }

        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::InvalidOptions(format!(
                "opacity must be between 0.0 and 1.0, got {}",
                self.opacity
            )));
        }

        let (min, max) = ANGLE_RANGE;
        if !(min..=max).contains(&self.angle) {
            return Err(WatermarkError::InvalidOptions(format!(
                "angle must be between {} and {}, got {}",
                min, max, self.angle
            )));
        }

        let (min, max) = SPACING_RANGE;
        if !(min..=max).contains(&self.spacing) {
            return Err(WatermarkError::InvalidOptions(format!(
                "spacing must be between {} and {}, got {}",
                min, max, self.spacing
            )));
        }

        super::color::hex_to_rgb(&self.font_color)?;
        Ok(())
    }
}

/// Check the watermark text length (1-200 characters).
pub fn validate_text(text: &str) -> Result<(), WatermarkError> {
    let count = text.chars().count();
    if count == 0 || count > 200 {
        return Err(WatermarkError::InvalidOptions(format!(
            "watermark text must be 1-200 characters, got {}",
            count
        )));
    }
    Ok(())
}
