//! Placement planning for watermark text.
//!
//! Pure geometry. Everything here works in a top-left origin, y-down
//! coordinate space; the page renderer flips into page space itself.
//!
//! # Position Modes
//!
//! - **Tile**: grid laid out on an oversized square surface
//!   (`diagonal * 1.5`) that is rotated and center-cropped back to the canvas,
//!   so no corner is left uncovered after rotation
//! - **Center**: one draw centered on the canvas
//! - **Corners**: one draw inset by a fixed margin from the corner
//!
//! # Example
//!
//! ```ignore
//! use inkmark::watermark::position::{calculate_position, CanvasDimensions, TextDimensions};
//! use inkmark::watermark::WatermarkPosition;
//!
//! let canvas = CanvasDimensions { width: 800, height: 600 };
//! let text = TextDimensions { width: 100, height: 50 };
//!
//! let pos = calculate_position(WatermarkPosition::BottomRight, &canvas, &text, 20);
//! assert_eq!((pos.x, pos.y), (680, 530)); // 800 - 100 - 20, 600 - 50 - 20
//! ```

use super::WatermarkPosition;

/// Corner inset for pixel canvases.
pub const RASTER_MARGIN: u32 = 20;

/// Corner inset for page canvases, in points.
pub const PAGE_MARGIN: u32 = 50;

/// Oversize factor applied to the canvas diagonal for tiling.
pub const TILE_SURFACE_FACTOR: f64 = 1.5;

/// Dimensions of the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn diagonal(&self) -> f64 {
        ((self.width as f64).powi(2) + (self.height as f64).powi(2)).sqrt()
    }
}

/// Measured bounding box of the watermark text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDimensions {
    pub width: u32,
    pub height: u32,
}

impl TextDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of one text draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Result of planning one watermark.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Draw at every position on a `surface_side` square, rotate the surface,
    /// then crop it around its center back to the canvas.
    Tiled {
        surface_side: u32,
        positions: Vec<PlacementPosition>,
    },
    /// One draw on a canvas-sized layer; the whole layer is rotated.
    Single(PlacementPosition),
}

/// Plan the draws for `position` on a pixel-like canvas.
pub fn plan(
    position: WatermarkPosition,
    canvas: &CanvasDimensions,
    text: &TextDimensions,
    spacing: u32,
    margin: u32,
) -> Placement {
    match position {
        WatermarkPosition::Tile => {
            let surface_side = tile_surface_side(canvas);
            let surface = CanvasDimensions::new(surface_side, surface_side);
            Placement::Tiled {
                surface_side,
                positions: calculate_tiled_positions(&surface, text, spacing),
            }
        }
        other => Placement::Single(calculate_position(other, canvas, text, margin)),
    }
}

/// Side of the square tiling surface for `canvas`.
pub fn tile_surface_side(canvas: &CanvasDimensions) -> u32 {
    let side = (canvas.diagonal() * TILE_SURFACE_FACTOR) as u32;
    side.max(canvas.width).max(canvas.height).max(1)
}

/// Offset of the canvas-sized crop window centered in a square surface.
pub fn crop_origin(surface_side: u32, canvas: &CanvasDimensions) -> (u32, u32) {
    let center = surface_side / 2;
    (
        center.saturating_sub(canvas.width / 2),
        center.saturating_sub(canvas.height / 2),
    )
}

/// Calculate the position for a single (non-tiled) draw.
///
/// Coordinates may be negative if the text is larger than the canvas.
/// `Tile` has no single position and is treated like the default corner.
pub fn calculate_position(
    position: WatermarkPosition,
    canvas: &CanvasDimensions,
    text: &TextDimensions,
    margin: u32,
) -> PlacementPosition {
    let cw = canvas.width as i32;
    let ch = canvas.height as i32;
    let tw = text.width as i32;
    let th = text.height as i32;
    let m = margin as i32;

    match position {
        WatermarkPosition::Center => PlacementPosition::new((cw - tw) / 2, (ch - th) / 2),
        WatermarkPosition::TopRight => PlacementPosition::new(cw - tw - m, m),
        WatermarkPosition::BottomLeft => PlacementPosition::new(m, ch - th - m),
        WatermarkPosition::BottomRight => PlacementPosition::new(cw - tw - m, ch - th - m),
        WatermarkPosition::TopLeft | WatermarkPosition::Tile => PlacementPosition::new(m, m),
    }
}

/// Calculate grid positions covering `surface`, starting at the origin.
///
/// Step is `(text.width + spacing, text.height + spacing)`.
pub fn calculate_tiled_positions(
    surface: &CanvasDimensions,
    text: &TextDimensions,
    spacing: u32,
) -> Vec<PlacementPosition> {
    let step_x = (text.width + spacing).max(1) as usize;
    let step_y = (text.height + spacing).max(1) as usize;

    let mut positions = Vec::new();
    for y in (0..surface.height).step_by(step_y) {
        for x in (0..surface.width).step_by(step_x) {
            positions.push(PlacementPosition::new(x as i32, y as i32));
        }
    }
    positions
}

/// Rough text width on a page, where no shaping metrics are taken.
pub fn approximate_page_text_width(font_size: u32, text: &str) -> f32 {
    font_size as f32 * text.chars().count() as f32 * 0.6
}

/// Widened tile step for pages: `spacing + font_size * len * 0.6`.
pub fn page_tile_step(spacing: u32, font_size: u32, text: &str) -> f32 {
    spacing as f32 + approximate_page_text_width(font_size, text)
}

/// Grid origins for page tiling, relative to the rotation center.
///
/// Covers `[-reach_x, reach_x) x [-reach_y, reach_y)` with a square `step`.
pub fn calculate_page_tile_positions(reach_x: f32, reach_y: f32, step: f32) -> Vec<(f32, f32)> {
    let step = step.max(1.0) as i64;
    let (w, h) = (reach_x as i64, reach_y as i64);

    let mut positions = Vec::new();
    let mut y = -h;
    while y < h {
        let mut x = -w;
        while x < w {
            positions.push((x as f32, y as f32));
            x += step;
        }
        y += step;
    }
    positions
}
