//! Watermarking of raster images.
//!
//! Decode, paint the text into a transparent overlay, composite the overlay
//! over the image, then encode in the format picked from the extension hint.
//!
//! Tiling goes through an oversized square surface that is rotated and
//! center-cropped into an independent canvas-sized fragment; the caller
//! composes that fragment into the overlay. Single placements draw straight
//! into the overlay and rotate the whole layer about its center.

use super::color::hex_to_rgba;
use super::compositor::{compose_fragment, composite};
use super::fonts::{FontHandle, FontResolver};
use super::format::{decode_image, encode_image, OutputFormat};
use super::position::{
    plan, CanvasDimensions, Placement, PlacementPosition, TextDimensions, RASTER_MARGIN,
};
use super::text_renderer::{crop_center, draw_text, rotate_fixed};
use super::{WatermarkError, WatermarkOptions};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Renders watermarks onto raster images.
#[derive(Clone)]
pub struct RasterWatermarker {
    fonts: Arc<dyn FontResolver>,
    format: OutputFormat,
}

impl std::fmt::Debug for RasterWatermarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterWatermarker")
            .field("format", &self.format)
            .finish()
    }
}

impl RasterWatermarker {
    /// `extension_hint` selects the output format (".jpg", "png", ...).
    pub fn new(fonts: Arc<dyn FontResolver>, extension_hint: &str) -> Self {
        Self {
            fonts,
            format: OutputFormat::from_extension(extension_hint),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(
        &self,
        data: &[u8],
        text: &str,
        options: &WatermarkOptions,
    ) -> Result<Vec<u8>, WatermarkError> {
        let mut base = decode_image(data)?;
        let color = hex_to_rgba(&options.font_color, options.opacity)?;
        let canvas = CanvasDimensions::new(base.width(), base.height());

        let font = self.fonts.resolve(options.font_size as f32);
        let overlay = build_overlay(&canvas, &font, text, options, color);

        composite(&mut base, &overlay);

        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            position = %options.position,
            format = self.format.as_str(),
            builtin_font = font.is_builtin(),
            "raster watermark applied"
        );

        encode_image(base, self.format)
    }
}

/// Build the canvas-sized transparent layer holding only watermark pixels.
pub fn build_overlay(
    canvas: &CanvasDimensions,
    font: &FontHandle,
    text: &str,
    options: &WatermarkOptions,
    color: Rgba<u8>,
) -> RgbaImage {
    let (width, height) = font.measure(text);
    let text_dims = TextDimensions::new(width, height);

    let mut overlay = RgbaImage::new(canvas.width, canvas.height);

    match plan(
        options.position,
        canvas,
        &text_dims,
        options.spacing,
        RASTER_MARGIN,
    ) {
        Placement::Tiled {
            surface_side,
            positions,
        } => {
            let fragment = tile_fragment(
                canvas,
                surface_side,
                &positions,
                font,
                text,
                options.angle,
                color,
            );
            compose_fragment(&mut overlay, &fragment, PlacementPosition::new(0, 0));
        }
        Placement::Single(position) => {
            draw_text(&mut overlay, font, text, position, color);
            if options.angle != 0.0 {
                overlay = rotate_fixed(&overlay, options.angle);
            }
        }
    }

    overlay
}

/// Paint the grid on a `surface_side` square, rotate it, and crop the
/// canvas-sized window from its center.
pub fn tile_fragment(
    canvas: &CanvasDimensions,
    surface_side: u32,
    positions: &[PlacementPosition],
    font: &FontHandle,
    text: &str,
    angle: f32,
    color: Rgba<u8>,
) -> RgbaImage {
    let mut surface = RgbaImage::new(surface_side, surface_side);
    for position in positions {
        draw_text(&mut surface, font, text, *position, color);
    }

    let rotated = rotate_fixed(&surface, angle);
    crop_center(&rotated, canvas)
}
