//! Text rasterization and layer rotation.
//!
//! Draws watermark text into transparent RGBA layers with whichever face
//! the resolver produced, and rotates whole layers at a fixed size.
//!
//! # Example
//!
//! ```ignore
//! use inkmark::watermark::text_renderer::{draw_text, rotate_fixed};
//!
//! let mut layer = RgbaImage::new(800, 600);
//! draw_text(&mut layer, &font, "SAMPLE", PlacementPosition::new(20, 20), color);
//! let layer = rotate_fixed(&layer, -45.0);
//! ```

use super::compositor::blend_pixels;
use super::fonts::{BitmapFont, FontHandle, Typeface};
use super::position::{CanvasDimensions, PlacementPosition};
use ab_glyph::{Font, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

/// Draw `text` with its bounding box top-left at `origin`.
///
/// Pixels are blended into the layer, so overlapping draws accumulate.
/// Anything outside the layer is clipped.
pub fn draw_text(
    layer: &mut RgbaImage,
    font: &FontHandle,
    text: &str,
    origin: PlacementPosition,
    color: Rgba<u8>,
) {
    let width = layer.width() as i32;
    let height = layer.height() as i32;

    let mut plot = |x: i32, y: i32, coverage: f32| {
        if x < 0 || y < 0 || x >= width || y >= height {
            return;
        }
        let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
        if alpha == 0 {
            return;
        }
        let pixel = Rgba([color[0], color[1], color[2], alpha]);
        let existing = *layer.get_pixel(x as u32, y as u32);
        layer.put_pixel(x as u32, y as u32, blend_pixels(existing, pixel));
    };

    match font.typeface() {
        Typeface::Outline(loaded) => {
            let scale = PxScale::from(font.size());
            let scaled = loaded.face.as_scaled(scale);
            let baseline_y = origin.y as f32 + scaled.ascent();

            let mut cursor_x = origin.x as f32;
            let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

            for c in text.chars() {
                let glyph_id = scaled.glyph_id(c);

                if let Some(prev) = prev_glyph {
                    cursor_x += scaled.kern(prev, glyph_id);
                }

                let glyph =
                    glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

                if let Some(outlined) = loaded.face.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|px, py, coverage| {
                        plot(
                            px as i32 + bounds.min.x as i32,
                            py as i32 + bounds.min.y as i32,
                            coverage,
                        );
                    });
                }

                cursor_x += scaled.h_advance(glyph_id);
                prev_glyph = Some(glyph_id);
            }
        }
        Typeface::Builtin => {
            BitmapFont::for_size(font.size()).rasterize(text, |x, y| {
                plot(origin.x + x as i32, origin.y + y as i32, 1.0);
            });
        }
    }
}

/// Rotate a layer about its center, counter-clockwise for positive degrees.
///
/// The output keeps the input size; corners that rotate out are lost and
/// uncovered areas are transparent. Sampling is bilinear on premultiplied
/// color so glyph edges do not darken.
pub fn rotate_fixed(image: &RgbaImage, degrees: f32) -> RgbaImage {
    if degrees == 0.0 || degrees.rem_euclid(360.0) == 0.0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let radians = degrees.to_radians();
    let cos = radians.cos();
    let sin = radians.sin();

    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    let mut rotated = RgbaImage::new(width, height);

    for dy in 0..height {
        for dx in 0..width {
            // Inverse-map the destination pixel center into the source.
            let rx = dx as f32 + 0.5 - cx;
            let ry = dy as f32 + 0.5 - cy;

            let sx = rx * cos - ry * sin + cx - 0.5;
            let sy = rx * sin + ry * cos + cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> Option<Rgba<u8>> {
    let (width, height) = image.dimensions();
    if sx <= -1.0 || sy <= -1.0 || sx >= width as f32 || sy >= height as f32 {
        return None;
    }

    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let mut acc = [0.0f32; 4];
    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    for (x, y, weight) in taps {
        if weight == 0.0 || x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            continue;
        }
        let p = image.get_pixel(x as u32, y as u32);
        let a = p[3] as f32 * weight;
        acc[0] += p[0] as f32 * a;
        acc[1] += p[1] as f32 * a;
        acc[2] += p[2] as f32 * a;
        acc[3] += a;
    }

    if acc[3] < 0.5 {
        return None;
    }

    let alpha = acc[3];
    Some(Rgba([
        (acc[0] / alpha).round().clamp(0.0, 255.0) as u8,
        (acc[1] / alpha).round().clamp(0.0, 255.0) as u8,
        (acc[2] / alpha).round().clamp(0.0, 255.0) as u8,
        alpha.round().clamp(0.0, 255.0) as u8,
    ]))
}

/// Cut the canvas-sized window out of the center of a square surface.
pub fn crop_center(surface: &RgbaImage, canvas: &CanvasDimensions) -> RgbaImage {
    let (left, top) = super::position::crop_origin(surface.width(), canvas);
    image::imageops::crop_imm(surface, left, top, canvas.width, canvas.height).to_image()
}
