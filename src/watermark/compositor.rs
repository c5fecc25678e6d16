//! Alpha compositing of watermark layers.
//!
//! Straight (non-premultiplied) Porter-Duff "over". A foreground pixel with
//! alpha 0 leaves the background byte-for-byte untouched.
//!
//! # Example
//!
//! ```ignore
//! use inkmark::watermark::compositor::{composite, flatten};
//!
//! composite(&mut base, &overlay);
//! let rgb = flatten(&base);
//! ```

use super::position::PlacementPosition;
use image::{Rgba, RgbaImage, RgbImage};

/// Composite a same-sized overlay over the base image in place.
///
/// Only the intersecting region is touched if the sizes differ.
pub fn composite(base: &mut RgbaImage, overlay: &RgbaImage) {
    compose_fragment(base, overlay, PlacementPosition::new(0, 0));
}

/// Composite `fragment` onto `target` with its top-left corner at `position`.
///
/// Parts of the fragment outside the target are clipped.
pub fn compose_fragment(target: &mut RgbaImage, fragment: &RgbaImage, position: PlacementPosition) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let x_start = position.x.max(0);
    let y_start = position.y.max(0);
    let x_end = (position.x + fragment.width() as i32).min(target_width);
    let y_end = (position.y + fragment.height() as i32).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let fx = (tx - position.x) as u32;
            let fy = (ty - position.y) as u32;

            let fg = *fragment.get_pixel(fx, fy);
            if fg[3] == 0 {
                continue;
            }

            let bg = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(tx as u32, ty as u32, blend_pixels(bg, fg));
        }
    }
}

/// Blend one pixel over another.
///
/// result = foreground + background * (1 - foreground.alpha)
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    if foreground[3] == 0 {
        return background;
    }
    if foreground[3] == 255 {
        return foreground;
    }

    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Drop the alpha channel for formats that cannot store it.
pub fn flatten(image: &RgbaImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        rgb.put_pixel(x, y, image::Rgb([pixel[0], pixel[1], pixel[2]]));
    }

    rgb
}
