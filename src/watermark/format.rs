//! Raster formats: extension mapping, decoding and encoding.

use super::compositor::flatten;
use super::WatermarkError;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageEncoder as _, RgbaImage};
use std::io::Cursor;

/// JPEG quality used for every lossy encode.
pub const JPEG_QUALITY: u8 = 95;

/// Output formats the raster watermarker can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    Jpeg,
    #[default]
    Png,
    Gif,
    Bmp,
    WebP,
    Tiff,
}

impl OutputFormat {
    /// Map a file extension (with or without the dot) to a format.
    ///
    /// Unrecognised or empty extensions fall back to PNG.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "webp" => Self::WebP,
            "tiff" | "tif" => Self::Tiff,
            _ => Self::Png,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    /// Whether the encoded file keeps an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// Decode any supported image and normalize it to RGBA.
pub fn decode_image(data: &[u8]) -> Result<RgbaImage, WatermarkError> {
    let image = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::UnsupportedImageFormat(e.to_string()))?
        .decode()
        .map_err(|e| WatermarkError::UnsupportedImageFormat(e.to_string()))?;

    Ok(image.to_rgba8())
}

/// Encode the final buffer, flattening first if the format has no alpha.
pub fn encode_image(image: RgbaImage, format: OutputFormat) -> Result<Vec<u8>, WatermarkError> {
    let (width, height) = image.dimensions();
    let mut output = Cursor::new(Vec::new());
    let fail = |e: image::ImageError| WatermarkError::encoding(format.as_str(), e.to_string());

    match format {
        OutputFormat::Jpeg => {
            let rgb = flatten(&image);
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
                .write_image(rgb.as_raw(), width, height, image::ColorType::Rgb8)
                .map_err(fail)?;
        }
        OutputFormat::Png => {
            image::codecs::png::PngEncoder::new(&mut output)
                .write_image(image.as_raw(), width, height, image::ColorType::Rgba8)
                .map_err(fail)?;
        }
        OutputFormat::WebP => {
            image::codecs::webp::WebPEncoder::new_lossless(&mut output)
                .write_image(image.as_raw(), width, height, image::ColorType::Rgba8)
                .map_err(fail)?;
        }
        OutputFormat::Gif | OutputFormat::Bmp | OutputFormat::Tiff => {
            let target = match format {
                OutputFormat::Gif => image::ImageFormat::Gif,
                OutputFormat::Bmp => image::ImageFormat::Bmp,
                _ => image::ImageFormat::Tiff,
            };
            DynamicImage::ImageRgba8(image)
                .write_to(&mut output, target)
                .map_err(fail)?;
        }
    }

    Ok(output.into_inner())
}
