//! Watermark rendering for images, PDFs and Word documents.
//!
//! Every renderer is a pure function of input bytes, text and
//! [`WatermarkOptions`]: it reads only its own input plus the read-only font
//! search configuration and returns freshly allocated bytes.
//!
//! # Renderers
//!
//! - [`RasterWatermarker`]: rotated, alpha-composited text on a pixel canvas
//! - [`PagedDocWatermarker`]: one semi-transparent Form XObject merged onto
//!   every PDF page
//! - [`FlowDocWatermarker`]: a VML text-path shape in each DOCX section header
//!
//! [`Watermarker`] routes a type tag (`image`, `pdf`, `word`) to one of them.
//!
//! # Example
//!
//! ```ignore
//! use inkmark::watermark::{self, fonts, WatermarkOptions};
//!
//! let png = std::fs::read("photo.png")?;
//! let out = watermark::render(&png, "CONFIDENTIAL", "image", None, ".png", fonts::default_resolver())?;
//! ```

pub mod color;
pub mod compositor;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod fonts;
pub mod format;
pub mod paged;
pub mod pdf_font;
pub mod position;
pub mod raster;
pub mod text_renderer;

pub use color::{hex_to_rgb, hex_to_rgba, Color};
pub use config::{validate_text, WatermarkOptions, WatermarkPosition};
pub use dispatcher::{render, FileKind, Watermarker};
pub use error::WatermarkError;
pub use flow::FlowDocWatermarker;
pub use fonts::{
    build_resolver, default_resolver, CachedResolver, FontHandle, FontReport, FontResolver,
    FontSearchConfig, FontStrategy, ScanningResolver,
};
pub use format::OutputFormat;
pub use paged::PagedDocWatermarker;
pub use position::{
    calculate_position, calculate_tiled_positions, CanvasDimensions, Placement,
    PlacementPosition, TextDimensions,
};
pub use raster::RasterWatermarker;
