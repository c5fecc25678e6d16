//! Routing from a file type tag to the matching renderer.

use super::flow::FlowDocWatermarker;
use super::fonts::FontResolver;
use super::paged::PagedDocWatermarker;
use super::raster::RasterWatermarker;
use super::{WatermarkError, WatermarkOptions};
use std::str::FromStr;
use std::sync::Arc;

/// Type tag accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Pdf,
    Word,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
            FileKind::Word => "word",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileKind::Image),
            "pdf" => Ok(FileKind::Pdf),
            "word" => Ok(FileKind::Word),
            other => Err(WatermarkError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// One renderer per supported file kind.
#[derive(Debug, Clone)]
pub enum Watermarker {
    Raster(RasterWatermarker),
    PagedDoc(PagedDocWatermarker),
    FlowDoc(FlowDocWatermarker),
}

impl Watermarker {
    /// Build the renderer for `kind`. `extension_hint` only matters for
    /// images, where it selects the output encoding.
    pub fn for_kind(kind: FileKind, fonts: Arc<dyn FontResolver>, extension_hint: &str) -> Self {
        match kind {
            FileKind::Image => Watermarker::Raster(RasterWatermarker::new(fonts, extension_hint)),
            FileKind::Pdf => Watermarker::PagedDoc(PagedDocWatermarker::new(fonts)),
            FileKind::Word => Watermarker::FlowDoc(FlowDocWatermarker::new()),
        }
    }

    pub fn from_tag(
        tag: &str,
        fonts: Arc<dyn FontResolver>,
        extension_hint: &str,
    ) -> Result<Self, WatermarkError> {
        Ok(Self::for_kind(tag.parse()?, fonts, extension_hint))
    }

    pub fn kind(&self) -> FileKind {
        match self {
            Watermarker::Raster(_) => FileKind::Image,
            Watermarker::PagedDoc(_) => FileKind::Pdf,
            Watermarker::FlowDoc(_) => FileKind::Word,
        }
    }

    pub fn render(
        &self,
        data: &[u8],
        text: &str,
        options: &WatermarkOptions,
    ) -> Result<Vec<u8>, WatermarkError> {
        match self {
            Watermarker::Raster(w) => w.render(data, text, options),
            Watermarker::PagedDoc(w) => w.render(data, text, options),
            Watermarker::FlowDoc(w) => w.render(data, text, options),
        }
    }
}

/// Render `data` according to `tag` (`image`, `pdf` or `word`).
///
/// Absent options fall back to [`WatermarkOptions::default`].
pub fn render(
    data: &[u8],
    text: &str,
    tag: &str,
    options: Option<&WatermarkOptions>,
    extension_hint: &str,
    fonts: Arc<dyn FontResolver>,
) -> Result<Vec<u8>, WatermarkError> {
    let watermarker = Watermarker::from_tag(tag, fonts, extension_hint)?;

    let defaults;
    let options = match options {
        Some(options) => options,
        None => {
            defaults = WatermarkOptions::default();
            &defaults
        }
    };

    let started = std::time::Instant::now();
    let result = watermarker.render(data, text, options);

    match &result {
        Ok(out) => tracing::info!(
            kind = %watermarker.kind(),
            input_bytes = data.len(),
            output_bytes = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "watermark rendered"
        ),
        Err(e) => tracing::warn!(
            kind = %watermarker.kind(),
            error = %e,
            "watermark render failed"
        ),
    }

    result
}
