//! File classification and output naming.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::constants::{OUTPUT_NAME_INFIX, OUTPUT_SUFFIX_LEN};
use crate::watermark::FileKind;

/// Extensions rendered by the raster watermarker.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff"];

/// Requested file type; `Auto` defers to the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RequestedType {
    #[default]
    Auto,
    Image,
    Pdf,
    Word,
}

impl RequestedType {
    /// The kind to render as, or None when `Auto` cannot classify `extension`.
    pub fn resolve(self, extension: &str) -> Option<FileKind> {
        match self {
            RequestedType::Auto => detect_file_type(extension),
            RequestedType::Image => Some(FileKind::Image),
            RequestedType::Pdf => Some(FileKind::Pdf),
            RequestedType::Word => Some(FileKind::Word),
        }
    }
}

/// Lowercased extension including the dot, or "" when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Map an extension (".png", case-insensitive) to a file kind.
pub fn detect_file_type(extension: &str) -> Option<FileKind> {
    let ext = extension.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Image)
    } else if ext == ".pdf" {
        Some(FileKind::Pdf)
    } else if ext == ".docx" || ext == ".doc" {
        Some(FileKind::Word)
    } else {
        None
    }
}

/// `{stem}_watermarked_{8 hex}{ext}` for `original`.
pub fn generate_output_filename(original: &Path) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_extension(original);
    let id = Uuid::new_v4().simple().to_string();

    format!(
        "{}{}{}{}",
        stem,
        OUTPUT_NAME_INFIX,
        &id[..OUTPUT_SUFFIX_LEN],
        ext
    )
}
