//! Watermark error types.
//!
//! Every renderer either returns complete bytes or one of these errors.
//! Font lookup problems never show up here; they degrade to the next
//! candidate inside the resolver.

use thiserror::Error;

/// Errors that can occur while rendering a watermark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Color string is not six hex digits (with optional leading '#')
    #[error("Invalid color format: {0}")]
    InvalidColorFormat(String),

    /// Input bytes could not be decoded as an image
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// Target image format rejected the final pixel buffer
    #[error("Failed to encode {format}: {message}")]
    EncodingError { format: String, message: String },

    /// Page sequence or container could not be parsed or re-serialized
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// A page cannot host the reference-sized overlay
    #[error("Unsupported page geometry on page {page}: {reason}")]
    UnsupportedPageGeometry { page: u32, reason: String },

    /// A section of a flow document has no addressable header region
    #[error("Unsupported document structure: {0}")]
    UnsupportedDocumentStructure(String),

    /// Type tag is not one of image, pdf, word
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Options failed boundary validation
    #[error("Invalid watermark options: {0}")]
    InvalidOptions(String),
}

impl WatermarkError {
    pub fn encoding(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EncodingError {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn page_geometry(page: u32, reason: impl Into<String>) -> Self {
        Self::UnsupportedPageGeometry {
            page,
            reason: reason.into(),
        }
    }
}

impl From<lopdf::Error> for WatermarkError {
    fn from(err: lopdf::Error) -> Self {
        Self::CorruptDocument(err.to_string())
    }
}

impl From<zip::result::ZipError> for WatermarkError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::CorruptDocument(err.to_string())
    }
}
