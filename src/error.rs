// Error types module

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::watermark::WatermarkError;

/// Errors raised around a render: loading input, classifying it, writing output.
///
/// Render failures themselves are carried unchanged in [`ServiceError::Render`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration errors (invalid YAML, missing env vars, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input is larger than `limits.max_file_size`
    #[error("File {path} is {size} bytes, limit is {limit}")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Extension does not map to image, pdf or word
    #[error("Cannot determine file type of {0}")]
    UnknownFileType(PathBuf),

    /// Reading input or writing output failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer rejected the input
    #[error(transparent)]
    Render(#[from] WatermarkError),

    /// The worker running the job went away without reporting
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
