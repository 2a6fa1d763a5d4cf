use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResizeError>;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("Input is {size} bytes, the limit is {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("Unsupported image format (expected PNG, JPEG or GIF)")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Invalid target size {width}x{height}: {reason}")]
    InvalidSize {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("Failed to encode {width}x{height} output: {source}")]
    Encode {
        width: u32,
        height: u32,
        #[source]
        source: image::ImageError,
    },

    #[error("Insufficient storage: {required_mb:.2}MB required, {available_mb:.2}MB available")]
    InsufficientStorage { required_mb: f64, available_mb: f64 },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
