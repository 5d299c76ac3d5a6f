use thiserror::Error;

#[derive(Error, Debug)]
pub enum StormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid filter image: {0}")]
    InvalidFilter(String),

    #[error("frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("empty frame sequence")]
    EmptySequence,

    #[error("cancelled")]
    Cancelled,

    #[error("hdf5 error: {0}")]
    Hdf5(String),
}

pub type Result<T> = std::result::Result<T, StormError>;
