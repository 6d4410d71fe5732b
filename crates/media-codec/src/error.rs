use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("WebP error: {0}")]
    WebP(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MediaError>;
