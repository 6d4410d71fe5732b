//! Media encoders used before dispatch.
//!
//! Turns normalized float buffers into files: images to PNG/JPEG/WebP ([`encode_image`]), frame
//! stacks to MP4 through an external ffmpeg ([`encode_mp4`]), and waveforms to 16-bit PCM WAV
//! ([`encode_wav`]).

pub mod audio;
mod error;
pub mod image;
pub mod video;

pub use audio::{encode_wav, AudioClip, DEFAULT_SAMPLE_RATE};
pub use error::{MediaError, Result};
pub use crate::image::{encode_image, ImageEncodeOptions, ImageFormat, ImageTensor, PROMPT_KEYWORD};
pub use video::{encode_mp4, VideoEncodeOptions, VideoTensor, DEFAULT_FPS};
