//! # Telegram media dispatch
//!
//! Converts pipeline outputs (image, video and audio buffers, a remote video URL, a local file) into
//! files in a per-call temporary workspace and delivers them to a chat through the Telegram Bot API.
//! Core types and the [`Transport`] trait come from dispatch-core; encoders from media-codec.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod fetch;
pub mod workspace;

pub use api::{HttpTransport, DEFAULT_API_URL};
pub use config::DispatchConfig;
pub use dispatcher::{DispatchInputs, MediaDispatcher};
pub use workspace::Workspace;

pub use dispatch_core::{
    init_tracing, mask_token, DeliveryOptions, DispatchError, DispatchRequest, MediaItem,
    MediaKind, Result, TextOptions, Transport, SUCCESS_MESSAGE,
};
pub use media_codec::{
    AudioClip, ImageEncodeOptions, ImageFormat, ImageTensor, VideoEncodeOptions, VideoTensor,
};
