//! # dispatch-core
//!
//! Core types and traits for media dispatch: [`Transport`], [`MediaItem`] and [`MediaKind`],
//! caption/delivery options, the error type, and tracing initialization. Transport-agnostic; used by
//! telegram-dispatch and dispatch-cli.

pub mod error;
pub mod logger;
pub mod transport;
pub mod types;

pub use error::{DispatchError, Result};
pub use logger::{init_tracing, mask_token};
pub use transport::Transport;
pub use types::{
    DeliveryOptions, DispatchRequest, MediaItem, MediaKind, TextOptions, PARSE_MODE,
    SUCCESS_MESSAGE,
};
