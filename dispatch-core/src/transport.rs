//! Transport abstraction for delivering captions and media files.
//!
//! [`Transport`] is HTTP-agnostic; telegram-dispatch's `HttpTransport` implements it with reqwest.

use crate::error::Result;
use crate::types::{DispatchRequest, MediaItem};
use async_trait::async_trait;

/// Delivers one request at a time. Implementations map to a messaging backend (e.g. Telegram).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the caption alone (`sendMessage`).
    async fn send_message(&self, request: &DispatchRequest) -> Result<()>;
    /// Sends one media file with the caption as accompanying text. The file must exist.
    async fn send_media(&self, request: &DispatchRequest, item: &MediaItem) -> Result<()>;
}
