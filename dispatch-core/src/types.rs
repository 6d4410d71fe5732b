//! Core types: media kind and item, caption/delivery options, and the per-request payload.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Telegram `parse_mode` sent with every request.
pub const PARSE_MODE: &str = "Markdown";

/// Status string returned by a completed dispatch.
pub const SUCCESS_MESSAGE: &str = "Telegram message sent successfully";

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

/// Delivery kind of a media file. Selects the Bot API method and the multipart field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Bot API method used to deliver this kind.
    pub fn method(self) -> &'static str {
        match self {
            MediaKind::Photo => "sendPhoto",
            MediaKind::Video => "sendVideo",
            MediaKind::Audio => "sendAudio",
            MediaKind::Document => "sendDocument",
        }
    }

    /// Multipart field the file is attached under.
    pub fn field_name(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// Infers the kind from a file extension (with or without the leading dot, any case).
    /// Unknown extensions are delivered as documents.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Photo
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Document
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Document)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// One file in the workspace plus how it is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub path: PathBuf,
}

impl MediaItem {
    pub fn new(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// File name used for the multipart part; falls back to the field name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.kind.field_name().to_string())
    }
}

/// Caption text and its markup flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOptions {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub code: bool,
}

impl TextOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn code(mut self, code: bool) -> Self {
        self.code = code;
        self
    }

    /// Renders the caption. Code wrapping is applied to the raw text and wins over bold.
    pub fn render(&self) -> String {
        if self.code {
            format!("```{}```", self.text)
        } else if self.bold {
            format!("**{}**", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Flags forwarded verbatim on every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    #[serde(default)]
    pub disable_notification: bool,
    #[serde(default)]
    pub protect_content: bool,
}

/// Everything but the file that goes into one outbound call. The bot token lives in the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub chat_id: String,
    pub caption: String,
    pub delivery: DeliveryOptions,
}

impl DispatchRequest {
    pub fn new(chat_id: impl Into<String>, text: &TextOptions, delivery: DeliveryOptions) -> Self {
        Self {
            chat_id: chat_id.into(),
            caption: text.render(),
            delivery,
        }
    }

    /// Form fields shared by all methods; `text_field` is `text` for messages, `caption` for media.
    pub fn form_fields(&self, text_field: &'static str) -> Vec<(&'static str, String)> {
        vec![
            ("chat_id", self.chat_id.clone()),
            (text_field, self.caption.clone()),
            ("parse_mode", PARSE_MODE.to_string()),
            (
                "disable_notification",
                self.delivery.disable_notification.to_string(),
            ),
            ("protect_content", self.delivery.protect_content.to_string()),
        ]
    }
}
