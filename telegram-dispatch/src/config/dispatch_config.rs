use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use media_codec::{ImageEncodeOptions, ImageFormat, VideoEncodeOptions};

use crate::api::DEFAULT_API_URL;

const DEFAULT_LOG_FILE: &str = "logs/media-dispatch.log";
const DEFAULT_FILE_PREFIX: &str = "Pipeline";

/// Everything one dispatch needs besides the media itself.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// CHAT_ID (numeric id or @channel username)
    pub chat_id: String,
    /// TELEGRAM_API_URL; requests go to `{url}/bot{token}/{method}`
    pub telegram_api_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// IMAGE_FORMAT, PNG_COMPRESS_LEVEL, JPEG_QUALITY, WEBP_LOSSLESS, WEBP_QUALITY
    pub image: ImageEncodeOptions,
    /// VIDEO_FPS, FFMPEG_PATH
    pub video: VideoEncodeOptions,
    /// FILE_PREFIX; leading part of every generated file name
    pub file_prefix: String,
    /// HTTP_TIMEOUT_SECS; unset means the HTTP client's default
    pub http_timeout_secs: Option<u64>,
    /// WORKSPACE_DIR; parent of per-dispatch temp dirs, system temp dir when unset
    pub workspace_dir: Option<PathBuf>,
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl DispatchConfig {
    /// Load from environment variables. `token` / `chat_id` override BOT_TOKEN / CHAT_ID if provided.
    pub fn load(token: Option<String>, chat_id: Option<String>) -> Result<Self> {
        let bot_token = token
            .or_else(|| env::var("BOT_TOKEN").ok())
            .unwrap_or_default();
        let chat_id = chat_id
            .or_else(|| env::var("CHAT_ID").ok())
            .unwrap_or_default();
        let telegram_api_url =
            env::var("TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

        let defaults = ImageEncodeOptions::default();
        let format = match env::var("IMAGE_FORMAT") {
            Ok(raw) => raw
                .parse::<ImageFormat>()
                .with_context(|| format!("IMAGE_FORMAT has invalid value {:?}", raw))?,
            Err(_) => defaults.format,
        };
        let image = ImageEncodeOptions {
            format,
            png_compress_level: env_parse("PNG_COMPRESS_LEVEL", defaults.png_compress_level)?,
            jpeg_quality: env_parse("JPEG_QUALITY", defaults.jpeg_quality)?,
            webp_lossless: env_parse("WEBP_LOSSLESS", defaults.webp_lossless)?,
            webp_quality: env_parse("WEBP_QUALITY", defaults.webp_quality)?,
        };

        let video_defaults = VideoEncodeOptions::default();
        let video = VideoEncodeOptions {
            fps: env_parse("VIDEO_FPS", video_defaults.fps)?,
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(video_defaults.ffmpeg_path),
        };

        let file_prefix =
            env::var("FILE_PREFIX").unwrap_or_else(|_| DEFAULT_FILE_PREFIX.to_string());
        let http_timeout_secs = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(_) => Some(env_parse("HTTP_TIMEOUT_SECS", 0u64)?),
            Err(_) => None,
        };
        let workspace_dir = env::var("WORKSPACE_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bot_token,
            chat_id,
            telegram_api_url,
            log_file,
            image,
            video,
            file_prefix,
            http_timeout_secs,
            workspace_dir,
        })
    }

    /// Validate config: credentials present, API URL parseable, encoder knobs in range.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is not set (pass --token or set it in .env)");
        }
        if self.chat_id.trim().is_empty() {
            anyhow::bail!("CHAT_ID is not set (pass --chat-id or set it in .env)");
        }
        if reqwest::Url::parse(&self.telegram_api_url).is_err() {
            anyhow::bail!(
                "TELEGRAM_API_URL is set but not a valid URL: {}",
                self.telegram_api_url
            );
        }
        self.image
            .validate()
            .context("Invalid image encoding settings")?;
        if self.video.fps == 0 {
            anyhow::bail!("VIDEO_FPS must be greater than 0");
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            anyhow::bail!(
                "FILE_PREFIX must be a non-empty name without path separators: {:?}",
                self.file_prefix
            );
        }
        if let Some(dir) = &self.workspace_dir {
            if !dir.is_dir() {
                anyhow::bail!("WORKSPACE_DIR is not a directory: {}", dir.display());
            }
        }
        if self.http_timeout_secs == Some(0) {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    /// HTTP client shared by the Bot API transport and remote downloads.
    pub fn http_client(&self) -> dispatch_core::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| {
            dispatch_core::DispatchError::Config(format!("Failed to create HTTP client: {}", e))
        })
    }
}
