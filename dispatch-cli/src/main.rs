//! media-dispatch CLI: send pipeline outputs (image, frames, audio, URL, file) to a Telegram chat.
//! Config from env and optional CLI args.

mod inputs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispatch_core::{init_tracing, mask_token, DeliveryOptions, TextOptions};
use telegram_dispatch::{DispatchConfig, MediaDispatcher};
use tracing::info;

use crate::inputs::InputArgs;

#[derive(Parser)]
#[command(name = "media-dispatch")]
#[command(about = "Send generated media to Telegram: send, check-config", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode the given inputs and send them (text only when no media is given).
    Send {
        /// Message text or caption.
        #[arg(long, default_value = "")]
        text: String,
        /// Render the text bold.
        #[arg(long)]
        bold: bool,
        /// Render the text as a code block (wins over --bold).
        #[arg(long)]
        code: bool,
        #[arg(long)]
        disable_notification: bool,
        #[arg(long)]
        protect_content: bool,
        /// Image file, re-encoded with IMAGE_FORMAT.
        #[arg(long)]
        image: Option<PathBuf>,
        /// Directory of same-sized frames (sorted by name), encoded to MP4.
        #[arg(long)]
        video_frames: Option<PathBuf>,
        /// WAV file, re-encoded as 16-bit PCM.
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Remote video downloaded into the workspace before sending.
        #[arg(long)]
        video_url: Option<String>,
        /// Local file sent as-is; method chosen by extension.
        #[arg(long)]
        file: Option<PathBuf>,
        /// JSON embedded as the PNG "prompt" text chunk.
        #[arg(long)]
        prompt_json: Option<PathBuf>,
        /// Overrides BOT_TOKEN.
        #[arg(short, long)]
        token: Option<String>,
        /// Overrides CHAT_ID.
        #[arg(short, long)]
        chat_id: Option<String>,
    },
    /// Print the effective config (token masked) and exit.
    CheckConfig {
        #[arg(short, long)]
        token: Option<String>,
        #[arg(short, long)]
        chat_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            text,
            bold,
            code,
            disable_notification,
            protect_content,
            image,
            video_frames,
            audio,
            video_url,
            file,
            prompt_json,
            token,
            chat_id,
        } => {
            let args = InputArgs {
                image,
                video_frames,
                audio,
                video_url,
                file,
                prompt_json,
            };
            let text = TextOptions::new(text).bold(bold).code(code);
            let delivery = DeliveryOptions {
                disable_notification,
                protect_content,
            };
            handle_send(token, chat_id, args, text, delivery).await
        }
        Commands::CheckConfig { token, chat_id } => handle_check_config(token, chat_id),
    }
}

async fn handle_send(
    token: Option<String>,
    chat_id: Option<String>,
    args: InputArgs,
    text: TextOptions,
    delivery: DeliveryOptions,
) -> Result<()> {
    let config = DispatchConfig::load(token, chat_id)?;
    config.validate()?;
    init_tracing(&config.log_file)?;

    info!(
        token = %mask_token(&config.bot_token),
        chat_id = %config.chat_id,
        "Starting dispatch"
    );

    let inputs = args.into_inputs().context("Load input files")?;
    let dispatcher = MediaDispatcher::from_config(&config).context("Build dispatcher")?;
    let status = dispatcher
        .dispatch(&inputs, &text, delivery)
        .await
        .context("Send to Telegram")?;

    println!("{}", status);
    Ok(())
}

fn handle_check_config(token: Option<String>, chat_id: Option<String>) -> Result<()> {
    let config = DispatchConfig::load(token, chat_id)?;

    println!("bot_token:         {}", mask_token(&config.bot_token));
    println!("chat_id:           {}", config.chat_id);
    println!("telegram_api_url:  {}", config.telegram_api_url);
    println!("log_file:          {}", config.log_file);
    println!("image_format:      {}", config.image.format.extension());
    println!("png_compress_level: {}", config.image.png_compress_level);
    println!("jpeg_quality:      {}", config.image.jpeg_quality);
    println!(
        "webp:              lossless={} quality={}",
        config.image.webp_lossless, config.image.webp_quality
    );
    println!("video_fps:         {}", config.video.fps);
    println!("ffmpeg_path:       {}", config.video.ffmpeg_path);
    println!("file_prefix:       {}", config.file_prefix);
    println!(
        "http_timeout_secs: {}",
        config
            .http_timeout_secs
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "workspace_dir:     {}",
        config
            .workspace_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(system temp dir)".to_string())
    );

    config.validate().context("Config is invalid")?;
    println!("\nConfig OK.");
    Ok(())
}
