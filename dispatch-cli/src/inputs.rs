//! Loads `send` file arguments into [`DispatchInputs`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use media_codec::{AudioClip, ImageTensor, VideoTensor};
use telegram_dispatch::DispatchInputs;

/// Frame extensions picked up from a `--video-frames` directory.
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Raw file arguments of the `send` command.
#[derive(Debug, Default)]
pub struct InputArgs {
    pub image: Option<PathBuf>,
    pub video_frames: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    pub video_url: Option<String>,
    pub file: Option<PathBuf>,
    pub prompt_json: Option<PathBuf>,
}

pub fn load_image(path: &Path) -> Result<ImageTensor> {
    let img = image::open(path).with_context(|| format!("Decode image {}", path.display()))?;
    Ok(ImageTensor::from_dynamic(&img))
}

/// Decodes every image in `dir` (sorted by file name) into one video buffer.
pub fn load_frames(dir: &Path) -> Result<VideoTensor> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Read frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        anyhow::bail!("No image frames found in {}", dir.display());
    }
    let frames = paths
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<Vec<_>>>()?;
    VideoTensor::from_frames(&frames).context("Frames must share one size and channel layout")
}

pub fn load_audio(path: &Path) -> Result<AudioClip> {
    AudioClip::from_wav(path).with_context(|| format!("Read WAV {}", path.display()))
}

pub fn load_prompt(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Read prompt JSON {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Parse prompt JSON {}", path.display()))
}

impl InputArgs {
    pub fn into_inputs(self) -> Result<DispatchInputs> {
        Ok(DispatchInputs {
            image: self.image.as_deref().map(load_image).transpose()?,
            video: self.video_frames.as_deref().map(load_frames).transpose()?,
            audio: self.audio.as_deref().map(load_audio).transpose()?,
            video_url: self.video_url,
            file_path: self.file,
            prompt: self.prompt_json.as_deref().map(load_prompt).transpose()?,
        })
    }
}
