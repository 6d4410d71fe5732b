//! Frame stacks to MP4.
//!
//! Raw RGB24 frames are piped into an external `ffmpeg` (libx264, yuv420p). Odd dimensions are
//! padded to even ones since yuv420p requires it.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, Result};
use crate::image::quantize;

/// Frame rate used for encoded video.
pub const DEFAULT_FPS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncodeOptions {
    pub fps: u32,
    /// ffmpeg executable name or path.
    pub ffmpeg_path: String,
}

impl Default for VideoEncodeOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

/// Frames × height × width × channels, values in 0.0 ..= 1.0. Channels may be 1, 3 or 4.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTensor {
    frames: usize,
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl VideoTensor {
    pub fn new(
        frames: usize,
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        if frames == 0 || height == 0 || width == 0 {
            return Err(MediaError::InvalidShape(format!(
                "video must be non-empty, got {}x{}x{}",
                frames, height, width
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(MediaError::InvalidShape(format!(
                "video channels must be 1, 3 or 4, got {}",
                channels
            )));
        }
        let expected = frames * height * width * channels;
        if data.len() != expected {
            return Err(MediaError::InvalidShape(format!(
                "video {}x{}x{}x{} needs {} values, got {}",
                frames,
                height,
                width,
                channels,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            frames,
            height,
            width,
            channels,
            data,
        })
    }

    /// Stacks equally sized image tensors into a video.
    pub fn from_frames(frames: &[crate::image::ImageTensor]) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| MediaError::InvalidShape("video has no frames".to_string()))?;
        let (h, w, c) = (first.height(), first.width(), first.channels());
        let mut data = Vec::with_capacity(frames.len() * h * w * c);
        for (i, frame) in frames.iter().enumerate() {
            if (frame.height(), frame.width(), frame.channels()) != (h, w, c) {
                return Err(MediaError::InvalidShape(format!(
                    "frame {} is {}x{}x{}, expected {}x{}x{}",
                    i,
                    frame.height(),
                    frame.width(),
                    frame.channels(),
                    h,
                    w,
                    c
                )));
            }
            data.extend_from_slice(frame.data());
        }
        Self::new(frames.len(), h, w, c, data)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// All frames as packed RGB24 bytes (gray is replicated, alpha dropped).
    pub fn to_rgb24(&self) -> Vec<u8> {
        let pixels = self.frames * self.height * self.width;
        let mut out = Vec::with_capacity(pixels * 3);
        for px in self.data.chunks_exact(self.channels) {
            match self.channels {
                1 => {
                    let v = quantize(px[0]);
                    out.extend_from_slice(&[v, v, v]);
                }
                _ => out.extend(px[..3].iter().copied().map(quantize)),
            }
        }
        out
    }
}

/// Everything but the output path, which is passed as an `OsStr` after these.
fn ffmpeg_args(tensor: &VideoTensor, fps: u32) -> Vec<String> {
    vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", tensor.width, tensor.height),
        "-r".into(),
        fps.to_string(),
        "-i".into(),
        "-".into(),
        "-vf".into(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
    ]
}

/// Encodes `tensor` to an MP4 file at `options.fps`.
pub async fn encode_mp4(tensor: &VideoTensor, options: &VideoEncodeOptions, path: &Path) -> Result<()> {
    if options.fps == 0 {
        return Err(MediaError::InvalidOption("fps must be > 0".to_string()));
    }
    let args = ffmpeg_args(tensor, options.fps);
    debug!(ffmpeg = %options.ffmpeg_path, args = ?args, output = %path.display(), "Spawning ffmpeg");

    let mut child = Command::new(&options.ffmpeg_path)
        .args(&args)
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MediaError::Ffmpeg(format!("failed to spawn {}: {}", options.ffmpeg_path, e)))?;

    let frames = tensor.to_rgb24();
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| MediaError::Ffmpeg("ffmpeg stdin unavailable".to_string()))?;
    let write_result = stdin.write_all(&frames).await;
    drop(stdin);

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::Ffmpeg(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    write_result?;

    info!(
        frames = tensor.frames,
        width = tensor.width,
        height = tensor.height,
        fps = options.fps,
        path = %path.display(),
        "Video encoded"
    );
    Ok(())
}
