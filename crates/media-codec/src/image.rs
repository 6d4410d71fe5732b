//! Still-image encoding: normalized float pixel buffers to PNG, JPEG or WebP files.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageBuffer, ImageEncoder, Luma, Rgb, Rgba};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MediaError, Result};

/// PNG text chunk keyword carrying the rendering context.
pub const PROMPT_KEYWORD: &str = "prompt";

/// Output container for the image input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::WebP => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::WebP),
            other => Err(MediaError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Format choice plus the per-format knobs. Only the knobs of the chosen format are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEncodeOptions {
    pub format: ImageFormat,
    /// 0 ..= 9, in three zlib tiers: 0-3 fast, 4-6 default, 7-9 best. Levels within one tier
    /// produce identical files.
    pub png_compress_level: u8,
    /// 1 ..= 100.
    pub jpeg_quality: u8,
    pub webp_lossless: bool,
    /// 1 ..= 100; used when `webp_lossless` is false.
    pub webp_quality: u8,
}

impl Default for ImageEncodeOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            png_compress_level: 4,
            jpeg_quality: 90,
            webp_lossless: false,
            webp_quality: 90,
        }
    }
}

impl ImageEncodeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.png_compress_level > 9 {
            return Err(MediaError::InvalidOption(format!(
                "png_compress_level must be 0..=9, got {}",
                self.png_compress_level
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(MediaError::InvalidOption(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if !(1..=100).contains(&self.webp_quality) {
            return Err(MediaError::InvalidOption(format!(
                "webp_quality must be 1..=100, got {}",
                self.webp_quality
            )));
        }
        Ok(())
    }
}

/// Height × width × channel pixel buffer with values in 0.0 ..= 1.0, row-major, channels last.
/// Channels may be 1 (gray), 3 (RGB) or 4 (RGBA).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(MediaError::InvalidShape(format!(
                "image must be non-empty, got {}x{}",
                height, width
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(MediaError::InvalidShape(format!(
                "image channels must be 1, 3 or 4, got {}",
                channels
            )));
        }
        let expected = height * width * channels;
        if data.len() != expected {
            return Err(MediaError::InvalidShape(format!(
                "image {}x{}x{} needs {} values, got {}",
                height,
                width,
                channels,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Accepts `[h, w, c]` or a single-item batch `[1, h, w, c]`.
    pub fn from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        match *shape {
            [h, w, c] | [1, h, w, c] => Self::new(h, w, c, data),
            _ => Err(MediaError::InvalidShape(format!(
                "expected [h, w, c] or [1, h, w, c], got {:?}",
                shape
            ))),
        }
    }

    /// Builds a tensor from a decoded image, keeping gray/RGB/RGBA layout.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let color = img.color();
        let (width, height) = (img.width() as usize, img.height() as usize);
        let (channels, bytes) = if color.has_alpha() {
            (4, img.to_rgba8().into_raw())
        } else if color.channel_count() == 1 {
            (1, img.to_luma8().into_raw())
        } else {
            (3, img.to_rgb8().into_raw())
        };
        Self {
            height,
            width,
            channels,
            data: bytes.into_iter().map(|b| b as f32 / 255.0).collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Quantizes to 8-bit: `clamp(255 * v, 0, 255)`, truncated.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().copied().map(quantize).collect()
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width as u32, self.height as u32);
        let bytes = self.to_bytes();
        let img = match self.channels {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, bytes).map(DynamicImage::ImageRgba8),
            _ => None,
        };
        img.ok_or_else(|| {
            MediaError::InvalidShape(format!(
                "cannot build {}x{}x{} image",
                self.height, self.width, self.channels
            ))
        })
    }
}

pub(crate) fn quantize(v: f32) -> u8 {
    (v * 255.0).clamp(0.0, 255.0) as u8
}

/// The png encoder exposes three deflate presets.
fn png_compression(level: u8) -> png::Compression {
    match level {
        0..=3 => png::Compression::Fast,
        4..=6 => png::Compression::Default,
        _ => png::Compression::Best,
    }
}

/// Encodes `tensor` to `path` in the configured format. `prompt` is embedded as a PNG text chunk
/// (other formats ignore it).
pub fn encode_image(
    tensor: &ImageTensor,
    options: &ImageEncodeOptions,
    prompt: Option<&serde_json::Value>,
    path: &Path,
) -> Result<()> {
    options.validate()?;
    debug!(
        format = %options.format,
        height = tensor.height,
        width = tensor.width,
        channels = tensor.channels,
        path = %path.display(),
        "Encoding image"
    );
    match options.format {
        ImageFormat::Png => encode_png(tensor, options.png_compress_level, prompt, path),
        ImageFormat::Jpeg => encode_jpeg(tensor, options.jpeg_quality, path),
        ImageFormat::WebP => encode_webp(tensor, options.webp_lossless, options.webp_quality, path),
    }
}

fn encode_png(
    tensor: &ImageTensor,
    level: u8,
    prompt: Option<&serde_json::Value>,
    path: &Path,
) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(writer, tensor.width as u32, tensor.height as u32);
    encoder.set_color(match tensor.channels {
        1 => png::ColorType::Grayscale,
        4 => png::ColorType::Rgba,
        _ => png::ColorType::Rgb,
    });
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png_compression(level));
    if let Some(prompt) = prompt {
        let text = prompt.to_string();
        if text.is_ascii() {
            encoder.add_text_chunk(PROMPT_KEYWORD.to_string(), text)?;
        } else {
            encoder.add_itxt_chunk(PROMPT_KEYWORD.to_string(), text)?;
        }
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&tensor.to_bytes())?;
    writer.finish()?;
    Ok(())
}

fn encode_jpeg(tensor: &ImageTensor, quality: u8, path: &Path) -> Result<()> {
    let img = tensor.to_dynamic()?;
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    if tensor.channels == 1 {
        let gray = img.to_luma8();
        encoder.write_image(gray.as_raw(), gray.width(), gray.height(), ExtendedColorType::L8)?;
    } else {
        let rgb = img.to_rgb8();
        encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
    }
    writer.flush()?;
    Ok(())
}

fn encode_webp(tensor: &ImageTensor, lossless: bool, quality: u8, path: &Path) -> Result<()> {
    let img = tensor.to_dynamic()?;
    if lossless {
        let mut writer = BufWriter::new(File::create(path)?);
        let encoder = WebPEncoder::new_lossless(&mut writer);
        if tensor.channels == 4 {
            let rgba = img.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)?;
        } else {
            let rgb = img.to_rgb8();
            encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
        }
        writer.flush()?;
        return Ok(());
    }

    // image only writes VP8L; lossy output goes through libwebp.
    let (w, h) = (img.width(), img.height());
    let memory = if tensor.channels == 4 {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode_simple(false, quality as f32)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), w, h).encode_simple(false, quality as f32)
    }
    .map_err(|e| MediaError::WebP(format!("{:?}", e)))?;
    std::fs::write(path, &*memory)?;
    Ok(())
}
