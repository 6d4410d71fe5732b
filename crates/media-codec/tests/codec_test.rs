//! Integration tests for media-codec encoders.
//!
//! Each encoder writes into a temp dir; the file is decoded again and compared against the input
//! within the format's tolerance (exact for PNG / lossless WebP / WAV, bounded error for JPEG / lossy WebP).

use std::fs::File;
use std::path::Path;

use media_codec::{
    encode_image, encode_mp4, encode_wav, AudioClip, ImageEncodeOptions, ImageFormat,
    ImageTensor, VideoEncodeOptions, VideoTensor, PROMPT_KEYWORD,
};
use tempfile::TempDir;

/// Smooth 8x6 gradient.
fn gradient(channels: usize) -> ImageTensor {
    let (h, w) = (6, 8);
    let mut data = Vec::with_capacity(h * w * channels);
    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                let v = (x * 20 + y * 10 + c * 30).min(255) as f32 / 255.0;
                data.push(v);
            }
        }
    }
    ImageTensor::new(h, w, channels, data).unwrap()
}

fn decoded_bytes(path: &Path, channels: usize) -> Vec<u8> {
    let img = image::open(path).unwrap();
    match channels {
        1 => img.to_luma8().into_raw(),
        4 => img.to_rgba8().into_raw(),
        _ => img.to_rgb8().into_raw(),
    }
}

fn mean_abs_error(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x as i16 - *y as i16).unsigned_abs() as u64)
        .sum();
    total as f64 / a.len() as f64
}

fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// **Test: PNG is lossless at every compression level and for every channel layout.**
#[test]
fn png_roundtrip_all_levels() {
    let dir = TempDir::new().unwrap();
    for channels in [1, 3, 4] {
        let tensor = gradient(channels);
        for level in 0..=9 {
            let path = dir.path().join(format!("img_{}_{}.png", channels, level));
            let options = ImageEncodeOptions {
                format: ImageFormat::Png,
                png_compress_level: level,
                ..Default::default()
            };
            encode_image(&tensor, &options, None, &path).unwrap();
            assert_eq!(decoded_bytes(&path, channels), tensor.to_bytes());
        }
    }
}

/// **Test: The rendering context is stored as a `prompt` text chunk on PNG output.**
#[test]
fn png_embeds_prompt_chunk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("with_prompt.png");
    let prompt = serde_json::json!({"3": {"class_type": "KSampler", "inputs": {"seed": 42}}});
    encode_image(&gradient(3), &ImageEncodeOptions::default(), Some(&prompt), &path).unwrap();

    let mut decoder = png::Decoder::new(File::open(&path).unwrap());
    decoder.set_ignore_text_chunk(false);
    let reader = decoder.read_info().unwrap();
    let chunk = reader
        .info()
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == PROMPT_KEYWORD)
        .expect("prompt chunk present");
    let parsed: serde_json::Value = serde_json::from_str(&chunk.text).unwrap();
    assert_eq!(parsed, prompt);
}

/// **Test: JPEG decodes to the same size at every quality; high quality stays close to the input.**
#[test]
fn jpeg_quality_range() {
    let dir = TempDir::new().unwrap();
    let tensor = gradient(3);
    for quality in [1u8, 25, 50, 75, 90, 100] {
        let path = dir.path().join(format!("img_{}.jpeg", quality));
        let options = ImageEncodeOptions {
            format: ImageFormat::Jpeg,
            jpeg_quality: quality,
            ..Default::default()
        };
        encode_image(&tensor, &options, None, &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
        if quality >= 90 {
            let err = mean_abs_error(&img.to_rgb8().into_raw(), &tensor.to_bytes());
            assert!(err < 12.0, "quality {} mean error {}", quality, err);
        }
    }
}

/// **Test: JPEG accepts RGBA input by dropping alpha.**
#[test]
fn jpeg_drops_alpha() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rgba.jpeg");
    let options = ImageEncodeOptions {
        format: ImageFormat::Jpeg,
        ..Default::default()
    };
    encode_image(&gradient(4), &options, None, &path).unwrap();
    assert_eq!(image::open(&path).unwrap().color().channel_count(), 3);
}

/// **Test: Lossless WebP round-trips exactly for RGB and RGBA.**
#[test]
fn webp_lossless_roundtrip() {
    let dir = TempDir::new().unwrap();
    for channels in [3, 4] {
        let tensor = gradient(channels);
        let path = dir.path().join(format!("img_{}.webp", channels));
        let options = ImageEncodeOptions {
            format: ImageFormat::WebP,
            webp_lossless: true,
            ..Default::default()
        };
        encode_image(&tensor, &options, None, &path).unwrap();
        assert_eq!(decoded_bytes(&path, channels), tensor.to_bytes());
    }
}

/// 64x64 RGB image with detail in both directions.
fn textured() -> ImageTensor {
    let (h, w, channels) = (64, 64, 3);
    let mut data = Vec::with_capacity(h * w * channels);
    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                let v = ((x * 4 + c * 20) as f32 / 255.0 + ((y as f32) * 0.4).sin() * 0.2)
                    .clamp(0.0, 1.0);
                data.push(v);
            }
        }
    }
    ImageTensor::new(h, w, channels, data).unwrap()
}

fn webp_lossy(tensor: &ImageTensor, quality: u8, path: &Path) -> Vec<u8> {
    let options = ImageEncodeOptions {
        format: ImageFormat::WebP,
        webp_lossless: false,
        webp_quality: quality,
        ..Default::default()
    };
    encode_image(tensor, &options, None, path).unwrap();
    std::fs::read(path).unwrap()
}

/// **Test: Lossy WebP stays close to the input at high quality and is written as VP8.**
#[test]
fn webp_lossy_bounded_error() {
    let dir = TempDir::new().unwrap();
    let tensor = textured();
    let path = dir.path().join("lossy.webp");
    let bytes = webp_lossy(&tensor, 95, &path);

    assert_eq!(&bytes[12..16], b"VP8 ");
    let err = mean_abs_error(&decoded_bytes(&path, 3), &tensor.to_bytes());
    assert!(err < 12.0, "mean abs error {} too high at quality 95", err);
}

/// **Test: webp_quality changes lossy output.**
#[test]
fn webp_quality_affects_output() {
    let dir = TempDir::new().unwrap();
    let tensor = textured();
    let low = webp_lossy(&tensor, 1, &dir.path().join("q1.webp"));
    let high = webp_lossy(&tensor, 100, &dir.path().join("q100.webp"));

    assert_ne!(low, high);
    assert!(low.len() < high.len(), "q1={} q100={}", low.len(), high.len());
}

/// **Test: Out-of-range options are rejected before any file is written.**
#[test]
fn invalid_options_write_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.jpeg");
    let options = ImageEncodeOptions {
        format: ImageFormat::Jpeg,
        jpeg_quality: 0,
        ..Default::default()
    };
    assert!(encode_image(&gradient(3), &options, None, &path).is_err());
    assert!(!path.exists());
}

/// **Test: Mono audio becomes a one-channel 16-bit WAV at the default rate.**
#[test]
fn wav_mono_promotion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mono.wav");
    let clip = AudioClip::mono(vec![0.0, 0.5, -0.5, 1.0, -1.0], None).unwrap();
    encode_wav(&clip, &path).unwrap();

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![0, 16383, -16383, 32767, -32767]);
}

/// **Test: Stereo audio is interleaved frame by frame and reads back through `from_wav`.**
#[test]
fn wav_stereo_interleaved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");
    let clip = AudioClip::new(vec![vec![1.0, 0.0], vec![-1.0, 0.5]], Some(22050)).unwrap();
    encode_wav(&clip, &path).unwrap();

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 22050);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![32767, -32767, 0, 16383]);

    let back = AudioClip::from_wav(&path).unwrap();
    assert_eq!(back.channel_count(), 2);
    assert_eq!(back.frame_count(), 2);
    assert_eq!(back.sample_rate(), 22050);
    assert!((back.channels()[1][1] - 0.5).abs() < 1e-3);
}

/// **Test: MP4 encoding produces a non-empty file (skipped without ffmpeg on PATH).**
#[tokio::test]
async fn mp4_encodes_frames() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not found; skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clip.mp4");
    let frames: Vec<ImageTensor> = (0..6).map(|_| gradient(3)).collect();
    let video = VideoTensor::from_frames(&frames).unwrap();
    encode_mp4(&video, &VideoEncodeOptions::default(), &path)
        .await
        .unwrap();
    let len = std::fs::metadata(&path).unwrap().len();
    assert!(len > 0);
}
