//! Waveform to WAV (16-bit signed PCM).

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::error::{MediaError, Result};

/// Sample rate assumed when the producer does not give one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Channel-major waveform (`channels[c][n]`) with values nominally in -1.0 ..= 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioClip {
    /// Builds a clip from per-channel sample vectors of equal length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: Option<u32>) -> Result<Self> {
        let first = channels
            .first()
            .ok_or_else(|| MediaError::InvalidShape("audio has no channels".to_string()))?;
        if first.is_empty() {
            return Err(MediaError::InvalidShape("audio has no samples".to_string()));
        }
        if channels.iter().any(|c| c.len() != first.len()) {
            return Err(MediaError::InvalidShape(
                "audio channels differ in length".to_string(),
            ));
        }
        if channels.len() > u16::MAX as usize {
            return Err(MediaError::InvalidShape(format!(
                "too many audio channels: {}",
                channels.len()
            )));
        }
        let sample_rate = sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(MediaError::InvalidOption("sample rate must be > 0".to_string()));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Promotes a flat waveform to a single-channel clip.
    pub fn mono(samples: Vec<f32>, sample_rate: Option<u32>) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Reads a WAV file (any integer depth or 32-bit float) into a normalized clip.
    pub fn from_wav(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<f32>, hound::Error>>()?
            }
        };
        let count = spec.channels.max(1) as usize;
        let mut channels = vec![Vec::with_capacity(interleaved.len() / count); count];
        for (i, sample) in interleaved.into_iter().enumerate() {
            channels[i % count].push(sample);
        }
        Self::new(channels, Some(spec.sample_rate))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }
}

fn to_pcm16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Writes `clip` as interleaved 16-bit PCM WAV.
pub fn encode_wav(clip: &AudioClip, path: &Path) -> Result<()> {
    debug!(
        channels = clip.channel_count(),
        frames = clip.frame_count(),
        sample_rate = clip.sample_rate,
        path = %path.display(),
        "Encoding audio"
    );
    let spec = WavSpec {
        channels: clip.channel_count() as u16,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for n in 0..clip.frame_count() {
        for channel in &clip.channels {
            writer.write_sample(to_pcm16(channel[n]))?;
        }
    }
    writer.finalize()?;
    Ok(())
}
