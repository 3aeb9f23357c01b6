//! WAV decoding and resampling for voice stimuli.

use std::io::{Cursor, Read};

use bytes::Bytes;

use super::AudioSource;
use crate::errors::{TesterError, TesterResult};

/// Audio decode collaborator.
///
/// Produces raw little-endian PCM at the requested rate, channel count and
/// sample width, or fails with [`TesterError::Decode`].
pub trait AudioDecoder: Send + Sync {
    fn decode_and_resample(
        &self,
        source: &AudioSource,
        target_rate: u32,
        channels: u16,
        sample_width: u16,
    ) -> TesterResult<Vec<u8>>;
}

/// `hound` based WAV decoder with linear-interpolation resampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode_and_resample(
        &self,
        source: &AudioSource,
        target_rate: u32,
        channels: u16,
        sample_width: u16,
    ) -> TesterResult<Vec<u8>> {
        if sample_width != 2 {
            return Err(TesterError::Decode(format!(
                "Unsupported output sample width: {sample_width} bytes (only 16-bit PCM)"
            )));
        }
        if channels == 0 || target_rate == 0 {
            return Err(TesterError::Decode(
                "Target channels and sample rate must be non-zero".to_string(),
            ));
        }

        let (mono, source_rate) = match source {
            AudioSource::WavFile(path) => {
                let reader = hound::WavReader::open(path).map_err(|e| {
                    TesterError::Decode(format!("Failed to open {}: {e}", path.display()))
                })?;
                read_mono(reader)?
            }
            AudioSource::WavBytes(data) => {
                let reader = hound::WavReader::new(Cursor::new(data.as_ref()))?;
                read_mono(reader)?
            }
        };

        if mono.is_empty() {
            return Err(TesterError::Decode("WAV audio contains no samples".to_string()));
        }

        let resampled = resample_linear(&mono, source_rate, target_rate);
        tracing::debug!(
            "Decoded {} samples at {} Hz -> {} samples at {} Hz",
            mono.len(),
            source_rate,
            resampled.len(),
            target_rate
        );
        Ok(to_pcm16(&resampled, channels))
    }
}

/// Read every sample, normalize to `[-1.0, 1.0]` and average the channels.
fn read_mono<R: Read>(reader: hound::WavReader<R>) -> TesterResult<(Vec<f32>, u32)> {
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(TesterError::Decode(format!(
            "Invalid WAV header: {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
    };

    let width = usize::from(spec.channels);
    let mono = if width == 1 {
        samples
    } else {
        samples
            .chunks(width)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

/// Resample with linear interpolation.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let new_len = (samples.len() as f64 / ratio) as usize;
    let last = samples.len() - 1;

    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = i as f64 * ratio;
        let idx0 = (src_idx.floor() as usize).min(last);
        let idx1 = (idx0 + 1).min(last);
        let frac = src_idx - idx0 as f64;

        let sample = f64::from(samples[idx0]) * (1.0 - frac) + f64::from(samples[idx1]) * frac;
        resampled.push(sample as f32);
    }
    resampled
}

/// Convert mono float samples to interleaved 16-bit little-endian PCM.
fn to_pcm16(mono: &[f32], channels: u16) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(mono.len() * 2 * usize::from(channels));
    for &sample in mono {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        for _ in 0..channels {
            pcm.extend_from_slice(&value.to_le_bytes());
        }
    }
    pcm
}

/// Wrap 16-bit PCM in a RIFF/WAV container.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> TesterResult<Bytes> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for chunk in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(Bytes::from(cursor.into_inner()))
}
