//! Audio Test Fixtures
//!
//! Programmatically generated audio so tests have no external file
//! dependencies and stay reproducible.
//!
//! Audio formats:
//! - Bit depth: 16-bit signed PCM, little-endian
//! - Channels: mono unless stated otherwise

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Input rate expected by the Live API
pub const INPUT_RATE: u32 = 16000;

/// Output rate of Live API audio responses
pub const OUTPUT_RATE: u32 = 24000;

/// Generate silence (zeros)
pub fn generate_silence(duration_samples: usize) -> Vec<i16> {
    vec![0i16; duration_samples]
}

/// Generate a sine wave tone at `sample_rate`
pub fn generate_sine_wave(
    duration_samples: usize,
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Generate speech-like pattern with variable amplitude envelope
pub fn generate_speech_pattern(duration_samples: usize, sample_rate: u32) -> Vec<i16> {
    let mut samples = Vec::with_capacity(duration_samples);
    let base_freq = 150.0;

    let mut state: u64 = 54321;
    let mut envelope = 0.0f32;

    for i in 0..duration_samples {
        // New syllable every 50ms
        if i % (sample_rate as usize / 20) == 0 {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let target = ((state >> 16) & 0x7FFF) as f32 / 0x7FFF as f32;
            envelope = envelope * 0.7 + target * 0.3;
        }

        let t = i as f32 / sample_rate as f32;
        let fundamental = (2.0 * PI * base_freq * t).sin();
        let harmonic2 = (2.0 * PI * base_freq * 2.0 * t).sin() * 0.5;
        let harmonic3 = (2.0 * PI * base_freq * 3.0 * t).sin() * 0.25;

        let waveform = (fundamental + harmonic2 + harmonic3) / 1.75;
        samples.push((waveform * envelope * i16::MAX as f32 * 0.6) as i16);
    }

    samples
}

/// Convert i16 samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode samples as an in-memory 16-bit WAV file
pub fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write a speech-like WAV file of `millis` duration into `dir`
pub fn write_speech_wav(dir: &Path, millis: u32, sample_rate: u32, channels: u16) -> PathBuf {
    let frames = (sample_rate * millis / 1000) as usize;
    let mono = generate_speech_pattern(frames, sample_rate);
    let samples: Vec<i16> = mono
        .iter()
        .flat_map(|&s| std::iter::repeat_n(s, channels as usize))
        .collect();
    let path = dir.join("voice_input.wav");
    std::fs::write(&path, wav_bytes(&samples, sample_rate, channels)).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_generation() {
        let silence = generate_silence(1600);
        assert_eq!(silence.len(), 1600);
        assert!(silence.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_wav_bytes_header() {
        let wav = wav_bytes(&generate_sine_wave(160, 440.0, 0.5, INPUT_RATE), INPUT_RATE, 1);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 320);
    }
}
