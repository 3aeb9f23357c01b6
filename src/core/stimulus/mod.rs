//! Stimulus encoding.
//!
//! Turns a test's raw input into the units the streaming channel accepts: one
//! text message, or a sequence of fixed-size PCM frames at the channel's input
//! rate. Encoding is deterministic; the same case and raw input always produce
//! byte-identical output, so retries can re-encode freely.

pub mod wav;

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::AudioConfig;
use crate::core::case::{Modality, TestCase};
use crate::core::realtime::StimulusUnit;
use crate::errors::{TesterError, TesterResult};

pub use wav::{AudioDecoder, WavDecoder, encode_wav, resample_linear};

/// Where voice input audio comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// WAV file on disk
    WavFile(PathBuf),
    /// In-memory WAV container (e.g. synthesized speech)
    WavBytes(Bytes),
}

/// Raw, unencoded test input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Audio(AudioSource),
}

/// Encoded input for one test attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stimulus {
    /// Sent as a single unit
    Text { content: String },
    /// PCM padded to a whole number of `frame_size` frames
    Audio {
        pcm: Bytes,
        sample_rate: u32,
        frame_size: usize,
    },
}

impl Stimulus {
    /// Number of units that will be sent over the channel.
    pub fn unit_count(&self) -> usize {
        match self {
            Stimulus::Text { .. } => 1,
            Stimulus::Audio {
                pcm, frame_size, ..
            } => pcm.len().div_ceil((*frame_size).max(1)),
        }
    }

    /// Audio frames in encode order. Empty for text stimuli.
    pub fn frames(&self) -> impl Iterator<Item = Bytes> + '_ {
        let (pcm, frame_size) = match self {
            Stimulus::Text { .. } => (Bytes::new(), 1),
            Stimulus::Audio {
                pcm, frame_size, ..
            } => (pcm.clone(), (*frame_size).max(1)),
        };
        (0..pcm.len())
            .step_by(frame_size)
            .map(move |start| pcm.slice(start..(start + frame_size).min(pcm.len())))
    }

    /// Channel units in send order.
    pub fn units(&self) -> Vec<StimulusUnit> {
        match self {
            Stimulus::Text { content } => vec![StimulusUnit::Text(content.clone())],
            Stimulus::Audio { .. } => self.frames().map(StimulusUnit::AudioFrame).collect(),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Stimulus::Audio { .. })
    }
}

/// Builds a [`Stimulus`] for a test case.
#[derive(Clone)]
pub struct StimulusEncoder {
    audio: AudioConfig,
    decoder: Arc<dyn AudioDecoder>,
}

impl StimulusEncoder {
    pub fn new(audio: AudioConfig, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self { audio, decoder }
    }

    /// Encoder backed by the WAV decoder.
    pub fn with_wav_decoder(audio: AudioConfig) -> Self {
        Self::new(audio, Arc::new(WavDecoder))
    }

    /// Encode raw input for a case.
    ///
    /// # Errors
    /// - `Config` when the input kind does not match the case modality
    /// - `Decode` when audio cannot be parsed or resampled
    pub fn encode(&self, case: &TestCase, raw: &RawInput) -> TesterResult<Stimulus> {
        match (case.modality, raw) {
            (Modality::Text, RawInput::Text(content)) => Ok(Stimulus::Text {
                content: content.clone(),
            }),
            (Modality::Voice, RawInput::Audio(source)) => self.encode_audio(source),
            (modality, _) => Err(TesterError::Config(format!(
                "Input kind does not match {modality} case {}",
                case.identity()
            ))),
        }
    }

    fn encode_audio(&self, source: &AudioSource) -> TesterResult<Stimulus> {
        let mut pcm = self.decoder.decode_and_resample(
            source,
            self.audio.input_sample_rate,
            self.audio.channels,
            self.audio.sample_width,
        )?;
        if pcm.is_empty() {
            return Err(TesterError::Decode("Decoded audio is empty".to_string()));
        }

        let frame_size = self.audio.frame_bytes;
        if frame_size == 0 {
            return Err(TesterError::Config("audio.frame_bytes must be non-zero".to_string()));
        }
        // Pad the tail with silence so every frame has the same size
        let padded = pcm.len().div_ceil(frame_size) * frame_size;
        pcm.resize(padded, 0);

        Ok(Stimulus::Audio {
            pcm: Bytes::from(pcm),
            sample_rate: self.audio.input_sample_rate,
            frame_size,
        })
    }
}
