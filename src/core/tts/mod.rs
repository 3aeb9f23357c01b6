//! Text-to-speech collaborator used to produce the voice stimulus.

pub mod google;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::TesterResult;

pub use google::GoogleTextToSpeech;

/// Synthesizes speech for a prompt.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns a complete WAV container with 16-bit PCM at `sample_rate`.
    async fn synthesize(&self, text: &str, sample_rate: u32) -> TesterResult<Bytes>;
}
