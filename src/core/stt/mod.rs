//! Speech-to-text collaborator used to verify audio responses.

pub mod google;

use async_trait::async_trait;

use crate::errors::TesterResult;

pub use google::GoogleSpeechToText;

/// Transcribes raw 16-bit mono PCM.
///
/// Unintelligible audio yields an empty string rather than an error; errors are
/// reserved for transport and credential problems.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], sample_rate: u32) -> TesterResult<String>;
}
