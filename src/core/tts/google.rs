//! Google Cloud Text-to-Speech (`text:synthesize`) REST client.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://texttospeech.googleapis.com/v1/text:synthesize`
//! - Output: LINEAR16 (WAV container), base64 encoded in `audioContent`

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SpeechSynthesizer;
use crate::config::{Credentials, TesterConfig};
use crate::core::google_auth::{GoogleAuth, api_error};
use crate::errors::{TesterError, TesterResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: SynthesisAudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisAudioConfig {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Google Cloud Text-to-Speech client.
#[derive(Debug, Clone)]
pub struct GoogleTextToSpeech {
    http_client: Client,
    url: String,
    language_code: String,
    credentials: Credentials,
}

impl GoogleTextToSpeech {
    /// Create a client from the tester configuration.
    ///
    /// Credentials are resolved per request, so a run without speech
    /// credentials only fails the cases that actually need the service.
    pub fn new(config: &TesterConfig) -> TesterResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TesterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url: config.endpoints.text_to_speech_url.clone(),
            language_code: config.endpoints.language_code.clone(),
            credentials: config.credentials.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTextToSpeech {
    async fn synthesize(&self, text: &str, sample_rate: u32) -> TesterResult<Bytes> {
        let auth = GoogleAuth::from_credentials(&self.credentials)?;
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                ssml_gender: "NEUTRAL",
            },
            audio_config: SynthesisAudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: sample_rate,
            },
        };

        let response = auth
            .apply(self.http_client.post(&self.url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(api_error("Text-to-Speech", status, &response_text));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&response_text)?;
        let audio = BASE64_STANDARD.decode(parsed.audio_content.as_bytes())?;
        if audio.is_empty() {
            return Err(TesterError::Transport(
                "Text-to-Speech returned no audio".to_string(),
            ));
        }

        info!("Synthesized {} bytes of speech for the voice stimulus", audio.len());
        Ok(Bytes::from(audio))
    }
}
