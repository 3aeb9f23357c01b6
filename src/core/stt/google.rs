//! Google Cloud Speech-to-Text (`speech:recognize`) REST client.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://speech.googleapis.com/v1/speech:recognize`
//! - Audio: LINEAR16 mono, base64 encoded in the request body
//! - Auth: `key` query parameter or OAuth bearer token

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Transcriber;
use crate::config::{Credentials, TesterConfig};
use crate::core::google_auth::{GoogleAuth, api_error};
use crate::errors::{TesterError, TesterResult};

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    audio_channel_count: u16,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl RecognizeResponse {
    /// Top alternative of the first result, or an empty string.
    pub(crate) fn first_transcript(&self) -> String {
        self.results
            .first()
            .and_then(|r| r.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Google Cloud Speech-to-Text client.
#[derive(Debug, Clone)]
pub struct GoogleSpeechToText {
    http_client: Client,
    url: String,
    language_code: String,
    credentials: Credentials,
}

impl GoogleSpeechToText {
    /// Create a client from the tester configuration.
    ///
    /// Credentials are resolved per request, so a run without speech
    /// credentials only fails the cases that actually need the service.
    pub fn new(config: &TesterConfig) -> TesterResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| TesterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url: config.endpoints.speech_to_text_url.clone(),
            language_code: config.endpoints.language_code.clone(),
            credentials: config.credentials.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for GoogleSpeechToText {
    async fn transcribe(&self, audio: &[u8], sample_rate: u32) -> TesterResult<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let auth = GoogleAuth::from_credentials(&self.credentials)?;
        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: sample_rate,
                language_code: &self.language_code,
                audio_channel_count: 1,
            },
            audio: RecognitionAudio {
                content: BASE64_STANDARD.encode(audio),
            },
        };

        debug!(
            "Requesting transcription of {} bytes at {} Hz",
            audio.len(),
            sample_rate
        );
        let request = auth.apply(self.http_client.post(&self.url)).json(&body);
        let response = request.send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(api_error("Speech-to-Text", status, &response_text));
        }

        let parsed: RecognizeResponse = serde_json::from_str(&response_text)?;
        let transcript = parsed.first_transcript();
        info!("Transcription complete: {} characters", transcript.len());
        Ok(transcript)
    }
}
