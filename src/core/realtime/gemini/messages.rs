//! Gemini Live API WebSocket message types.
//!
//! All messages are JSON objects keyed by their message type.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Session configuration, must be the first message
//! - clientContent - Complete conversation turns (text)
//! - realtimeInput - Streaming audio chunks and end-of-stream marker
//!
//! Server messages (received from server):
//! - setupComplete - Session accepted
//! - serverContent - Model output parts, transcriptions, turn completion
//! - goAway - Server is about to terminate the connection
//! - toolCall / usageMetadata - Ignored by the tester

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::config::GeminiLiveConfig;
use crate::core::realtime::StreamEvent;
use crate::errors::{TesterError, TesterResult};

// =============================================================================
// Client Messages (sent to server)
// =============================================================================

/// Client message envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
}

/// Session setup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// Conversation content with a role and text parts.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioTranscriptionConfig {}

/// Complete turns appended to the conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

/// Streaming input.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

/// Inline binary data, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl ClientMessage {
    /// Build the setup message for a session.
    pub fn setup(config: &GeminiLiveConfig) -> Self {
        let system_instruction = (!config.system_instruction.trim().is_empty()).then(|| Content {
            role: None,
            parts: vec![TextPart {
                text: config.system_instruction.clone(),
            }],
        });
        let tools = if config.google_search {
            vec![Tool {
                google_search: GoogleSearch::default(),
            }]
        } else {
            Vec::new()
        };

        ClientMessage::Setup(Setup {
            model: config.model_path.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec![config.response_modality.as_str().to_string()],
            },
            system_instruction,
            tools,
            output_audio_transcription: config
                .output_transcription
                .then(AudioTranscriptionConfig::default),
        })
    }

    /// A complete user turn carrying one text message.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    /// One PCM audio chunk.
    pub fn audio_chunk(pcm: &[u8], sample_rate: u32) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: Some(Blob {
                mime_type: format!("audio/pcm;rate={sample_rate}"),
                data: BASE64_STANDARD.encode(pcm),
            }),
            audio_stream_end: None,
        })
    }

    /// End of the audio input stream.
    pub fn audio_stream_end() -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: None,
            audio_stream_end: Some(true),
        })
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// Server message; exactly one of the fields is normally present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}

impl ServerMessage {
    pub fn parse(payload: &[u8]) -> TesterResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Translate the message into stream events.
    ///
    /// Model parts come first in part order, then the output transcription,
    /// then the turn completion marker.
    pub fn into_events(self) -> TesterResult<Vec<StreamEvent>> {
        if let Some(go_away) = self.go_away {
            return Err(TesterError::Transport(format!(
                "Server sent goAway (time left: {})",
                go_away.time_left.as_deref().unwrap_or("unknown")
            )));
        }

        let Some(content) = self.server_content else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                    events.push(StreamEvent::PartialText(text));
                }
                if let Some(blob) = part.inline_data
                    && blob.mime_type.starts_with("audio/")
                {
                    let audio = BASE64_STANDARD.decode(blob.data.as_bytes())?;
                    if !audio.is_empty() {
                        events.push(StreamEvent::AudioFragment(Bytes::from(audio)));
                    }
                }
            }
        }
        if let Some(text) = content
            .output_transcription
            .and_then(|t| t.text)
            .filter(|t| !t.is_empty())
        {
            events.push(StreamEvent::TranscribedText(text));
        }
        if content.interrupted {
            tracing::debug!("Model turn interrupted by the server");
        }
        if content.turn_complete {
            events.push(StreamEvent::TurnComplete);
        }
        Ok(events)
    }
}
