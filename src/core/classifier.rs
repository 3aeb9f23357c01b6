//! Outcome classification of aggregated responses.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::aggregator::AggregatedResponse;
use crate::core::session::{SessionResult, TurnState};
use crate::core::stt::Transcriber;
use crate::errors::{ErrorKind, TesterError};

/// Why an attempt failed. Exactly one is attached to every negative outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// No text and no audio produced
    EmptyResponse,
    /// Audio present but its transcription is empty
    NoTranscribableContent,
    /// Content present, no keyword matched
    KeywordsAbsent,
    /// No turn completion before the deadline
    TimedOut,
    ConfigError,
    DecodeError,
    TransportError,
    InternalError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::EmptyResponse => "EMPTY_RESPONSE",
            FailureReason::NoTranscribableContent => "NO_TRANSCRIBABLE_CONTENT",
            FailureReason::KeywordsAbsent => "KEYWORDS_ABSENT",
            FailureReason::TimedOut => "TIMED_OUT",
            FailureReason::ConfigError => "CONFIG_ERROR",
            FailureReason::DecodeError => "DECODE_ERROR",
            FailureReason::TransportError => "TRANSPORT_ERROR",
            FailureReason::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl From<ErrorKind> for FailureReason {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ConfigError => FailureReason::ConfigError,
            ErrorKind::DecodeError => FailureReason::DecodeError,
            ErrorKind::TransportError => FailureReason::TransportError,
            ErrorKind::TimeoutError => FailureReason::TimedOut,
            ErrorKind::InternalError => FailureReason::InternalError,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of one attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    /// Text the verdict was based on
    pub transcript: Option<String>,
}

impl Outcome {
    pub fn passed(transcript: impl Into<String>) -> Self {
        Self {
            success: true,
            failure_reason: None,
            transcript: Some(transcript.into()),
        }
    }

    pub fn failed(reason: FailureReason, transcript: Option<String>) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason),
            transcript,
        }
    }
}

/// Case-insensitive substring match against already lowercased keywords.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| !k.is_empty() && lower.contains(k.as_str()))
}

/// Checks aggregated responses against the success keywords.
#[derive(Clone)]
pub struct OutcomeClassifier {
    keywords: Vec<String>,
    transcriber: Arc<dyn Transcriber>,
    output_sample_rate: u32,
}

impl OutcomeClassifier {
    pub fn new(
        keywords: &[String],
        transcriber: Arc<dyn Transcriber>,
        output_sample_rate: u32,
    ) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            transcriber,
            output_sample_rate,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Classify a completed turn.
    ///
    /// Verification text is the aggregated text, else the transcription of the
    /// audio buffer, else empty. A transcription error still yields
    /// `NO_TRANSCRIBABLE_CONTENT` but is returned alongside the outcome.
    pub async fn classify(&self, response: &AggregatedResponse) -> Verdict {
        let text = response.text.trim();
        let verification = if !text.is_empty() {
            text.to_string()
        } else if !response.audio.is_empty() {
            let transcript = match self
                .transcriber
                .transcribe(&response.audio, self.output_sample_rate)
                .await
            {
                Ok(transcript) => transcript,
                Err(e) => {
                    tracing::warn!(
                        "Transcription of {} audio bytes failed: {}",
                        response.audio.len(),
                        e
                    );
                    return Verdict::with_error(
                        Outcome::failed(FailureReason::NoTranscribableContent, None),
                        e,
                    );
                }
            };
            let transcript = transcript.trim().to_string();
            if transcript.is_empty() {
                return Outcome::failed(FailureReason::NoTranscribableContent, None).into();
            }
            transcript
        } else {
            return Outcome::failed(FailureReason::EmptyResponse, None).into();
        };

        if contains_keyword(&verification, &self.keywords) {
            Outcome::passed(verification).into()
        } else {
            Outcome::failed(FailureReason::KeywordsAbsent, Some(verification)).into()
        }
    }

    /// Classify a session by terminal state.
    ///
    /// Timed out and failed sessions never pass; their partial text is kept
    /// as the transcript and the session error is carried in the verdict.
    pub async fn classify_session(&self, session: &SessionResult) -> Verdict {
        let partial = || {
            let text = session.response.text.trim();
            (!text.is_empty()).then(|| text.to_string())
        };
        match session.state {
            TurnState::Completed => self.classify(&session.response).await,
            TurnState::TimedOut => Verdict {
                outcome: Outcome::failed(FailureReason::TimedOut, partial()),
                error: session.error.clone(),
            },
            _ => {
                let reason = session
                    .error
                    .as_ref()
                    .map(|e| FailureReason::from(e.kind()))
                    .unwrap_or(FailureReason::InternalError);
                Verdict {
                    outcome: Outcome::failed(reason, partial()),
                    error: session.error.clone(),
                }
            }
        }
    }
}

/// Outcome of one attempt plus the error behind it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub error: Option<TesterError>,
}

impl Verdict {
    fn with_error(outcome: Outcome, error: TesterError) -> Self {
        Self {
            outcome,
            error: Some(error),
        }
    }

    pub fn error_trace(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.trace())
    }
}

impl From<Outcome> for Verdict {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            error: None,
        }
    }
}
