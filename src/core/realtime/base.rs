//! Base traits and types for bidirectional streaming channels.
//!
//! A channel carries exactly one conversational turn: the stimulus goes out as
//! one text unit or an ordered run of audio frames, and the service answers
//! with an interleaved stream of [`StreamEvent`]s that ends with
//! [`StreamEvent::TurnComplete`].
//!
//! # Audio Format
//!
//! Outbound frames are PCM 16-bit signed little-endian at the configured input
//! rate. Inbound audio fragments are raw PCM at the service's output rate.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::case::TestCase;
use crate::errors::TesterResult;

// =============================================================================
// Events and Units
// =============================================================================

/// One inbound event of a turn.
///
/// Arrival order is the only ordering guarantee; events carry no sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text token
    PartialText(String),
    /// Transcript token accompanying audio output
    TranscribedText(String),
    /// Raw audio chunk
    AudioFragment(Bytes),
    /// Terminal marker for the turn
    TurnComplete,
}

impl StreamEvent {
    /// Short event tag for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            StreamEvent::PartialText(_) => "partial_text",
            StreamEvent::TranscribedText(_) => "transcribed_text",
            StreamEvent::AudioFragment(_) => "audio_fragment",
            StreamEvent::TurnComplete => "turn_complete",
        }
    }
}

/// One outbound unit of an encoded stimulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StimulusUnit {
    Text(String),
    AudioFrame(Bytes),
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Channel Traits
// =============================================================================

/// An open bidirectional channel for a single turn.
#[async_trait]
pub trait StreamChannel: Send {
    /// Send one stimulus unit. Units are transmitted in call order.
    async fn send(&mut self, unit: StimulusUnit) -> TesterResult<()>;

    /// Signal that no more stimulus units follow.
    async fn finish_input(&mut self) -> TesterResult<()> {
        Ok(())
    }

    /// Wait for the next inbound event.
    ///
    /// Returns `Ok(None)` when the stream ended without further events.
    /// Must be cancel-safe: dropping the future loses no already-parsed events.
    async fn next_event(&mut self) -> TesterResult<Option<StreamEvent>>;

    /// Close the channel. Idempotent.
    async fn close(&mut self) -> TesterResult<()>;

    fn is_closed(&self) -> bool;
}

/// Opens channels for test cases.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Open a channel and complete the session handshake.
    ///
    /// # Errors
    /// `Config` when the case lacks required identity or region parameters,
    /// `Transport`/`Timeout` when the connection cannot be established.
    async fn open(&self, case: &TestCase) -> TesterResult<Box<dyn StreamChannel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags() {
        assert_eq!(StreamEvent::PartialText("a".into()).tag(), "partial_text");
        assert_eq!(
            StreamEvent::AudioFragment(Bytes::from_static(&[0, 1])).tag(),
            "audio_fragment"
        );
        assert_eq!(StreamEvent::TurnComplete.tag(), "turn_complete");
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }
}
