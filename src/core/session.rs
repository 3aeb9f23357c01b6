//! Turn session: one attempt over one freshly opened channel.
//!
//! ```text
//! INIT -> SENDING -> STREAMING -> COMPLETED
//!                              -> TIMED_OUT
//!                              -> FAILED
//! ```
//!
//! The channel is closed exactly once on every path that opened it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::TesterConfig;
use crate::core::aggregator::{AggregatedResponse, Dispatch, ResponseAggregator};
use crate::core::case::TestCase;
use crate::core::realtime::{ChannelFactory, StimulusUnit, StreamChannel};
use crate::core::stimulus::Stimulus;
use crate::errors::{TesterError, TesterResult};

/// Turn session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    Init,
    Sending,
    Streaming,
    Completed,
    TimedOut,
    Failed,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::TimedOut | TurnState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Init => "INIT",
            TurnState::Sending => "SENDING",
            TurnState::Streaming => "STREAMING",
            TurnState::Completed => "COMPLETED",
            TurnState::TimedOut => "TIMED_OUT",
            TurnState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    /// Terminal state
    pub state: TurnState,
    /// Whatever was aggregated, partial on timeout or failure
    pub response: AggregatedResponse,
    /// Error for `TIMED_OUT` and `FAILED`
    pub error: Option<TesterError>,
}

/// Timing parameters for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Deadline for the whole streaming phase
    pub turn_timeout: Duration,
    /// Pause after each outbound audio frame
    pub frame_pacing: Duration,
}

impl SessionTiming {
    pub fn from_config(config: &TesterConfig) -> Self {
        Self {
            turn_timeout: config.timing.turn_timeout(),
            frame_pacing: config.audio.frame_pacing(),
        }
    }
}

/// One attempt of one test case.
pub struct TurnSession<'a> {
    case: &'a TestCase,
    timing: SessionTiming,
    state: TurnState,
}

impl<'a> TurnSession<'a> {
    pub fn new(case: &'a TestCase, timing: SessionTiming) -> Self {
        Self {
            case,
            timing,
            state: TurnState::Init,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!("{}: {} -> {}", self.case.identity(), self.state, next);
        self.state = next;
    }

    /// Open a channel, send the stimulus and consume the turn.
    pub async fn run(mut self, factory: &dyn ChannelFactory, stimulus: &Stimulus) -> SessionResult {
        let mut aggregator = ResponseAggregator::new(self.case.modality);

        let mut channel = match factory.open(self.case).await {
            Ok(channel) => channel,
            Err(e) => {
                self.transition(TurnState::Failed);
                return SessionResult {
                    state: self.state,
                    response: aggregator.finish(),
                    error: Some(e),
                };
            }
        };

        let result = self.drive(channel.as_mut(), stimulus, &mut aggregator).await;

        if let Err(e) = channel.close().await {
            tracing::warn!("{}: failed to close channel: {}", self.case.identity(), e);
        }

        let error = match result {
            Ok(()) => {
                self.transition(TurnState::Completed);
                None
            }
            Err(e @ TesterError::Timeout(_)) if self.state == TurnState::Streaming => {
                self.transition(TurnState::TimedOut);
                Some(e)
            }
            Err(e) => {
                self.transition(TurnState::Failed);
                Some(e)
            }
        };

        SessionResult {
            state: self.state,
            response: aggregator.finish(),
            error,
        }
    }

    async fn drive(
        &mut self,
        channel: &mut dyn StreamChannel,
        stimulus: &Stimulus,
        aggregator: &mut ResponseAggregator,
    ) -> TesterResult<()> {
        self.transition(TurnState::Sending);
        self.send_stimulus(channel, stimulus).await?;

        self.transition(TurnState::Streaming);
        let deadline = self.timing.turn_timeout;
        let consumed = tokio::time::timeout(deadline, consume(channel, aggregator)).await;
        match consumed {
            Ok(result) => result,
            Err(_) => {
                let message = format!(
                    "No turn completion within {}s ({} text chars, {} audio bytes received)",
                    deadline.as_secs_f32(),
                    aggregator.text().len(),
                    aggregator.audio_len()
                );
                tracing::warn!("{}: {}", self.case.identity(), message);
                Err(TesterError::Timeout(message))
            }
        }
    }

    async fn send_stimulus(
        &self,
        channel: &mut dyn StreamChannel,
        stimulus: &Stimulus,
    ) -> TesterResult<()> {
        match stimulus {
            Stimulus::Text { content } => {
                channel.send(StimulusUnit::Text(content.clone())).await?;
            }
            Stimulus::Audio { .. } => {
                let mut sent = 0usize;
                for frame in stimulus.frames() {
                    channel.send(StimulusUnit::AudioFrame(frame)).await?;
                    sent += 1;
                    if !self.timing.frame_pacing.is_zero() {
                        tokio::time::sleep(self.timing.frame_pacing).await;
                    }
                }
                channel.finish_input().await?;
                tracing::debug!("{}: sent {} audio frames", self.case.identity(), sent);
            }
        }
        Ok(())
    }
}

/// Pull events until the turn completes.
async fn consume(
    channel: &mut dyn StreamChannel,
    aggregator: &mut ResponseAggregator,
) -> TesterResult<()> {
    loop {
        let Some(event) = channel.next_event().await? else {
            return Err(TesterError::Transport(
                "Stream ended before turn completion".to_string(),
            ));
        };
        tracing::debug!("Received {}", event.tag());
        if aggregator.dispatch(event) == Dispatch::Terminated {
            return Ok(());
        }
    }
}
