//! Gemini Live API client implementation.
//!
//! This module provides the channel that implements `StreamChannel` over the
//! Gemini Live WebSocket protocol, and the factory that opens one per case.
//!
//! # API Reference
//!
//! - AI Studio: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<key>`
//! - Vertex AI: `wss://<location>-aiplatform.googleapis.com/ws/...BidiGenerateContent`
//!   with `Authorization: Bearer <token>`
//! - Protocol: WebSocket with JSON messages (text or binary frames)
//! - Audio in: PCM 16-bit mono little-endian, base64 encoded
//! - Audio out: PCM 16-bit mono little-endian at 24kHz, base64 encoded

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::{HeaderValue, header::AUTHORIZATION};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::config::GeminiLiveConfig;
use super::messages::{ClientMessage, ServerMessage};
use crate::config::TesterConfig;
use crate::core::case::TestCase;
use crate::core::realtime::{
    ChannelFactory, ConnectionState, StimulusUnit, StreamChannel, StreamEvent,
};
use crate::errors::{TesterError, TesterResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Gemini Live Channel
// =============================================================================

/// One Gemini Live session carrying a single turn.
///
/// The socket is read only from `next_event`, which makes the read loop
/// cancellable by dropping the future: parsed events wait in `pending` and a
/// partially received frame stays buffered inside the stream.
pub struct GeminiLiveChannel {
    ws: Option<WsStream>,
    pending: VecDeque<StreamEvent>,
    state: ConnectionState,
    input_sample_rate: u32,
    label: String,
}

impl GeminiLiveChannel {
    /// Connect, send the setup message and wait for `setupComplete`.
    ///
    /// The whole handshake is bounded by `config.connect_timeout`.
    pub async fn connect(config: &GeminiLiveConfig, label: impl Into<String>) -> TesterResult<Self> {
        let label = label.into();
        let timeout = config.connect_timeout;
        tokio::time::timeout(timeout, Self::handshake(config, label))
            .await
            .map_err(|_| {
                TesterError::Timeout(format!(
                    "Live session setup not completed within {}s",
                    timeout.as_secs_f32()
                ))
            })?
    }

    async fn handshake(config: &GeminiLiveConfig, label: String) -> TesterResult<Self> {
        let url = config.ws_url()?;
        let mut request = url.as_str().into_client_request()?;
        if let Some(token) = &config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|e| TesterError::Config(format!("Invalid access token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TesterError::Transport(format!("Connection failed: {e}")))?;

        tracing::info!("Connected to Gemini Live API for {}", label);

        let mut channel = Self {
            ws: Some(ws),
            pending: VecDeque::new(),
            state: ConnectionState::Connecting,
            input_sample_rate: config.input_sample_rate,
            label,
        };

        if let Err(e) = channel.perform_setup(config).await {
            if let Err(close_err) = channel.close().await {
                tracing::warn!("Failed to close channel after setup error: {}", close_err);
            }
            return Err(e);
        }
        Ok(channel)
    }

    async fn perform_setup(&mut self, config: &GeminiLiveConfig) -> TesterResult<()> {
        self.send_message(&ClientMessage::setup(config)).await?;

        loop {
            let Some(payload) = self.read_payload().await? else {
                return Err(TesterError::Transport(
                    "Connection closed before setup completed".to_string(),
                ));
            };
            let message = ServerMessage::parse(&payload)?;
            if message.is_setup_complete() {
                self.state = ConnectionState::Connected;
                tracing::debug!("Gemini Live setup complete for {}", self.label);
                return Ok(());
            }
            // Anything before setupComplete other than goAway is ignored
            message.into_events()?;
        }
    }

    fn ws_mut(&mut self) -> TesterResult<&mut WsStream> {
        match (self.state, self.ws.as_mut()) {
            (ConnectionState::Closed, _) | (_, None) => Err(TesterError::Transport(
                "Channel is closed".to_string(),
            )),
            (_, Some(ws)) => Ok(ws),
        }
    }

    async fn send_message(&mut self, message: &ClientMessage) -> TesterResult<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| TesterError::Internal(format!("Failed to serialize message: {e}")))?;
        self.ws_mut()?.send(Message::text(json)).await?;
        Ok(())
    }

    /// Next JSON payload from a text or binary frame; `None` when the stream ended.
    async fn read_payload(&mut self) -> TesterResult<Option<Vec<u8>>> {
        loop {
            let ws = self.ws_mut()?;
            let Some(frame) = ws.next().await else {
                return Ok(None);
            };
            match frame? {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(data) => return Ok(Some(data.to_vec())),
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| format!("{} {}", f.code, f.reason))
                        .unwrap_or_else(|| "no reason".to_string());
                    return Err(TesterError::Transport(format!(
                        "Server closed the connection: {reason}"
                    )));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}

#[async_trait]
impl StreamChannel for GeminiLiveChannel {
    async fn send(&mut self, unit: StimulusUnit) -> TesterResult<()> {
        let message = match &unit {
            StimulusUnit::Text(text) => ClientMessage::user_text(text),
            StimulusUnit::AudioFrame(frame) => {
                ClientMessage::audio_chunk(frame, self.input_sample_rate)
            }
        };
        self.send_message(&message).await
    }

    async fn finish_input(&mut self) -> TesterResult<()> {
        self.send_message(&ClientMessage::audio_stream_end()).await
    }

    async fn next_event(&mut self) -> TesterResult<Option<StreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let Some(payload) = self.read_payload().await? else {
                return Ok(None);
            };
            let events = ServerMessage::parse(&payload)?.into_events()?;
            self.pending.extend(events);
        }
    }

    async fn close(&mut self) -> TesterResult<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        self.pending.clear();

        let Some(mut ws) = self.ws.take() else {
            return Ok(());
        };
        match ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {
                tracing::info!("Disconnected from Gemini Live API for {}", self.label);
                Ok(())
            }
            Err(e) => Err(TesterError::Transport(format!("Close failed: {e}"))),
        }
    }

    fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Opens Gemini Live channels using the tester configuration.
#[derive(Debug, Clone)]
pub struct GeminiLiveFactory {
    config: Arc<TesterConfig>,
}

impl GeminiLiveFactory {
    pub fn new(config: Arc<TesterConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChannelFactory for GeminiLiveFactory {
    async fn open(&self, case: &TestCase) -> TesterResult<Box<dyn StreamChannel>> {
        let live = GeminiLiveConfig::for_case(&self.config, case)?;
        tracing::debug!(
            "Opening Gemini Live session for {} ({})",
            case.identity(),
            live.model_path
        );
        let channel = GeminiLiveChannel::connect(&live, case.identity()).await?;
        Ok(Box::new(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::case::{Modality, ModelSpec, Platform};

    #[tokio::test]
    async fn test_factory_requires_credentials() {
        let factory = GeminiLiveFactory::new(Arc::new(TesterConfig::default()));
        let case = TestCase::new(Platform::Studio, &ModelSpec::live("m"), Modality::Text);
        let err = factory.open(&case).await.err().unwrap();
        assert!(matches!(err, TesterError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        let mut config = TesterConfig::default();
        config.credentials.google_api_key = Some(crate::config::Secret::new("k".to_string()));
        // Port 9 (discard) is not listening on loopback in test environments
        config.endpoints.studio_live_url = "ws://127.0.0.1:9/live".to_string();
        let factory = GeminiLiveFactory::new(Arc::new(config));
        let case = TestCase::new(Platform::Studio, &ModelSpec::live("m"), Modality::Text);

        let err = factory.open(&case).await.err().unwrap();
        assert!(matches!(
            err,
            TesterError::Transport(_) | TesterError::Timeout(_)
        ));
    }
}
