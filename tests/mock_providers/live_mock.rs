//! WebSocket Mock Server for the Gemini Live API
//!
//! Each accepted connection takes the next [`LiveScript`]. The server answers
//! `setup` with `setupComplete`, records everything the client sends, and plays
//! the script once the client finishes its input (a complete `clientContent`
//! turn or `audioStreamEnd`).

use base64::prelude::*;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async, tungstenite::Message};

type ServerSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// What the mock does on one connection.
#[derive(Debug, Clone)]
pub enum LiveScript {
    /// Send these server messages as text frames after the input ends
    Respond(Vec<Value>),
    /// Same, as binary frames
    RespondBinary(Vec<Value>),
    /// Send these messages, then go silent without completing the turn
    Stall(Vec<Value>),
    /// Send `goAway` after the input ends
    GoAway,
    /// Close the socket instead of completing setup
    RefuseSetup,
}

/// What one connection received.
#[derive(Debug, Clone, Default)]
pub struct RecordedSession {
    pub uri: String,
    pub authorization: Option<String>,
    pub setup: Option<Value>,
    pub client_content: Vec<Value>,
    pub audio_chunks: Vec<Vec<u8>>,
    pub audio_mime: Option<String>,
    pub audio_stream_end: bool,
    pub client_closed: bool,
}

struct MockLiveState {
    scripts: Mutex<VecDeque<LiveScript>>,
    sessions: Mutex<Vec<Arc<Mutex<RecordedSession>>>>,
}

/// Mock Gemini Live server bound to a loopback port.
pub struct MockLiveServer {
    pub addr: SocketAddr,
    state: Arc<MockLiveState>,
}

impl MockLiveServer {
    pub async fn start(scripts: Vec<LiveScript>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockLiveState {
            scripts: Mutex::new(scripts.into()),
            sessions: Mutex::new(Vec::new()),
        });

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        eprintln!("Mock Live connection error: {}", e);
                    }
                });
            }
        });

        Self { addr, state }
    }

    /// Endpoint URL to configure as the studio Live URL.
    pub fn url(&self) -> String {
        format!("ws://{}/ws/live", self.addr)
    }

    /// Endpoint template with a location placeholder for Vertex AI.
    pub fn vertex_url(&self) -> String {
        format!("ws://{}/{{location}}/live", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.state.sessions.lock().unwrap().len()
    }

    pub fn sessions(&self) -> Vec<RecordedSession> {
        self.state
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.lock().unwrap().clone())
            .collect()
    }
}

// Server message builders

pub fn text_part(text: &str) -> Value {
    json!({"serverContent": {"modelTurn": {"parts": [{"text": text}]}}})
}

pub fn audio_part(pcm: &[u8]) -> Value {
    json!({"serverContent": {"modelTurn": {"parts": [{
        "inlineData": {"mimeType": "audio/pcm;rate=24000", "data": BASE64_STANDARD.encode(pcm)}
    }]}}})
}

pub fn transcription(text: &str) -> Value {
    json!({"serverContent": {"outputTranscription": {"text": text}}})
}

pub fn turn_complete() -> Value {
    json!({"serverContent": {"turnComplete": true}})
}

/// A full text answer in two chunks followed by completion.
pub fn text_answer(first: &str, second: &str) -> LiveScript {
    LiveScript::Respond(vec![text_part(first), text_part(second), turn_complete()])
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockLiveState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let record = Arc::new(Mutex::new(RecordedSession::default()));
    let header_record = record.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let mut session = header_record.lock().unwrap();
        session.uri = req.uri().to_string();
        session.authorization = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(resp)
    };
    let ws_stream = accept_hdr_async(stream, callback).await?;
    state.sessions.lock().unwrap().push(record.clone());

    let script = state
        .scripts
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(LiveScript::Stall(Vec::new()));
    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_string(),
            Ok(Message::Binary(data)) => String::from_utf8(data.to_vec())?,
            Ok(Message::Close(_)) => {
                record.lock().unwrap().client_closed = true;
                break;
            }
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await?;
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                eprintln!("WebSocket error: {}", e);
                break;
            }
        };
        let message: Value = serde_json::from_str(&text)?;

        if let Some(setup) = message.get("setup") {
            record.lock().unwrap().setup = Some(setup.clone());
            if matches!(script, LiveScript::RefuseSetup) {
                write.send(Message::Close(None)).await?;
                break;
            }
            write
                .send(Message::text(json!({"setupComplete": {}}).to_string()))
                .await?;
            continue;
        }

        let input_done = if let Some(content) = message.get("clientContent") {
            record.lock().unwrap().client_content.push(content.clone());
            content["turnComplete"].as_bool().unwrap_or(false)
        } else if let Some(input) = message.get("realtimeInput") {
            let mut session = record.lock().unwrap();
            if let Some(audio) = input.get("audio") {
                session.audio_mime = audio["mimeType"].as_str().map(str::to_string);
                let data = audio["data"].as_str().unwrap_or_default();
                session.audio_chunks.push(BASE64_STANDARD.decode(data)?);
            }
            let ended = input["audioStreamEnd"].as_bool().unwrap_or(false);
            session.audio_stream_end |= ended;
            ended
        } else {
            false
        };

        if input_done {
            play(&script, &mut write).await?;
        }
    }

    Ok(())
}

async fn play(
    script: &LiveScript,
    write: &mut ServerSink,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Give the client a moment to start reading, like a real model would
    tokio::time::sleep(Duration::from_millis(5)).await;
    match script {
        LiveScript::Respond(messages) | LiveScript::Stall(messages) => {
            for message in messages {
                write.send(Message::text(message.to_string())).await?;
            }
        }
        LiveScript::RespondBinary(messages) => {
            for message in messages {
                write
                    .send(Message::binary(message.to_string().into_bytes()))
                    .await?;
            }
        }
        LiveScript::GoAway => {
            write
                .send(Message::text(json!({"goAway": {"timeLeft": "0s"}}).to_string()))
                .await?;
        }
        LiveScript::RefuseSetup => {}
    }
    Ok(())
}
