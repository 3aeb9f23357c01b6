//! Gemini Live API channel.
//!
//! Speaks the Live `BidiGenerateContent` WebSocket protocol on both Google AI
//! Studio and Vertex AI. A channel carries one turn: a `setup` handshake, the
//! stimulus as `clientContent` text or `realtimeInput` audio chunks, then the
//! server's `serverContent` stream until `turnComplete`.

mod client;
mod config;
pub mod messages;

pub use client::{GeminiLiveChannel, GeminiLiveFactory};
pub use config::{GeminiLiveConfig, LOCATION_PLACEHOLDER, ResponseModality};
