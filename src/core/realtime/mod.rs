//! Bidirectional streaming channel module.
//!
//! This module provides the channel abstraction used by turn sessions and the
//! Gemini Live implementation of it.
//!
//! # Supported Platforms
//!
//! - **Google AI Studio** - Live API authenticated with an API key
//! - **Vertex AI** - Live API authenticated with a bearer token, per-location endpoint
//!
//! # Architecture
//!
//! - `StreamChannel` trait for one open turn (send units, pull events, close)
//! - `ChannelFactory` trait for opening a channel per test case
//! - Pull-based event consumption so a deadline can cancel it
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_live_tester::core::realtime::{ChannelFactory, GeminiLiveFactory, StimulusUnit};
//! use std::sync::Arc;
//!
//! let factory = GeminiLiveFactory::new(Arc::new(config));
//! let mut channel = factory.open(&case).await?;
//! channel.send(StimulusUnit::Text("What time is it now?".into())).await?;
//! while let Some(event) = channel.next_event().await? {
//!     println!("{event:?}");
//! }
//! channel.close().await?;
//! ```

mod base;
pub mod gemini;

pub use base::{ChannelFactory, ConnectionState, StimulusUnit, StreamChannel, StreamEvent};
pub use gemini::{GeminiLiveChannel, GeminiLiveConfig, GeminiLiveFactory, ResponseModality};
