//! Mock Provider Servers
//!
//! In-process stand-ins for the services the tester talks to:
//! - WebSocket (Gemini Live API, scripted per connection)
//!
//! The speech REST services are mocked with `wiremock` directly in the tests.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::time::Duration;

pub mod live_mock;

pub use live_mock::{LiveScript, MockLiveServer, RecordedSession};

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
