//! Bounded retry loop around one session-and-classify cycle.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::core::case::TestCase;
use crate::core::classifier::{Outcome, OutcomeClassifier};
use crate::core::realtime::ChannelFactory;
use crate::core::session::{SessionTiming, TurnSession, TurnState};
use crate::core::stimulus::Stimulus;

/// Result of a single attempt, produced by the attempt closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutput {
    pub outcome: Outcome,
    pub error_trace: Option<String>,
    pub state: TurnState,
}

/// Final result of a case: the first success or the last failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub outcome: Outcome,
    /// Attempts beyond the first (0 = first try decided the case)
    pub retry_count: u32,
    pub error_trace: Option<String>,
    /// Wall-clock time of the whole retry loop
    pub duration_ms: u64,
    /// Terminal session state of the last attempt; `None` if no session ran
    pub final_state: Option<TurnState>,
}

impl AttemptResult {
    /// A failure that happened before any session could be attempted.
    pub fn not_attempted(outcome: Outcome, error_trace: String) -> Self {
        Self {
            outcome,
            retry_count: 0,
            error_trace: Some(error_trace),
            duration_ms: 0,
            final_state: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.retry_count + 1
    }
}

/// Runs attempts until one succeeds or the budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryController {
    /// Total attempts, first one included
    max_retries: u32,
    delay: Duration,
}

impl RetryController {
    /// A budget of zero is treated as one attempt.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run a case until it passes or the budget is spent.
    ///
    /// Every attempt opens a fresh [`TurnSession`] through `factory`, resends
    /// the full stimulus and classifies the result. Only the last attempt's
    /// outcome and trace are kept.
    pub async fn run_with_retry(
        &self,
        factory: &dyn ChannelFactory,
        case: &TestCase,
        stimulus: &Stimulus,
        timing: SessionTiming,
        classifier: &OutcomeClassifier,
    ) -> AttemptResult {
        self.run(move |index| async move {
            if index > 0 {
                tracing::info!("{}: attempt {}", case, index + 1);
            }
            let session = TurnSession::new(case, timing).run(factory, stimulus).await;
            let verdict = classifier.classify_session(&session).await;
            AttemptOutput {
                error_trace: verdict.error_trace(),
                outcome: verdict.outcome,
                state: session.state,
            }
        })
        .await
    }

    /// Run `attempt(index)` for index `0..max_retries`, sleeping the fixed
    /// delay before every attempt after the first.
    async fn run<F, Fut>(&self, mut attempt: F) -> AttemptResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutput>,
    {
        let started = Instant::now();
        let mut index = 0u32;
        let mut output = attempt(index).await;

        while !output.outcome.success && index + 1 < self.max_retries {
            tracing::warn!(
                "Attempt {}/{} failed ({}), retrying in {}ms",
                index + 1,
                self.max_retries,
                output
                    .outcome
                    .failure_reason
                    .map(|r| r.as_str())
                    .unwrap_or("unknown"),
                self.delay.as_millis()
            );
            tokio::time::sleep(self.delay).await;
            index += 1;
            output = attempt(index).await;
        }

        if !output.outcome.success {
            tracing::error!(
                "All {} attempts failed; last error: {}",
                index + 1,
                output.error_trace.as_deref().unwrap_or("none")
            );
        }

        AttemptResult {
            outcome: output.outcome,
            retry_count: index,
            error_trace: output.error_trace,
            duration_ms: started.elapsed().as_millis() as u64,
            final_state: Some(output.state),
        }
    }
}
