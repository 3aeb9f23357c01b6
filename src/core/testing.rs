//! Scripted channel doubles for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::case::TestCase;
use crate::core::realtime::{ChannelFactory, StimulusUnit, StreamChannel, StreamEvent};
use crate::errors::{TesterError, TesterResult};

/// One scripted step of an inbound stream.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Event(StreamEvent),
    Delay(Duration),
    Fail(TesterError),
    /// Stream ends without more events
    End,
}

/// Shared counters observed by tests.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelProbe {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    input_finished: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<StimulusUnit>>>,
}

impl ChannelProbe {
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn input_finished(&self) -> usize {
        self.input_finished.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<StimulusUnit> {
        self.sent.lock().unwrap().clone()
    }
}

pub(crate) struct ScriptedChannel {
    steps: VecDeque<Step>,
    probe: ChannelProbe,
    fail_sends: bool,
    closed: bool,
}

#[async_trait]
impl StreamChannel for ScriptedChannel {
    async fn send(&mut self, unit: StimulusUnit) -> TesterResult<()> {
        if self.fail_sends {
            return Err(TesterError::Transport("send rejected".to_string()));
        }
        self.probe.sent.lock().unwrap().push(unit);
        Ok(())
    }

    async fn finish_input(&mut self) -> TesterResult<()> {
        self.probe.input_finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_event(&mut self) -> TesterResult<Option<StreamEvent>> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Event(event)) => return Ok(Some(event)),
                Some(Step::Delay(delay)) => tokio::time::sleep(delay).await,
                Some(Step::Fail(e)) => return Err(e),
                Some(Step::End) => return Ok(None),
                // Script exhausted: the service goes silent
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) -> TesterResult<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Hands out one scripted channel (or open error) per `open` call.
pub(crate) struct ScriptedFactory {
    scripts: Mutex<VecDeque<TesterResult<Vec<Step>>>>,
    probe: ChannelProbe,
    fail_sends: bool,
}

impl ScriptedFactory {
    pub(crate) fn new(scripts: Vec<TesterResult<Vec<Step>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            probe: ChannelProbe::default(),
            fail_sends: false,
        }
    }

    pub(crate) fn single(steps: Vec<Step>) -> Self {
        Self::new(vec![Ok(steps)])
    }

    pub(crate) fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub(crate) fn probe(&self) -> &ChannelProbe {
        &self.probe
    }
}

#[async_trait]
impl ChannelFactory for ScriptedFactory {
    async fn open(&self, _case: &TestCase) -> TesterResult<Box<dyn StreamChannel>> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TesterError::Transport("no script left".to_string())))?;
        Ok(Box::new(ScriptedChannel {
            steps: script.into(),
            probe: self.probe.clone(),
            fail_sends: self.fail_sends,
            closed: false,
        }))
    }
}
