//! Response aggregation for one turn.

use bytes::{Bytes, BytesMut};

use crate::core::case::Modality;
use crate::core::realtime::StreamEvent;

/// Accumulated response of one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedResponse {
    pub text: String,
    pub audio: Bytes,
    /// Whether the turn completion marker was received
    pub terminated: bool,
}

impl AggregatedResponse {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.audio.is_empty()
    }
}

/// What the aggregator did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Appended,
    /// Audio fragment for a turn that did not request audio
    Dropped,
    Terminated,
    /// Event arrived after the turn completed
    Ignored,
}

/// Classifies inbound events into per-modality buffers.
///
/// Buffers only grow. After `TurnComplete` every event is ignored.
#[derive(Debug)]
pub struct ResponseAggregator {
    modality: Modality,
    text: String,
    audio: BytesMut,
    terminated: bool,
}

impl ResponseAggregator {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            text: String::new(),
            audio: BytesMut::new(),
            terminated: false,
        }
    }

    pub fn dispatch(&mut self, event: StreamEvent) -> Dispatch {
        if self.terminated {
            tracing::trace!("Ignoring {} after turn completion", event.tag());
            return Dispatch::Ignored;
        }
        match event {
            StreamEvent::PartialText(text) | StreamEvent::TranscribedText(text) => {
                self.text.push_str(&text);
                Dispatch::Appended
            }
            StreamEvent::AudioFragment(chunk) => match self.modality {
                Modality::Voice => {
                    self.audio.extend_from_slice(&chunk);
                    Dispatch::Appended
                }
                Modality::Text => {
                    tracing::trace!(
                        "Dropping {} byte audio fragment on text turn",
                        chunk.len()
                    );
                    Dispatch::Dropped
                }
            },
            StreamEvent::TurnComplete => {
                self.terminated = true;
                Dispatch::Terminated
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio_len(&self) -> usize {
        self.audio.len()
    }

    pub fn finish(self) -> AggregatedResponse {
        AggregatedResponse {
            text: self.text,
            audio: self.audio.freeze(),
            terminated: self.terminated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_transcript_share_buffer() {
        let mut agg = ResponseAggregator::new(Modality::Voice);
        agg.dispatch(StreamEvent::PartialText("The time ".into()));
        agg.dispatch(StreamEvent::TranscribedText("is noon".into()));
        agg.dispatch(StreamEvent::AudioFragment(Bytes::from_static(&[1, 2])));
        agg.dispatch(StreamEvent::AudioFragment(Bytes::from_static(&[3])));
        assert_eq!(agg.dispatch(StreamEvent::TurnComplete), Dispatch::Terminated);

        let response = agg.finish();
        assert_eq!(response.text, "The time is noon");
        assert_eq!(&response.audio[..], &[1, 2, 3]);
        assert!(response.terminated);
    }

    #[test]
    fn test_events_after_completion_are_ignored() {
        let mut agg = ResponseAggregator::new(Modality::Text);
        agg.dispatch(StreamEvent::PartialText("done".into()));
        agg.dispatch(StreamEvent::TurnComplete);
        assert_eq!(
            agg.dispatch(StreamEvent::PartialText(" extra".into())),
            Dispatch::Ignored
        );
        assert_eq!(agg.dispatch(StreamEvent::TurnComplete), Dispatch::Ignored);
        assert_eq!(agg.finish().text, "done");
    }

    #[test]
    fn test_audio_dropped_on_text_turn() {
        let mut agg = ResponseAggregator::new(Modality::Text);
        assert_eq!(
            agg.dispatch(StreamEvent::AudioFragment(Bytes::from_static(&[0; 8]))),
            Dispatch::Dropped
        );
        assert_eq!(agg.audio_len(), 0);
        assert!(!agg.is_terminated());
    }

    #[test]
    fn test_empty_until_events() {
        let agg = ResponseAggregator::new(Modality::Voice);
        let response = agg.finish();
        assert!(response.is_empty());
        assert!(!response.terminated);
    }
}
