pub mod aggregator;
pub mod case;
pub mod classifier;
mod google_auth;
pub mod realtime;
pub mod report;
pub mod retry;
pub mod runner;
pub mod session;
pub mod stimulus;
pub mod stt;
pub mod tts;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use aggregator::{AggregatedResponse, Dispatch, ResponseAggregator};
pub use case::{Modality, ModelSpec, Platform, TestCase};
pub use classifier::{FailureReason, Outcome, OutcomeClassifier, Verdict, contains_keyword};
pub use realtime::{
    ChannelFactory, ConnectionState, GeminiLiveChannel, GeminiLiveConfig, GeminiLiveFactory,
    ResponseModality, StimulusUnit, StreamChannel, StreamEvent,
};
pub use report::{ReportEntry, ReportModel, ReportSummary, Tally};
pub use retry::{AttemptOutput, AttemptResult, RetryController};
pub use runner::{MatrixRunner, MatrixSelection, TestMatrix};
pub use session::{SessionResult, SessionTiming, TurnSession, TurnState};
pub use stimulus::{
    AudioDecoder, AudioSource, RawInput, Stimulus, StimulusEncoder, WavDecoder, encode_wav,
};
pub use stt::{GoogleSpeechToText, Transcriber};
pub use tts::{GoogleTextToSpeech, SpeechSynthesizer};
