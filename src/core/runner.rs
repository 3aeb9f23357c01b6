//! Test matrix construction and sequential execution.
//!
//! Cases run one at a time through the retry controller. A panic inside one
//! case is caught and recorded as that case's failure; the matrix always runs
//! to the end and every case yields exactly one report entry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::{ModelCatalog, TesterConfig};
use crate::core::case::{Modality, Platform, TestCase};
use crate::core::classifier::{FailureReason, Outcome, OutcomeClassifier};
use crate::core::realtime::ChannelFactory;
use crate::core::report::ReportModel;
use crate::core::retry::{AttemptResult, RetryController};
use crate::core::session::SessionTiming;
use crate::core::stimulus::{AudioDecoder, AudioSource, RawInput, StimulusEncoder};
use crate::core::stt::Transcriber;
use crate::core::tts::SpeechSynthesizer;
use crate::errors::{TesterError, TesterResult};

/// Which part of the catalog to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSelection {
    pub platforms: Vec<Platform>,
    /// Restrict to one declared model; requires a single platform
    pub model: Option<String>,
    pub modalities: Vec<Modality>,
    /// Region override carried by every case
    pub region: Option<String>,
}

impl Default for MatrixSelection {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.to_vec(),
            model: None,
            modalities: vec![Modality::Text, Modality::Voice],
            region: None,
        }
    }
}

/// Ordered list of cases to execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestMatrix {
    cases: Vec<TestCase>,
}

impl TestMatrix {
    /// Enumerate the cases selected from the catalog.
    ///
    /// Order is platform, then declared model order, then text before voice.
    /// Voice cases are only generated for models that support audio.
    pub fn build(catalog: &ModelCatalog, selection: &MatrixSelection) -> TesterResult<Self> {
        let mut platforms = selection.platforms.clone();
        platforms.sort();
        platforms.dedup();
        let mut modalities = selection.modalities.clone();
        modalities.sort();
        modalities.dedup();

        if let Some(model) = &selection.model {
            let [platform] = platforms.as_slice() else {
                return Err(TesterError::Config(
                    "--model requires a single --platform".to_string(),
                ));
            };
            if catalog.find(*platform, model).is_none() {
                let available: Vec<&str> = catalog
                    .models(*platform)
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect();
                return Err(TesterError::Config(format!(
                    "Model {model} is not declared for {platform}. Available: {}",
                    available.join(", ")
                )));
            }
        }

        let mut cases = Vec::new();
        for platform in platforms {
            for spec in catalog.models(platform) {
                if selection.model.as_ref().is_some_and(|m| *m != spec.name) {
                    continue;
                }
                for &modality in &modalities {
                    if !spec.supports(modality) {
                        continue;
                    }
                    let case = TestCase::new(platform, spec, modality)
                        .with_region(selection.region.clone());
                    case.validate()?;
                    cases.push(case);
                }
            }
        }

        Ok(Self { cases })
    }

    pub fn from_cases(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Runs a matrix case by case and collects the report.
pub struct MatrixRunner {
    config: Arc<TesterConfig>,
    factory: Arc<dyn ChannelFactory>,
    classifier: OutcomeClassifier,
    encoder: StimulusEncoder,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    /// Voice input resolved on first use, shared by every voice case
    voice_input: Option<TesterResult<RawInput>>,
}

impl MatrixRunner {
    pub fn new(
        config: Arc<TesterConfig>,
        factory: Arc<dyn ChannelFactory>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let classifier = OutcomeClassifier::new(
            &config.keywords,
            transcriber,
            config.audio.output_sample_rate,
        );
        let encoder = StimulusEncoder::with_wav_decoder(config.audio.clone());
        Self {
            config,
            factory,
            classifier,
            encoder,
            synthesizer: None,
            voice_input: None,
        }
    }

    /// Synthesize the voice stimulus from the prompt when no WAV file is configured.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.encoder = StimulusEncoder::new(self.config.audio.clone(), decoder);
        self
    }

    /// Execute every case in order and return the finished report.
    pub async fn run(&mut self, matrix: &TestMatrix) -> ReportModel {
        let mut report = ReportModel::new();
        let inter_case_delay = self.config.timing.inter_case_delay();
        info!(
            "Running {} cases (run {}, {} attempts max)",
            matrix.len(),
            report.run_id,
            self.config.timing.max_retries
        );

        for (index, case) in matrix.cases().iter().enumerate() {
            info!("[{}/{}] {}", index + 1, matrix.len(), case);

            let result = match AssertUnwindSafe(self.run_case(case)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("{}: case panicked: {}", case, message);
                    AttemptResult::not_attempted(
                        Outcome::failed(FailureReason::InternalError, None),
                        TesterError::Internal(format!("case panicked: {message}")).trace(),
                    )
                }
            };

            if result.outcome.success {
                info!(
                    "{}: PASS after {} attempt(s) in {}ms",
                    case,
                    result.attempts(),
                    result.duration_ms
                );
            } else {
                info!(
                    "{}: FAIL ({}) after {} attempt(s)",
                    case,
                    result
                        .outcome
                        .failure_reason
                        .map(|r| r.as_str())
                        .unwrap_or("unknown"),
                    result.attempts()
                );
            }

            if let Err(e) = report.record(case.clone(), result) {
                warn!("{}: result not recorded: {}", case, e);
            }

            if !inter_case_delay.is_zero() {
                tokio::time::sleep(inter_case_delay).await;
            }
        }

        report.finish();
        report
    }

    async fn run_case(&mut self, case: &TestCase) -> AttemptResult {
        let raw = match case.modality {
            Modality::Text => Ok(RawInput::Text(self.config.prompt.clone())),
            Modality::Voice => self.voice_input().await,
        };
        let stimulus = match raw.and_then(|raw| self.encoder.encode(case, &raw)) {
            Ok(stimulus) => stimulus,
            Err(e) => {
                error!("{}: stimulus unavailable: {}", case, e);
                return AttemptResult::not_attempted(
                    Outcome::failed(FailureReason::from(e.kind()), None),
                    e.trace(),
                );
            }
        };

        let controller = RetryController::new(
            self.config.timing.max_retries,
            self.config.timing.retry_delay(),
        );
        controller
            .run_with_retry(
                self.factory.as_ref(),
                case,
                &stimulus,
                SessionTiming::from_config(&self.config),
                &self.classifier,
            )
            .await
    }

    /// Voice input for the run, resolved on first use.
    ///
    /// Transport failures are not cached so the next voice case tries again.
    async fn voice_input(&mut self) -> TesterResult<RawInput> {
        if let Some(cached) = &self.voice_input {
            return cached.clone();
        }
        let resolved = self.resolve_voice_input().await;
        match &resolved {
            Err(e @ TesterError::Transport(_)) => {
                warn!("Voice input unavailable, will retry on the next voice case: {}", e);
            }
            _ => self.voice_input = Some(resolved.clone()),
        }
        resolved
    }

    async fn resolve_voice_input(&self) -> TesterResult<RawInput> {
        if let Some(path) = &self.config.audio.voice_input_path {
            info!("Using voice input from {}", path.display());
            return Ok(RawInput::Audio(AudioSource::WavFile(path.clone())));
        }
        let Some(synthesizer) = &self.synthesizer else {
            return Err(TesterError::Config(
                "No voice input: set LIVE_TESTER_VOICE_INPUT or enable speech synthesis"
                    .to_string(),
            ));
        };
        let wav = synthesizer
            .synthesize(&self.config.prompt, self.config.audio.input_sample_rate)
            .await?;
        Ok(RawInput::Audio(AudioSource::WavBytes(wav)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
