//! Configuration module for the live tester
//!
//! This module builds the immutable [`TesterConfig`] from defaults, environment
//! variables (including values loaded from a `.env` file by the binary) and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `validation`: Configuration validation logic
//!
//! Every component receives the configuration explicitly; nothing in the engine
//! reads ambient state, so repeated runs with different parameters never interfere.
//!
//! # Example
//! ```rust,no_run
//! use waav_live_tester::config::TesterConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = TesterConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = TesterConfig::from_file(&PathBuf::from("tester.yaml"))?;
//! println!("Turn timeout: {:?}", config.timing.turn_timeout());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::core::case::{ModelSpec, Platform};

mod env;
mod validation;
pub mod yaml;

pub use yaml::YamlConfig;

/// Default question sent on every turn.
pub const DEFAULT_PROMPT: &str = "What time is it now?";

/// Default system instruction for the agent under test.
pub const DEFAULT_INSTRUCTION: &str = "Answer the question 'What time is it now?' using the Google Search tool. \
     Provide the current time information.";

/// Default success keywords (matched case-insensitively as substrings).
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "time", "clock", "hour", "minute", "am", "pm", "utc", "gmt", "o'clock",
];

/// Google AI Studio Live API WebSocket endpoint.
pub const STUDIO_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Vertex AI Live API WebSocket endpoint; `{location}` is substituted per case.
pub const VERTEX_LIVE_URL: &str = "wss://{location}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService/BidiGenerateContent";

/// Google Cloud Speech-to-Text recognize endpoint.
pub const SPEECH_TO_TEXT_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Google Cloud Text-to-Speech synthesize endpoint.
pub const TEXT_TO_SPEECH_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// A secret string that is wiped from memory when dropped.
pub type Secret = Zeroizing<String>;

/// Audio framing and sample format settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Sample rate the channel expects for input audio (Hz)
    pub input_sample_rate: u32,
    /// Channel count of input audio
    pub channels: u16,
    /// Bytes per sample of input audio
    pub sample_width: u16,
    /// Size in bytes of each outbound audio frame
    pub frame_bytes: usize,
    /// Pause after each outbound frame to emulate real-time capture
    pub frame_pacing_ms: u64,
    /// Sample rate of audio fragments produced by the service (Hz)
    pub output_sample_rate: u32,
    /// Optional WAV file used as voice stimulus instead of synthesized speech
    pub voice_input_path: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16000,
            channels: 1,
            sample_width: 2,
            frame_bytes: 2048,
            frame_pacing_ms: 64,
            output_sample_rate: 24000,
            voice_input_path: None,
        }
    }
}

impl AudioConfig {
    pub fn frame_pacing(&self) -> Duration {
        Duration::from_millis(self.frame_pacing_ms)
    }
}

/// Deadlines, retry budget and pacing between cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// Wall-clock deadline for one turn, measured from stream start
    pub turn_timeout_secs: u64,
    /// Deadline for connecting and completing the session handshake
    pub connect_timeout_secs: u64,
    /// Total attempts per case (first attempt included)
    pub max_retries: u32,
    /// Fixed delay before each retry attempt
    pub retry_delay_ms: u64,
    /// Fixed delay after each case
    pub inter_case_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 2000,
            inter_case_delay_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn inter_case_delay(&self) -> Duration {
        Duration::from_millis(self.inter_case_delay_ms)
    }
}

/// Ordered model catalog per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub studio: Vec<ModelSpec>,
    pub vertex: Vec<ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            studio: vec![
                ModelSpec::live("gemini-2.0-flash-live-001"),
                ModelSpec::native_audio("gemini-2.5-flash-preview-native-audio-dialog"),
                ModelSpec::native_audio("gemini-2.5-flash-exp-native-audio-thinking-dialog"),
                ModelSpec::text_only("gemini-2.0-flash-exp"),
            ],
            vertex: vec![
                ModelSpec::live("gemini-2.0-flash-live-preview-04-09"),
                ModelSpec::text_only("gemini-2.0-flash-exp"),
            ],
        }
    }
}

impl ModelCatalog {
    /// Models declared for a platform, in declaration order.
    pub fn models(&self, platform: Platform) -> &[ModelSpec] {
        match platform {
            Platform::Studio => &self.studio,
            Platform::Vertex => &self.vertex,
        }
    }

    /// Look up a declared model by name.
    pub fn find(&self, platform: Platform, name: &str) -> Option<&ModelSpec> {
        self.models(platform).iter().find(|m| m.name == name)
    }
}

/// Credentials for the streaming and speech services.
///
/// Missing values are not an error here; they surface as a per-case
/// configuration error when a session opens.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Google AI Studio API key (`GOOGLE_API_KEY`)
    pub google_api_key: Option<Secret>,
    /// Vertex AI project id (`GOOGLE_CLOUD_PROJECT`)
    pub vertex_project: Option<String>,
    /// Vertex AI location (`GOOGLE_CLOUD_LOCATION`)
    pub vertex_location: Option<String>,
    /// OAuth access token for Vertex AI and speech services (`GOOGLE_CLOUD_ACCESS_TOKEN`)
    pub vertex_access_token: Option<Secret>,
    /// API key for Speech-to-Text / Text-to-Speech (`GOOGLE_SPEECH_API_KEY`)
    pub speech_api_key: Option<Secret>,
}

fn redact(secret: &Option<Secret>) -> &'static str {
    if secret.as_ref().is_some_and(|s| !s.is_empty()) {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("vertex_project", &self.vertex_project)
            .field("vertex_location", &self.vertex_location)
            .field("vertex_access_token", &redact(&self.vertex_access_token))
            .field("speech_api_key", &redact(&self.speech_api_key))
            .finish()
    }
}

/// Service endpoints, overridable for testing against local mocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub studio_live_url: String,
    pub vertex_live_url: String,
    pub speech_to_text_url: String,
    pub text_to_speech_url: String,
    /// BCP-47 language code used for speech synthesis and recognition
    pub language_code: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            studio_live_url: STUDIO_LIVE_URL.to_string(),
            vertex_live_url: VERTEX_LIVE_URL.to_string(),
            speech_to_text_url: SPEECH_TO_TEXT_URL.to_string(),
            text_to_speech_url: TEXT_TO_SPEECH_URL.to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportConfig {
    /// Where to write the JSON report, if anywhere
    pub output_path: Option<PathBuf>,
}

/// Tester configuration
///
/// Immutable once loaded. Contains:
/// - The stimulus prompt, agent instruction and success keywords
/// - Audio framing parameters
/// - Deadlines and retry policy
/// - The per-platform model catalog
/// - Credentials and endpoints
/// - Report output settings
#[derive(Debug, Clone)]
pub struct TesterConfig {
    pub prompt: String,
    pub instruction: String,
    pub keywords: Vec<String>,
    /// Attach the Google Search tool to the agent session
    pub google_search: bool,
    pub audio: AudioConfig,
    pub timing: TimingConfig,
    pub models: ModelCatalog,
    pub credentials: Credentials,
    pub endpoints: EndpointConfig,
    pub report: ReportConfig,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            google_search: true,
            audio: AudioConfig::default(),
            timing: TimingConfig::default(),
            models: ModelCatalog::default(),
            credentials: Credentials::default(),
            endpoints: EndpointConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl TesterConfig {
    /// Load configuration from environment variables on top of defaults.
    ///
    /// # Errors
    /// Returns an error if an environment variable has an invalid format or
    /// the resulting configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();
        env::apply_env(&mut config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // Note: .env file is loaded in main.rs at application startup
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = Self::default();
        env::apply_env(&mut config)?;
        yaml_config.apply(&mut config);

        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate(self)?;
        Ok(())
    }

    /// Lowercased keyword list used for matching.
    pub fn normalized_keywords(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}
