use serde::Deserialize;
use std::path::PathBuf;

use super::{Secret, TesterConfig};
use crate::core::case::ModelSpec;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// prompt: "What time is it now?"
/// keywords: ["time", "clock", "utc"]
/// google_search: true
///
/// audio:
///   input_sample_rate: 16000
///   frame_bytes: 2048
///   frame_pacing_ms: 64
///   voice_input_path: "fixtures/question.wav"
///
/// timing:
///   turn_timeout_secs: 30
///   max_retries: 3
///   retry_delay_ms: 2000
///   inter_case_delay_ms: 1000
///
/// models:
///   studio:
///     - name: "gemini-2.0-flash-live-001"
///     - name: "gemini-2.5-flash-preview-native-audio-dialog"
///       native_audio: true
///   vertex:
///     - name: "gemini-2.0-flash-exp"
///       supports_audio: false
///
/// credentials:
///   google_api_key: "your-api-key"
///   vertex_project: "my-project"
///   vertex_location: "us-central1"
///
/// endpoints:
///   language_code: "en-US"
///
/// report:
///   output_path: "live_test_report.json"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub prompt: Option<String>,
    pub instruction: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub google_search: Option<bool>,
    pub audio: Option<AudioYaml>,
    pub timing: Option<TimingYaml>,
    pub models: Option<ModelsYaml>,
    pub credentials: Option<CredentialsYaml>,
    pub endpoints: Option<EndpointsYaml>,
    pub report: Option<ReportYaml>,
}

/// Audio configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub input_sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub sample_width: Option<u16>,
    pub frame_bytes: Option<usize>,
    pub frame_pacing_ms: Option<u64>,
    pub output_sample_rate: Option<u32>,
    pub voice_input_path: Option<String>,
}

/// Timing configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimingYaml {
    pub turn_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub inter_case_delay_ms: Option<u64>,
}

/// Model catalog from YAML; a listed platform replaces the default list entirely
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelsYaml {
    pub studio: Option<Vec<ModelSpec>>,
    pub vertex: Option<Vec<ModelSpec>>,
}

/// Credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsYaml {
    pub google_api_key: Option<String>,
    pub vertex_project: Option<String>,
    pub vertex_location: Option<String>,
    pub vertex_access_token: Option<String>,
    pub speech_api_key: Option<String>,
}

/// Endpoint overrides from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EndpointsYaml {
    pub studio_live_url: Option<String>,
    pub vertex_live_url: Option<String>,
    pub speech_to_text_url: Option<String>,
    pub text_to_speech_url: Option<String>,
    pub language_code: Option<String>,
}

/// Report configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReportYaml {
    pub output_path: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the YAML onto `config`.
    pub fn apply(self, config: &mut TesterConfig) {
        if let Some(prompt) = self.prompt {
            config.prompt = prompt;
        }
        if let Some(instruction) = self.instruction {
            config.instruction = instruction;
        }
        if let Some(keywords) = self.keywords {
            config.keywords = keywords;
        }
        if let Some(google_search) = self.google_search {
            config.google_search = google_search;
        }

        if let Some(audio) = self.audio {
            let target = &mut config.audio;
            if let Some(v) = audio.input_sample_rate {
                target.input_sample_rate = v;
            }
            if let Some(v) = audio.channels {
                target.channels = v;
            }
            if let Some(v) = audio.sample_width {
                target.sample_width = v;
            }
            if let Some(v) = audio.frame_bytes {
                target.frame_bytes = v;
            }
            if let Some(v) = audio.frame_pacing_ms {
                target.frame_pacing_ms = v;
            }
            if let Some(v) = audio.output_sample_rate {
                target.output_sample_rate = v;
            }
            if let Some(v) = audio.voice_input_path {
                target.voice_input_path = Some(PathBuf::from(v));
            }
        }

        if let Some(timing) = self.timing {
            let target = &mut config.timing;
            if let Some(v) = timing.turn_timeout_secs {
                target.turn_timeout_secs = v;
            }
            if let Some(v) = timing.connect_timeout_secs {
                target.connect_timeout_secs = v;
            }
            if let Some(v) = timing.max_retries {
                target.max_retries = v;
            }
            if let Some(v) = timing.retry_delay_ms {
                target.retry_delay_ms = v;
            }
            if let Some(v) = timing.inter_case_delay_ms {
                target.inter_case_delay_ms = v;
            }
        }

        if let Some(models) = self.models {
            if let Some(studio) = models.studio {
                config.models.studio = studio;
            }
            if let Some(vertex) = models.vertex {
                config.models.vertex = vertex;
            }
        }

        if let Some(creds) = self.credentials {
            let target = &mut config.credentials;
            if let Some(v) = creds.google_api_key {
                target.google_api_key = Some(Secret::new(v));
            }
            if let Some(v) = creds.vertex_project {
                target.vertex_project = Some(v);
            }
            if let Some(v) = creds.vertex_location {
                target.vertex_location = Some(v);
            }
            if let Some(v) = creds.vertex_access_token {
                target.vertex_access_token = Some(Secret::new(v));
            }
            if let Some(v) = creds.speech_api_key {
                target.speech_api_key = Some(Secret::new(v));
            }
        }

        if let Some(endpoints) = self.endpoints {
            let target = &mut config.endpoints;
            if let Some(v) = endpoints.studio_live_url {
                target.studio_live_url = v;
            }
            if let Some(v) = endpoints.vertex_live_url {
                target.vertex_live_url = v;
            }
            if let Some(v) = endpoints.speech_to_text_url {
                target.speech_to_text_url = v;
            }
            if let Some(v) = endpoints.text_to_speech_url {
                target.text_to_speech_url = v;
            }
            if let Some(v) = endpoints.language_code {
                target.language_code = v;
            }
        }

        if let Some(report) = self.report
            && let Some(path) = report.output_path
        {
            config.report.output_path = Some(PathBuf::from(path));
        }
    }
}
