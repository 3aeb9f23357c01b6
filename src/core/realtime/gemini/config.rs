//! Gemini Live connection settings.
//!
//! Resolves the endpoint, credentials and model path for one test case from
//! the immutable tester configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::config::{Secret, TesterConfig};
use crate::core::case::{Modality, Platform, TestCase};
use crate::errors::{TesterError, TesterResult};

/// Placeholder substituted with the Vertex AI location.
pub const LOCATION_PLACEHOLDER: &str = "{location}";

/// Response modality requested in the session setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseModality {
    Text,
    Audio,
}

impl ResponseModality {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Audio => "AUDIO",
        }
    }
}

impl From<Modality> for ResponseModality {
    fn from(modality: Modality) -> Self {
        match modality {
            Modality::Text => Self::Text,
            Modality::Voice => Self::Audio,
        }
    }
}

impl fmt::Display for ResponseModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved settings for one Live session.
#[derive(Clone)]
pub struct GeminiLiveConfig {
    /// WebSocket endpoint without credentials
    pub endpoint: String,
    /// Fully qualified model resource name
    pub model_path: String,
    /// API key appended as `key` query parameter (AI Studio)
    pub api_key: Option<Secret>,
    /// Bearer token sent in the `Authorization` header (Vertex AI)
    pub bearer_token: Option<Secret>,
    pub response_modality: ResponseModality,
    pub system_instruction: String,
    pub google_search: bool,
    /// Ask the service for a transcript of its audio output
    pub output_transcription: bool,
    /// Sample rate advertised in outbound audio mime types
    pub input_sample_rate: u32,
    pub connect_timeout: Duration,
}

impl fmt::Debug for GeminiLiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiLiveConfig")
            .field("endpoint", &self.endpoint)
            .field("model_path", &self.model_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("response_modality", &self.response_modality)
            .field("google_search", &self.google_search)
            .field("output_transcription", &self.output_transcription)
            .field("input_sample_rate", &self.input_sample_rate)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn non_empty(value: Option<&Secret>) -> Option<Secret> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

impl GeminiLiveConfig {
    /// Resolve settings for a case.
    ///
    /// # Errors
    /// Returns `TesterError::Config` if the platform's credentials or the
    /// Vertex AI project/location are missing.
    pub fn for_case(config: &TesterConfig, case: &TestCase) -> TesterResult<Self> {
        case.validate()?;

        let creds = &config.credentials;
        let (endpoint, model_path, api_key, bearer_token) = match case.platform {
            Platform::Studio => {
                let api_key = non_empty(creds.google_api_key.as_ref()).ok_or_else(|| {
                    TesterError::Config("GOOGLE_API_KEY not found in environment".to_string())
                })?;
                if case.region.is_some() {
                    tracing::debug!("Region override ignored for {}", case.identity());
                }
                (
                    config.endpoints.studio_live_url.clone(),
                    format!("models/{}", case.model),
                    Some(api_key),
                    None,
                )
            }
            Platform::Vertex => {
                let project = creds.vertex_project.as_deref().filter(|p| !p.trim().is_empty());
                let location = case
                    .region
                    .as_deref()
                    .or(creds.vertex_location.as_deref())
                    .filter(|l| !l.trim().is_empty());
                let (Some(project), Some(location)) = (project, location) else {
                    return Err(TesterError::Config(
                        "GOOGLE_CLOUD_PROJECT and GOOGLE_CLOUD_LOCATION required for Vertex AI"
                            .to_string(),
                    ));
                };
                let token = non_empty(creds.vertex_access_token.as_ref()).ok_or_else(|| {
                    TesterError::Config(
                        "GOOGLE_CLOUD_ACCESS_TOKEN required for Vertex AI".to_string(),
                    )
                })?;
                (
                    config
                        .endpoints
                        .vertex_live_url
                        .replace(LOCATION_PLACEHOLDER, location),
                    format!(
                        "projects/{project}/locations/{location}/publishers/google/models/{}",
                        case.model
                    ),
                    None,
                    Some(token),
                )
            }
        };

        Ok(Self {
            endpoint,
            model_path,
            api_key,
            bearer_token,
            response_modality: case.modality.into(),
            system_instruction: config.instruction.clone(),
            google_search: config.google_search,
            output_transcription: case.native_audio,
            input_sample_rate: config.audio.input_sample_rate,
            connect_timeout: config.timing.connect_timeout(),
        })
    }

    /// Endpoint URL including the API key query parameter, if any.
    pub fn ws_url(&self) -> TesterResult<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            TesterError::Config(format!("Invalid Live endpoint {}: {e}", self.endpoint))
        })?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key.as_str());
        }
        Ok(url)
    }
}
