//! Test case identity and capability types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{TesterError, TesterResult};

/// Hosting platform of the streaming service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Google AI Studio (API key authentication)
    Studio,
    /// Google Cloud Vertex AI (project/location + bearer token)
    Vertex,
}

impl Platform {
    /// All platforms in matrix execution order.
    pub const ALL: [Platform; 2] = [Platform::Studio, Platform::Vertex];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Studio => "studio",
            Platform::Vertex => "vertex",
        }
    }

    /// Human readable platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Studio => "Google AI Studio",
            Platform::Vertex => "Google Cloud Vertex AI",
        }
    }

    /// Parse a platform name, accepting the long-form aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "studio" | "google-ai-studio" | "ai-studio" => Some(Platform::Studio),
            "vertex" | "vertex-ai" | "vertexai" => Some(Platform::Vertex),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = TesterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::parse(s).ok_or_else(|| {
            TesterError::Config(format!(
                "Unsupported platform: {s}. Supported platforms: studio, vertex"
            ))
        })
    }
}

/// Stimulus/response modality of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Voice,
}

impl Modality {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Voice => "voice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Modality::Text),
            "voice" | "audio" => Some(Modality::Voice),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model entry of the platform catalog with its declared capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier as understood by the service
    pub name: String,
    /// Whether the model accepts audio stimuli and answers with audio
    #[serde(default = "default_true")]
    pub supports_audio: bool,
    /// Whether the model answers only with audio plus an accompanying transcript
    #[serde(default)]
    pub native_audio: bool,
}

fn default_true() -> bool {
    true
}

impl ModelSpec {
    /// A live model that handles both text and audio turns.
    pub fn live(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_audio: true,
            native_audio: false,
        }
    }

    /// A native-audio model (audio output with transcription only).
    pub fn native_audio(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_audio: true,
            native_audio: true,
        }
    }

    /// A model only exercised with text turns.
    pub fn text_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_audio: false,
            native_audio: false,
        }
    }

    /// Whether this model participates in cases of the given modality.
    pub fn supports(&self, modality: Modality) -> bool {
        match modality {
            Modality::Text => true,
            Modality::Voice => self.supports_audio,
        }
    }
}

/// One cell of the test matrix. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    pub platform: Platform,
    pub model: String,
    pub modality: Modality,
    /// Region override; for Vertex AI it replaces the configured location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Capability flag: the model answers with audio plus transcript only
    pub native_audio: bool,
}

impl TestCase {
    /// Build a case for a catalog model.
    pub fn new(platform: Platform, model: &ModelSpec, modality: Modality) -> Self {
        Self {
            platform,
            model: model.name.clone(),
            modality,
            region: None,
            native_audio: model.native_audio,
        }
    }

    /// Return the same case with a region override.
    pub fn with_region(self, region: Option<String>) -> Self {
        Self { region, ..self }
    }

    /// Identity key `platform-model-modality`.
    pub fn identity(&self) -> String {
        format!("{}-{}-{}", self.platform, self.model, self.modality)
    }

    /// Native-audio models are expected to reject text turns.
    pub fn is_expected_failure(&self) -> bool {
        self.native_audio && self.modality == Modality::Text
    }

    /// Validate the case fields that do not depend on credentials.
    pub fn validate(&self) -> TesterResult<()> {
        if self.model.trim().is_empty() {
            return Err(TesterError::Config("Model name is required".to_string()));
        }
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(TesterError::Config(
                "Region override must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
