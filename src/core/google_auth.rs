//! Authentication for the Google Cloud speech REST services.

use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::config::{Credentials, Secret};
use crate::errors::{TesterError, TesterResult};

/// How a speech request is authenticated.
#[derive(Clone)]
pub enum GoogleAuth {
    /// `key` query parameter
    ApiKey(Secret),
    /// `Authorization: Bearer` header
    Bearer(Secret),
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            GoogleAuth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

impl GoogleAuth {
    /// Pick credentials: dedicated speech key, then the AI Studio key, then
    /// the Vertex AI access token.
    pub fn from_credentials(creds: &Credentials) -> TesterResult<Self> {
        let usable = |s: &Option<Secret>| s.as_ref().filter(|v| !v.trim().is_empty()).cloned();

        if let Some(key) = usable(&creds.speech_api_key).or_else(|| usable(&creds.google_api_key)) {
            return Ok(GoogleAuth::ApiKey(key));
        }
        if let Some(token) = usable(&creds.vertex_access_token) {
            return Ok(GoogleAuth::Bearer(token));
        }
        Err(TesterError::Config(
            "No credentials for speech services: set GOOGLE_SPEECH_API_KEY, GOOGLE_API_KEY or GOOGLE_CLOUD_ACCESS_TOKEN"
                .to_string(),
        ))
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            GoogleAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            GoogleAuth::Bearer(token) => request.bearer_auth(token.as_str()),
        }
    }
}

/// Google API error body.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorResponse {
    pub error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Turn a non-success response body into a transport error.
pub(crate) fn api_error(service: &str, status: reqwest::StatusCode, body: &str) -> TesterError {
    let message = match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => format!(
            "{service} API error: {} ({})",
            parsed.error.message, parsed.error.status
        ),
        Err(_) => format!("{service} API error ({status}): {body}"),
    };
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        TesterError::Config(message)
    } else {
        TesterError::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_priority() {
        let mut creds = Credentials {
            google_api_key: Some(Secret::new("studio".to_string())),
            vertex_access_token: Some(Secret::new("token".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            GoogleAuth::from_credentials(&creds).unwrap(),
            GoogleAuth::ApiKey(k) if k.as_str() == "studio"
        ));

        creds.speech_api_key = Some(Secret::new("speech".to_string()));
        assert!(matches!(
            GoogleAuth::from_credentials(&creds).unwrap(),
            GoogleAuth::ApiKey(k) if k.as_str() == "speech"
        ));

        let token_only = Credentials {
            vertex_access_token: Some(Secret::new("token".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            GoogleAuth::from_credentials(&token_only).unwrap(),
            GoogleAuth::Bearer(_)
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let err = GoogleAuth::from_credentials(&Credentials::default()).unwrap_err();
        assert!(matches!(err, TesterError::Config(_)));
    }

    #[test]
    fn test_api_error_parsing() {
        let body = r#"{"error": {"code": 400, "message": "Invalid audio", "status": "INVALID_ARGUMENT"}}"#;
        let err = api_error("Speech-to-Text", reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err,
            TesterError::Transport(
                "Speech-to-Text API error: Invalid audio (INVALID_ARGUMENT)".to_string()
            )
        );

        let err = api_error("Text-to-Speech", reqwest::StatusCode::FORBIDDEN, "denied");
        assert!(matches!(err, TesterError::Config(_)));
    }
}
