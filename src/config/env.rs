use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{Secret, TesterConfig};

/// Read a non-empty environment variable.
fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a numeric environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: '{raw}' ({e})")),
        None => Ok(None),
    }
}

/// Apply environment variables on top of the given configuration.
///
/// Only variables that are present and non-empty override existing values.
pub(crate) fn apply_env(config: &mut TesterConfig) -> Result<(), String> {
    let creds = &mut config.credentials;
    if let Some(key) = env_string("GOOGLE_API_KEY") {
        creds.google_api_key = Some(Secret::new(key));
    }
    if let Some(project) = env_string("GOOGLE_CLOUD_PROJECT") {
        creds.vertex_project = Some(project);
    }
    if let Some(location) = env_string("GOOGLE_CLOUD_LOCATION") {
        creds.vertex_location = Some(location);
    }
    if let Some(token) = env_string("GOOGLE_CLOUD_ACCESS_TOKEN") {
        creds.vertex_access_token = Some(Secret::new(token));
    }
    if let Some(key) = env_string("GOOGLE_SPEECH_API_KEY") {
        creds.speech_api_key = Some(Secret::new(key));
    }

    if let Some(secs) = env_parse::<u64>("LIVE_TESTER_TURN_TIMEOUT_SECS")? {
        config.timing.turn_timeout_secs = secs;
    }
    if let Some(retries) = env_parse::<u32>("LIVE_TESTER_MAX_RETRIES")? {
        config.timing.max_retries = retries;
    }
    if let Some(ms) = env_parse::<u64>("LIVE_TESTER_RETRY_DELAY_MS")? {
        config.timing.retry_delay_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("LIVE_TESTER_INTER_CASE_DELAY_MS")? {
        config.timing.inter_case_delay_ms = ms;
    }

    if let Some(path) = env_string("LIVE_TESTER_VOICE_INPUT") {
        config.audio.voice_input_path = Some(PathBuf::from(path));
    }
    if let Some(path) = env_string("LIVE_TESTER_REPORT_PATH") {
        config.report.output_path = Some(PathBuf::from(path));
    }

    Ok(())
}
