use super::{AudioConfig, ModelCatalog, TesterConfig, TimingConfig};

/// Validate the assembled configuration.
pub(crate) fn validate(config: &TesterConfig) -> Result<(), String> {
    if config.prompt.trim().is_empty() {
        return Err("prompt must not be empty".to_string());
    }
    validate_keywords(&config.keywords)?;
    validate_audio(&config.audio)?;
    validate_timing(&config.timing)?;
    validate_models(&config.models)?;
    Ok(())
}

fn validate_keywords(keywords: &[String]) -> Result<(), String> {
    if keywords.iter().all(|k| k.trim().is_empty()) {
        return Err("keywords must contain at least one non-empty keyword".to_string());
    }
    Ok(())
}

fn validate_audio(audio: &AudioConfig) -> Result<(), String> {
    if audio.input_sample_rate == 0 || audio.output_sample_rate == 0 {
        return Err("audio sample rates must be greater than zero".to_string());
    }
    if audio.channels == 0 {
        return Err("audio.channels must be greater than zero".to_string());
    }
    if audio.sample_width != 2 {
        return Err(format!(
            "audio.sample_width must be 2 (16-bit PCM), got {}",
            audio.sample_width
        ));
    }
    let block = usize::from(audio.sample_width) * usize::from(audio.channels);
    if audio.frame_bytes == 0 || audio.frame_bytes % block != 0 {
        return Err(format!(
            "audio.frame_bytes must be a non-zero multiple of {block} bytes, got {}",
            audio.frame_bytes
        ));
    }
    Ok(())
}

fn validate_timing(timing: &TimingConfig) -> Result<(), String> {
    if timing.max_retries == 0 {
        return Err("timing.max_retries must be at least 1".to_string());
    }
    if timing.turn_timeout_secs == 0 {
        return Err("timing.turn_timeout_secs must be greater than zero".to_string());
    }
    if timing.connect_timeout_secs == 0 {
        return Err("timing.connect_timeout_secs must be greater than zero".to_string());
    }
    Ok(())
}

fn validate_models(models: &ModelCatalog) -> Result<(), String> {
    for model in models.studio.iter().chain(models.vertex.iter()) {
        if model.name.trim().is_empty() {
            return Err("model names must not be empty".to_string());
        }
        if model.native_audio && !model.supports_audio {
            return Err(format!(
                "model {} is declared native_audio but not supports_audio",
                model.name
            ));
        }
    }
    Ok(())
}
