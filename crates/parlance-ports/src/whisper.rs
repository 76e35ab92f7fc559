//! Speech-to-text via Whisper (Groq or OpenAI).

use async_trait::async_trait;
use tracing::info;

use parlance_core::error::{ParlanceError, Result};

use crate::Transcriber;

/// Get the API URL for the given provider.
fn provider_url(provider: &str) -> &str {
    match provider {
        "openai" => "https://api.openai.com/v1/audio/transcriptions",
        _ => "https://api.groq.com/openai/v1/audio/transcriptions",
    }
}

/// Get the default model for the given provider.
fn default_model(provider: &str) -> &str {
    match provider {
        "openai" => "whisper-1",
        _ => "whisper-large-v3-turbo",
    }
}

pub struct WhisperTranscriber {
    url: String,
    model: String,
    language: Option<String>,
    api_key: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn new(
        provider: &str,
        model: Option<&str>,
        language: Option<&str>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            url: provider_url(provider).to_string(),
            model: model.unwrap_or(default_model(provider)).to_string(),
            language: language.map(str::to_string),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.ogg")
            .mime_str("application/octet-stream")
            .map_err(|e| ParlanceError::TranscriptionFailed(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParlanceError::TranscriptionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ParlanceError::TranscriptionFailed(format!(
                "API error {status}: {body}"
            )));
        }

        let transcript = response
            .text()
            .await
            .map_err(|e| ParlanceError::TranscriptionFailed(e.to_string()))?;
        let transcript = transcript.trim().to_string();

        info!(model = %self.model, chars = transcript.len(), "Audio transcribed");

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_url_selection() {
        assert_eq!(
            provider_url("groq"),
            "https://api.groq.com/openai/v1/audio/transcriptions"
        );
        assert_eq!(
            provider_url("openai"),
            "https://api.openai.com/v1/audio/transcriptions"
        );
        // Default is groq
        assert_eq!(
            provider_url("unknown"),
            "https://api.groq.com/openai/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_default_model_per_provider() {
        assert_eq!(default_model("openai"), "whisper-1");
        assert_eq!(default_model("groq"), "whisper-large-v3-turbo");
    }

    #[test]
    fn test_explicit_model_overrides_default() {
        let port = WhisperTranscriber::new("groq", Some("whisper-large-v3"), Some("en"), "key");
        assert_eq!(port.model, "whisper-large-v3");
        assert_eq!(port.language.as_deref(), Some("en"));
    }
}
