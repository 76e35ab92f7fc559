//! Text-to-speech via the ElevenLabs API.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use parlance_core::error::{ParlanceError, Result};

use crate::Synthesizer;

const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM"; // ElevenLabs "Rachel"
const DEFAULT_MODEL: &str = "eleven_monolingual_v1";
const DEFAULT_OUTPUT_FORMAT: &str = "ogg_opus";

pub struct ElevenLabsSynthesizer {
    voice_id: String,
    model_id: String,
    output_format: String,
    api_key: String,
    client: reqwest::Client,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        voice_id: Option<&str>,
        model_id: Option<&str>,
        output_format: Option<&str>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            voice_id: voice_id.unwrap_or(DEFAULT_VOICE_ID).to_string(),
            model_id: model_id.unwrap_or(DEFAULT_MODEL).to_string(),
            output_format: output_format.unwrap_or(DEFAULT_OUTPUT_FORMAT).to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, markup: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}/stream?output_format={}",
            self.voice_id, self.output_format
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({
                "text": markup,
                "model_id": self.model_id,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75
                }
            }))
            .send()
            .await
            .map_err(|e| ParlanceError::SynthesisFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ParlanceError::SynthesisFailed(format!(
                "API error {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ParlanceError::SynthesisFailed(e.to_string()))?;

        info!(
            size_kb = bytes.len() / 1024,
            voice = %self.voice_id,
            model = %self.model_id,
            "Speech synthesized"
        );

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let port = ElevenLabsSynthesizer::new(None, None, None, "key");
        assert_eq!(port.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(port.model_id, DEFAULT_MODEL);
        assert_eq!(port.output_format, DEFAULT_OUTPUT_FORMAT);
    }

    #[test]
    fn test_overrides_applied() {
        let port = ElevenLabsSynthesizer::new(Some("v1"), Some("m1"), Some("mp3_44100_128"), "key");
        assert_eq!(port.voice_id, "v1");
        assert_eq!(port.model_id, "m1");
        assert_eq!(port.output_format, "mp3_44100_128");
    }
}
