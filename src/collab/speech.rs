// Speech-synthesis client (/audio/speech).

use serde_json::json;
use tracing::info;

use super::ApiConfig;
use crate::error::StageError;

/// Narrator settings for the TTS call.
#[derive(Debug, Clone)]
pub struct VoiceParams {
    pub model: String,
    pub voice: String,
    pub speed: f64,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini-tts".to_string(),
            voice: "coral".to_string(),
            speed: 0.95,
        }
    }
}

#[derive(Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl SpeechClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Synthesize `text` and return the encoded audio bytes (mp3).
    pub async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParams,
    ) -> Result<Vec<u8>, StageError> {
        info!(
            "[SPEECH] synthesizing {} chars with voice '{}'",
            text.len(),
            params.voice
        );

        let payload = json!({
            "model": params.model,
            "voice": params.voice,
            "input": text,
            "speed": params.speed,
        });

        let resp = self
            .client
            .post(self.config.endpoint("audio/speech"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::Collaborator(format!("speech request: {e}")))?;

        if !resp.status().is_success() {
            return Err(StageError::Collaborator(format!(
                "speech API returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StageError::Collaborator(format!("speech response body: {e}")))?;
        if bytes.is_empty() {
            return Err(StageError::Collaborator(
                "speech API returned no audio".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
