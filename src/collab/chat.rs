// Chat-completion client (OpenAI-compatible /chat/completions).

use serde_json::json;
use tracing::debug;

use super::ApiConfig;
use crate::error::StageError;

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ApiConfig,
    model: String,
}

impl ChatClient {
    pub fn new(config: &ApiConfig, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
            model: model.to_string(),
        }
    }

    /// One-shot completion. Empty or malformed responses surface as
    /// `CollaboratorFailure`, never a panic.
    pub async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, StageError> {
        debug!("[CHAT] {} <- {:.60}...", self.model, prompt);

        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
        });

        let resp = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::Collaborator(format!("chat request: {e}")))?;

        if !resp.status().is_success() {
            return Err(StageError::Collaborator(format!(
                "chat API returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| StageError::Collaborator(format!("chat response body: {e}")))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(StageError::Collaborator(
                "chat API returned empty content".to_string(),
            ));
        }
        Ok(content)
    }

    /// Split a completion into trimmed, non-empty lines. Category, idea and
    /// title lists all come back one-per-line.
    pub fn lines(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }
}
