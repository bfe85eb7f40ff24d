// Image-generation client (/images/generations + URL download).

use serde_json::json;
use tracing::info;

use super::ApiConfig;
use crate::error::StageError;

#[derive(Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ImageClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Generate one image for `prompt` and download its bytes.
    pub async fn generate(&self, prompt: &str, size: &str) -> Result<Vec<u8>, StageError> {
        info!("[IMAGE] generating {} image", size);

        let payload = json!({
            "model": "dall-e-3",
            "prompt": prompt,
            "n": 1,
            "size": size,
        });

        let resp = self
            .client
            .post(self.config.endpoint("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::Collaborator(format!("image request: {e}")))?;

        if !resp.status().is_success() {
            return Err(StageError::Collaborator(format!(
                "image API returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| StageError::Collaborator(format!("image response body: {e}")))?;
        let url = body["data"][0]["url"].as_str().ok_or_else(|| {
            StageError::Collaborator("image API response missing url".to_string())
        })?;

        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StageError::Collaborator(format!("image download: {e}")))?
            .bytes()
            .await
            .map_err(|e| StageError::Collaborator(format!("image download body: {e}")))?;

        Ok(bytes.to_vec())
    }
}
