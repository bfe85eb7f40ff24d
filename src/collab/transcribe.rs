// Transcription client (/audio/transcriptions, word-level timestamps).

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::ApiConfig;
use crate::error::StageError;

/// One recognized word and its display window in the narration.
#[derive(Debug, Clone, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscript {
    #[serde(default)]
    words: Vec<WordTimestamp>,
}

#[derive(Clone)]
pub struct TranscribeClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl TranscribeClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Transcribe an audio file, returning word-level timestamps.
    pub async fn transcribe(&self, audio: &Path) -> Result<Vec<WordTimestamp>, StageError> {
        info!("[TRANSCRIBE] uploading {:?}", audio);

        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| StageError::Collaborator(format!("audio mime: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .part("file", part);

        let resp = self
            .client
            .post(self.config.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StageError::Collaborator(format!("transcription request: {e}")))?;

        if !resp.status().is_success() {
            return Err(StageError::Collaborator(format!(
                "transcription API returned {}",
                resp.status()
            )));
        }

        let transcript: VerboseTranscript = resp
            .json()
            .await
            .map_err(|e| StageError::Collaborator(format!("transcription body: {e}")))?;
        Ok(transcript.words)
    }
}

/// Render word timestamps as the tabular transcript artifact.
pub fn to_csv(words: &[WordTimestamp]) -> String {
    let mut out = String::from("word,start,end\n");
    for w in words {
        out.push_str(&format!("{},{},{}\n", w.word, w.start, w.end));
    }
    out
}
