// TL;DR Studio - External Collaborators
//
// Thin clients for the generative services the pipeline sequences. Each one
// is capability-shaped: stages see "generate text", "synthesize speech",
// "transcribe", "generate image" and nothing else.

pub mod chat;
pub mod images;
pub mod speech;
pub mod transcribe;

pub use chat::ChatClient;
pub use images::ImageClient;
pub use speech::{SpeechClient, VoiceParams};
pub use transcribe::{TranscribeClient, WordTimestamp};

/// Connection settings shared by every collaborator client. `api_url` is an
/// OpenAI-compatible base such as `https://api.openai.com/v1`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub api_key: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("STUDIO_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }
}
