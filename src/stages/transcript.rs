// Stage 3: Timestamp Transcription (audio -> word-level CSV).
//
// A terminal branch: nothing downstream consumes the transcript, it is kept
// for captioning and review.

use async_trait::async_trait;
use tracing::info;

use crate::collab::{transcribe, ApiConfig, TranscribeClient};
use crate::error::StageError;
use crate::stages::{Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

pub struct TranscriptStage {
    transcriber: TranscribeClient,
}

impl TranscriptStage {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            transcriber: TranscribeClient::new(api),
        }
    }
}

#[async_trait]
impl Stage for TranscriptStage {
    fn name(&self) -> &'static str {
        "transcription"
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Audio]
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::Transcript
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let audio = ctx.input(ArtifactKind::Audio)?;
        let words = self.transcriber.transcribe(&audio.location).await?;
        info!("[TRANSCRIPT] {} words recognized", words.len());

        let csv = transcribe::to_csv(&words);
        let artifact = ctx.store.persist(
            ArtifactKind::Transcript,
            "sentence_timestamps.csv",
            csv.as_bytes(),
        )?;
        Ok(vec![artifact])
    }
}
