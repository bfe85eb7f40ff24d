// Stage 2: Audio Creation (script text -> narrated mp3).

use async_trait::async_trait;
use tracing::info;

use crate::collab::{ApiConfig, SpeechClient, VoiceParams};
use crate::error::StageError;
use crate::stages::{Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

pub struct AudioStage {
    speech: SpeechClient,
    voice: VoiceParams,
}

impl AudioStage {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            speech: SpeechClient::new(api),
            voice: VoiceParams::default(),
        }
    }
}

#[async_trait]
impl Stage for AudioStage {
    fn name(&self) -> &'static str {
        "audio-creation"
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Script]
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::Audio
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let script = ctx.input(ArtifactKind::Script)?;
        let text = std::fs::read_to_string(&script.location)?;

        let bytes = self.speech.synthesize(&text, &self.voice).await?;
        let artifact = ctx
            .store
            .persist(ArtifactKind::Audio, "tts_output.mp3", &bytes)?;
        info!("[AUDIO] saved {:?}", artifact.location);
        Ok(vec![artifact])
    }
}
