// Stage 6: Video Assembly (audio + image set -> final mp4).

use async_trait::async_trait;
use tracing::info;

use crate::assembler::{self, AssemblyOptions};
use crate::error::StageError;
use crate::stages::{Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

const OUTPUT_NAME: &str = "final_video.mp4";

pub struct VideoStage {
    options: AssemblyOptions,
}

impl VideoStage {
    pub fn new() -> Self {
        Self {
            options: AssemblyOptions::default(),
        }
    }
}

impl Default for VideoStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for VideoStage {
    fn name(&self) -> &'static str {
        "video-assembly"
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Audio, ArtifactKind::ImageSet]
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::Video
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let audio = ctx.input(ArtifactKind::Audio)?;
        let images = ctx.input(ArtifactKind::ImageSet)?;

        let output = ctx.store.ensure_dir(ArtifactKind::Video)?.join(OUTPUT_NAME);
        let duration = assembler::assemble(
            &audio.location,
            &images.location,
            &output,
            &self.options,
        )
        .await?;

        let artifact = ctx.store.adopt(ArtifactKind::Video, OUTPUT_NAME)?;
        info!(
            "[VIDEO] final video saved ({duration:.2}s): {:?}",
            artifact.location
        );
        Ok(vec![artifact])
    }
}
