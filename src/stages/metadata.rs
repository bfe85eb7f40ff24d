// Stage 5: Title, Description & Cover.
//
// An independent branch off the script: suggested titles go through the
// chooser seam, then a description and a thumbnail are generated for the
// chosen title. Nothing downstream consumes these.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::collab::{ApiConfig, ChatClient, ImageClient};
use crate::error::StageError;
use crate::stages::{Chooser, Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

pub struct MetadataStage {
    chat: ChatClient,
    images: ImageClient,
    chooser: Arc<dyn Chooser>,
}

impl MetadataStage {
    pub fn new(api: &ApiConfig, chooser: Arc<dyn Chooser>) -> Self {
        Self {
            chat: ChatClient::new(api, "gpt-4o-mini"),
            images: ImageClient::new(api),
            chooser,
        }
    }
}

#[async_trait]
impl Stage for MetadataStage {
    fn name(&self) -> &'static str {
        "metadata-cover"
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Script]
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::Metadata
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let script = ctx.input(ArtifactKind::Script)?;
        let text = std::fs::read_to_string(&script.location)?;

        let titles = ChatClient::lines(
            &self
                .chat
                .generate(&format!("Suggest 5 catchy titles for: {text}"), 0.8)
                .await?,
        );
        if titles.is_empty() {
            return Err(StageError::Collaborator(
                "model returned no title suggestions".to_string(),
            ));
        }
        let i = self.chooser.choose("Choose title number", &titles)?;
        let title = &titles[i];

        let description = self
            .chat
            .generate(
                &format!("Write a YouTube description for the video titled: {title}"),
                0.8,
            )
            .await?;

        let title_artifact = ctx
            .store
            .persist(ArtifactKind::Metadata, "title.txt", title.as_bytes())?;
        let desc_artifact = ctx.store.persist(
            ArtifactKind::Metadata,
            "description.txt",
            description.as_bytes(),
        )?;

        let cover = self
            .images
            .generate(&format!("YouTube thumbnail for {title}"), "1024x1024")
            .await?;
        let cover_artifact = ctx
            .store
            .persist(ArtifactKind::Metadata, "cover.png", &cover)?;

        info!("[METADATA] title, description and cover saved");
        Ok(vec![title_artifact, desc_artifact, cover_artifact])
    }
}
