// Stage 4: Storyboard Creation (script -> numbered scene images + bundle).
//
// One image per scene, named so the encoded index carries display order.
// The numbered files and a packaged `images.zip` land in the same namespace;
// the assembler accepts either.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::collab::{ApiConfig, ImageClient};
use crate::error::StageError;
use crate::stages::{Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

const IMAGE_SIZE: &str = "1024x1024";

pub struct StoryboardStage {
    images: ImageClient,
}

impl StoryboardStage {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            images: ImageClient::new(api),
        }
    }
}

#[async_trait]
impl Stage for StoryboardStage {
    fn name(&self) -> &'static str {
        "storyboard"
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Script]
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::ImageSet
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let script = ctx.input(ArtifactKind::Script)?;
        let text = std::fs::read_to_string(&script.location)?;
        let count = ctx.params.image_count;
        if count == 0 {
            return Err(StageError::InvalidInput(
                "image count must be at least 1".to_string(),
            ));
        }

        let mut scene_paths = Vec::with_capacity(count);
        for i in 1..=count {
            let prompt = format!("{text}\nScene {i}");
            let bytes = self.images.generate(&prompt, IMAGE_SIZE).await?;
            let artifact =
                ctx.store
                    .persist(ArtifactKind::ImageSet, &format!("scene_{i:03}.png"), &bytes)?;
            info!("[STORYBOARD] saved {:?}", artifact.location);
            scene_paths.push(artifact.location);
        }

        let bundle = pack_bundle(&scene_paths)?;
        let artifact = ctx
            .store
            .persist(ArtifactKind::ImageSet, "images.zip", &bundle)?;
        info!("[STORYBOARD] bundled {} scenes", scene_paths.len());
        Ok(vec![artifact])
    }
}

/// Pack the numbered scene files into an uncompressed zip bundle.
pub fn pack_bundle(paths: &[PathBuf]) -> Result<Vec<u8>, StageError> {
    let cursor = std::io::Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(cursor);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StageError::InvalidInput(format!("unusable file name: {path:?}")))?;
        writer
            .start_file(name, options)
            .map_err(std::io::Error::other)?;
        let bytes = std::fs::read(path)?;
        writer.write_all(&bytes)?;
    }

    let cursor = writer.finish().map_err(std::io::Error::other)?;
    Ok(cursor.into_inner())
}
