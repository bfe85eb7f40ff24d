// Stage 1: Ideation & Script Generation
//
// Chat for categories, suspend for a selection, chat for ideas, suspend
// again, then generate the narration script and persist it under a slug of
// the chosen idea.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::collab::{ApiConfig, ChatClient};
use crate::error::StageError;
use crate::stages::{Chooser, Stage, StageContext};
use crate::store::{Artifact, ArtifactKind};

pub struct ScriptStage {
    chat: ChatClient,
    chooser: Arc<dyn Chooser>,
}

impl ScriptStage {
    pub fn new(api: &ApiConfig, chooser: Arc<dyn Chooser>) -> Self {
        Self {
            chat: ChatClient::new(api, "gpt-4o"),
            chooser,
        }
    }

    fn pick(&self, prompt: &str, options: &[String]) -> Result<String, StageError> {
        if options.is_empty() {
            return Err(StageError::Collaborator(
                "model returned no options to choose from".to_string(),
            ));
        }
        let i = self.chooser.choose(prompt, options)?;
        Ok(options[i].clone())
    }
}

#[async_trait]
impl Stage for ScriptStage {
    fn name(&self) -> &'static str {
        "ideation-script"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::Script
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
        let categories = ChatClient::lines(
            &self
                .chat
                .generate("Suggest faceless YouTube categories about tech trends", 0.6)
                .await?,
        );
        let category = self.pick("Pick a category number", &categories)?;

        let ideas = ChatClient::lines(
            &self
                .chat
                .generate(&format!("Give 5 video ideas about {category}"), 0.8)
                .await?,
        );
        let idea = self.pick("Pick an idea number", &ideas)?;

        let script = self
            .chat
            .generate(&format!("Write a short narration for: {idea}"), 0.8)
            .await?;

        let name = format!("{}.txt", truncate(&slugify(&idea), 50));
        let artifact = ctx
            .store
            .persist(ArtifactKind::Script, &name, script.as_bytes())?;
        info!("[SCRIPT] saved {:?}", artifact.location);
        Ok(vec![artifact])
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to
/// single hyphens, no leading or trailing hyphen.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
