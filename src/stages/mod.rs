// TL;DR Studio - Stage Contract & Catalogue
//
// Each pipeline stage declares the artifact kinds it consumes and produces
// and is invoked with already-resolved input paths. Resolution is the
// executor's job, never the stage's, so any stage can be driven with a fixed
// input in tests without touching the store.

pub mod audio;
pub mod metadata;
pub mod script;
pub mod storyboard;
pub mod transcript;
pub mod video;

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::collab::ApiConfig;
use crate::error::StageError;
use crate::store::{Artifact, ArtifactKind, ArtifactStore};

/// Parameters threaded through a run.
#[derive(Debug, Clone)]
pub struct StageParams {
    pub image_count: usize,
}

impl Default for StageParams {
    fn default() -> Self {
        Self { image_count: 5 }
    }
}

/// Everything a stage may touch: resolved inputs, run parameters, and the
/// store it persists outputs through.
pub struct StageContext<'a> {
    pub store: &'a ArtifactStore,
    pub inputs: HashMap<ArtifactKind, Artifact>,
    pub params: StageParams,
}

impl StageContext<'_> {
    pub fn input(&self, kind: ArtifactKind) -> Result<&Artifact, StageError> {
        self.inputs.get(&kind).ok_or(StageError::NotFound(kind))
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Artifact kinds the executor must resolve before invoking this stage.
    fn inputs(&self) -> &'static [ArtifactKind] {
        &[]
    }

    fn output(&self) -> ArtifactKind;

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError>;
}

/// Decision seam for human-in-the-loop selections (category, idea, title).
/// A suspended stage resumes through exactly one point: an index into the
/// offered options.
pub trait Chooser: Send + Sync {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize, StageError>;
}

/// Interactive chooser reading a 1-based number from stdin.
pub struct StdinChooser;

impl Chooser for StdinChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<usize, StageError> {
        if options.is_empty() {
            return Err(StageError::InvalidInput("nothing to choose from".to_string()));
        }
        for (i, option) in options.iter().enumerate() {
            println!("{}. {}", i + 1, option);
        }
        println!("{prompt}:");
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let n: usize = line.trim().parse().map_err(|_| {
            StageError::InvalidInput(format!(
                "expected a number between 1 and {}",
                options.len()
            ))
        })?;
        if n == 0 || n > options.len() {
            return Err(StageError::InvalidInput(format!(
                "selection {n} out of range 1-{}",
                options.len()
            )));
        }
        Ok(n - 1)
    }
}

/// Pre-seeded selections for tests and non-interactive runs. Picks are
/// consumed in order; once exhausted the first option wins.
pub struct FixedChooser {
    picks: Vec<usize>,
    cursor: AtomicUsize,
}

impl FixedChooser {
    pub fn new(picks: Vec<usize>) -> Self {
        Self {
            picks,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Chooser for FixedChooser {
    fn choose(&self, _prompt: &str, options: &[String]) -> Result<usize, StageError> {
        if options.is_empty() {
            return Err(StageError::InvalidInput("nothing to choose from".to_string()));
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        let pick = self.picks.get(i).copied().unwrap_or(0);
        Ok(pick.min(options.len() - 1))
    }
}

/// The full stage list, in pipeline order. Transcription and Metadata are
/// terminal branches; nothing downstream consumes their outputs.
pub fn catalogue(api: &ApiConfig, chooser: Arc<dyn Chooser>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(script::ScriptStage::new(api, chooser.clone())),
        Box::new(audio::AudioStage::new(api)),
        Box::new(transcript::TranscriptStage::new(api)),
        Box::new(storyboard::StoryboardStage::new(api)),
        Box::new(metadata::MetadataStage::new(api, chooser)),
        Box::new(video::VideoStage::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("option {i}")).collect()
    }

    #[test]
    fn test_fixed_chooser_consumes_picks_in_order() {
        let chooser = FixedChooser::new(vec![2, 0]);
        assert_eq!(chooser.choose("pick", &options(4)).unwrap(), 2);
        assert_eq!(chooser.choose("pick", &options(4)).unwrap(), 0);
        // Exhausted picks fall back to the first option.
        assert_eq!(chooser.choose("pick", &options(4)).unwrap(), 0);
    }

    #[test]
    fn test_fixed_chooser_clamps_out_of_range_pick() {
        let chooser = FixedChooser::new(vec![9]);
        assert_eq!(chooser.choose("pick", &options(3)).unwrap(), 2);
    }

    #[test]
    fn test_chooser_rejects_empty_options() {
        let chooser = FixedChooser::new(vec![0]);
        assert!(chooser.choose("pick", &[]).is_err());
    }
}
