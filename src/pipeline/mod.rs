// TL;DR Studio - Pipeline Executor
//
// Runs the stage list strictly sequentially: stage N+1 must not start before
// stage N reaches a terminal state, because later stages resolve "latest"
// artifacts that stage N's completion must have produced. On the first
// failure the run halts; artifacts already on disk stay put, so re-running
// from the failed stage resumes the pipeline.

pub mod process;

use std::collections::HashMap;

use tokio::process::Command;
use tracing::{error, info};

use crate::error::StageError;
use crate::stages::{Stage, StageContext, StageParams};
use crate::store::{Artifact, ArtifactKind, ArtifactStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// The failure that halted a run, pinned to the stage that raised it.
#[derive(Debug)]
pub struct StageFailure {
    /// Zero-based position in the stage list.
    pub index: usize,
    pub name: &'static str,
    pub error: StageError,
}

/// Ephemeral record of one pipeline invocation. Never persisted; a fresh
/// run always re-resolves the latest artifacts from the store.
#[derive(Debug)]
pub struct PipelineRun {
    names: Vec<&'static str>,
    statuses: Vec<StageStatus>,
    failure: Option<StageFailure>,
}

impl PipelineRun {
    fn new(names: Vec<&'static str>) -> Self {
        let statuses = vec![StageStatus::Pending; names.len()];
        Self {
            names,
            statuses,
            failure: None,
        }
    }

    pub fn status(&self, index: usize) -> StageStatus {
        self.statuses[index]
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// How the executor invokes a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Direct call on the orchestrator task.
    InProcess,
    /// Re-invoke this binary as `stage <n>` in a child process, capturing
    /// combined output for diagnostics. Sandboxes a misbehaving collaborator.
    Isolated,
}

pub struct Executor {
    store: ArtifactStore,
    stages: Vec<Box<dyn Stage>>,
    mode: ExecMode,
}

impl Executor {
    pub fn new(store: ArtifactStore, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            store,
            stages,
            mode: ExecMode::InProcess,
        }
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Resolve a stage's declared inputs from current store state. A
    /// `NotFound` here is the precondition failure the CLI reports
    /// distinctly: the producing stage was never run or failed.
    fn resolve_inputs(
        &self,
        stage: &dyn Stage,
    ) -> Result<HashMap<ArtifactKind, Artifact>, StageError> {
        let mut inputs = HashMap::new();
        for &kind in stage.inputs() {
            let artifact = self.store.resolve_latest(kind, kind.default_pattern())?;
            inputs.insert(kind, artifact);
        }
        Ok(inputs)
    }

    /// Execute a single stage by zero-based index, resolving its inputs
    /// from the store. Used directly for resume and by isolated children.
    pub async fn run_one(
        &self,
        index: usize,
        params: &StageParams,
    ) -> Result<Vec<Artifact>, StageError> {
        let stage = &self.stages[index];
        info!("[PIPELINE] running stage: {}", stage.name());

        let ctx = StageContext {
            store: &self.store,
            inputs: self.resolve_inputs(stage.as_ref())?,
            params: params.clone(),
        };
        stage.run(&ctx).await
    }

    /// Execute every stage in listed order, halting on the first failure.
    pub async fn run_all(&self, params: &StageParams) -> PipelineRun {
        let names: Vec<&'static str> = self.stages.iter().map(|s| s.name()).collect();
        let mut run = PipelineRun::new(names);

        for index in 0..self.stages.len() {
            let name = self.stages[index].name();
            info!(
                "[PIPELINE] stage {}/{}: {}",
                index + 1,
                self.stages.len(),
                name
            );
            run.statuses[index] = StageStatus::Running;

            match self.invoke(index, params).await {
                Ok(()) => run.statuses[index] = StageStatus::Succeeded,
                Err(e) => {
                    error!("[PIPELINE] stage {} ({}) failed: {}", index + 1, name, e);
                    run.statuses[index] = StageStatus::Failed;
                    run.failure = Some(StageFailure {
                        index,
                        name,
                        error: e,
                    });
                    break;
                }
            }
        }
        run
    }

    async fn invoke(&self, index: usize, params: &StageParams) -> Result<(), StageError> {
        match self.mode {
            ExecMode::InProcess => self.run_one(index, params).await.map(|_| ()),
            ExecMode::Isolated => self.run_isolated(index, params).await,
        }
    }

    async fn run_isolated(&self, index: usize, params: &StageParams) -> Result<(), StageError> {
        let exe = std::env::current_exe()?;
        let mut cmd = Command::new(exe);
        cmd.arg("--data-dir")
            .arg(self.store.root())
            .arg("stage")
            .arg((index + 1).to_string())
            .arg("--images")
            .arg(params.image_count.to_string());
        // Dropping the child future on cancellation kills the process; the
        // artifacts it already persisted stay on disk for a resumed run.
        cmd.kill_on_drop(true);

        let captured = process::run_captured(cmd).await?;
        if captured.status != 0 {
            return Err(StageError::Process {
                status: captured.status,
                tail: captured.tail_text(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Test stage that persists a fixed artifact through the store.
    struct ProduceStage {
        name: &'static str,
        needs: &'static [ArtifactKind],
        kind: ArtifactKind,
        file: &'static str,
    }

    #[async_trait]
    impl Stage for ProduceStage {
        fn name(&self) -> &'static str {
            self.name
        }
        fn inputs(&self) -> &'static [ArtifactKind] {
            self.needs
        }
        fn output(&self) -> ArtifactKind {
            self.kind
        }
        async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
            for &kind in self.needs {
                // Inputs must have been resolved by the executor.
                ctx.input(kind)?;
            }
            Ok(vec![ctx.store.persist(self.kind, self.file, b"out")?])
        }
    }

    struct FailStage;

    #[async_trait]
    impl Stage for FailStage {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn output(&self) -> ArtifactKind {
            ArtifactKind::Transcript
        }
        async fn run(&self, _ctx: &StageContext<'_>) -> Result<Vec<Artifact>, StageError> {
            Err(StageError::Collaborator("boom".to_string()))
        }
    }

    fn script_stage() -> Box<dyn Stage> {
        Box::new(ProduceStage {
            name: "make-script",
            needs: &[],
            kind: ArtifactKind::Script,
            file: "idea.txt",
        })
    }

    fn audio_stage() -> Box<dyn Stage> {
        Box::new(ProduceStage {
            name: "make-audio",
            needs: &[ArtifactKind::Script],
            kind: ArtifactKind::Audio,
            file: "tts_output.mp3",
        })
    }

    #[tokio::test]
    async fn test_run_all_halts_on_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let stages: Vec<Box<dyn Stage>> = vec![
            script_stage(),
            audio_stage(),
            Box::new(FailStage),
            Box::new(ProduceStage {
                name: "never-runs",
                needs: &[],
                kind: ArtifactKind::ImageSet,
                file: "images.zip",
            }),
        ];
        let executor = Executor::new(store.clone(), stages);

        let run = executor.run_all(&StageParams::default()).await;

        assert!(!run.is_success());
        assert_eq!(run.status(0), StageStatus::Succeeded);
        assert_eq!(run.status(1), StageStatus::Succeeded);
        assert_eq!(run.status(2), StageStatus::Failed);
        assert_eq!(run.status(3), StageStatus::Pending);
        let failure = run.failure().unwrap();
        assert_eq!(failure.index, 2);
        assert_eq!(failure.name, "broken");

        // Artifacts from the stages before the failure survive.
        assert!(store.resolve_latest(ArtifactKind::Script, "*.txt").is_ok());
        assert!(store.resolve_latest(ArtifactKind::Audio, "*.mp3").is_ok());
        // The stage after the failure never wrote anything.
        assert!(store
            .resolve_latest(ArtifactKind::ImageSet, "images.zip")
            .is_err());
    }

    #[tokio::test]
    async fn test_run_one_reports_missing_precondition() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Executor::new(ArtifactStore::new(tmp.path()), vec![audio_stage()]);

        let err = executor
            .run_one(0, &StageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::NotFound(ArtifactKind::Script)));
    }

    #[tokio::test]
    async fn test_run_one_resumes_from_store_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        // Simulate an earlier run that already produced the script.
        store
            .persist(ArtifactKind::Script, "earlier.txt", b"narration")
            .unwrap();

        let executor = Executor::new(store.clone(), vec![script_stage(), audio_stage()]);
        let artifacts = executor
            .run_one(1, &StageParams::default())
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind, ArtifactKind::Audio);
    }
}
