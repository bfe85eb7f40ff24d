// TL;DR Studio - CLI Entry Point
//
// `all` runs every stage in order; `stage <n>` runs a single stage by its
// 1-indexed position, resolving inputs from whatever earlier runs left in
// the store. Exit codes: 0 success, 2 usage error, 3 missing upstream
// artifact (run the producing stage first), 1 anything else.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{error, info};

use tldr_studio::collab::ApiConfig;
use tldr_studio::error::StageError;
use tldr_studio::pipeline::{ExecMode, Executor};
use tldr_studio::stages::{self, StageParams, StdinChooser};
use tldr_studio::store::ArtifactStore;

const EXIT_USAGE: u8 = 2;
const EXIT_PRECONDITION: u8 = 3;

#[derive(Parser)]
#[command(name = "tldr-studio")]
#[command(about = "Automated faceless narrated-video production pipeline", long_about = None)]
struct Cli {
    /// Root directory for pipeline artifacts
    #[arg(long, env = "STUDIO_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Run each stage as an isolated child process
    #[arg(long)]
    isolated: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage in order
    All {
        /// Number of storyboard images to generate
        #[arg(long, default_value_t = 5)]
        images: usize,
    },
    /// Run a single stage by position (1-indexed)
    Stage {
        n: usize,
        /// Number of storyboard images to generate
        #[arg(long, default_value_t = 5)]
        images: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let api = ApiConfig::from_env();
    let store = ArtifactStore::new(&cli.data_dir);
    let chooser = Arc::new(StdinChooser);
    let mode = if cli.isolated {
        ExecMode::Isolated
    } else {
        ExecMode::InProcess
    };
    let executor = Executor::new(store, stages::catalogue(&api, chooser)).with_mode(mode);

    match cli.command {
        Commands::All { images } => {
            let params = StageParams {
                image_count: images,
            };
            let run = executor.run_all(&params).await;
            match run.failure() {
                None => {
                    info!("[STUDIO] pipeline complete");
                    ExitCode::SUCCESS
                }
                Some(failure) => {
                    error!(
                        "[STUDIO] halted at stage {} ({}): {}",
                        failure.index + 1,
                        failure.name,
                        failure.error
                    );
                    exit_for(&failure.error)
                }
            }
        }
        Commands::Stage { n, images } => {
            if n == 0 || n > executor.stage_count() {
                error!(
                    "[STUDIO] invalid stage number {} (expected 1-{})",
                    n,
                    executor.stage_count()
                );
                return ExitCode::from(EXIT_USAGE);
            }
            let params = StageParams {
                image_count: images,
            };
            match executor.run_one(n - 1, &params).await {
                Ok(artifacts) => {
                    for artifact in &artifacts {
                        info!("[STUDIO] produced {}: {:?}", artifact.kind, artifact.location);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("[STUDIO] stage {n} failed: {e}");
                    exit_for(&e)
                }
            }
        }
    }
}

fn exit_for(err: &StageError) -> ExitCode {
    match err {
        StageError::NotFound(_) => ExitCode::from(EXIT_PRECONDITION),
        _ => ExitCode::FAILURE,
    }
}
