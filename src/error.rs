// TL;DR Studio - Error Taxonomy
//
// Every failure a stage can raise maps onto one of these variants. The
// executor never swallows them; the CLI maps NotFound to its own
// "precondition failed" exit code so a user knows to run the missing
// upstream stage rather than retry blindly.

use crate::store::ArtifactKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    /// A required upstream artifact is missing. Run the producing stage first.
    #[error("no {0} artifact found; run the producing stage first")]
    NotFound(ArtifactKind),

    /// Persistence or read failure. Fatal to the current stage, retryable
    /// once the underlying cause (disk, permissions) is fixed.
    #[error("artifact store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// External generative service failed, timed out, or returned
    /// empty/malformed data.
    #[error("collaborator call failed: {0}")]
    Collaborator(String),

    /// Inputs that cannot produce a valid output (e.g. zero images to
    /// assemble). Not retryable without changing the inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An isolated child process exited nonzero. The tail of its combined
    /// output is the diagnostic payload.
    #[error("child process exited with status {status}; last output:\n{tail}")]
    Process { status: i32, tail: String },
}
