// Spawn-and-capture helper for child processes (isolated stages, ffmpeg).
//
// Combined stdout/stderr is streamed into a bounded tail buffer so a noisy
// child cannot grow memory without limit; the tail becomes the diagnostic
// payload when the child exits nonzero.

use std::collections::VecDeque;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::StageError;

/// Lines of combined output retained for diagnostics.
const CAPTURE_LINES: usize = 200;

#[derive(Debug)]
pub struct Captured {
    pub status: i32,
    pub tail: Vec<String>,
}

impl Captured {
    pub fn tail_text(&self) -> String {
        self.tail.join("\n")
    }
}

/// Run a command to completion, capturing the tail of its combined output.
/// Returns `Ok` even on nonzero exit; callers decide how to map the status.
/// Stdin is left inherited so interactive child stages can still prompt.
pub async fn run_captured(mut cmd: Command) -> Result<Captured, StageError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr not captured"))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(CAPTURE_LINES);
    let mut out_done = false;
    let mut err_done = false;

    while !(out_done && err_done) {
        tokio::select! {
            res = out_lines.next_line(), if !out_done => {
                match res? {
                    Some(line) => push_bounded(&mut tail, line),
                    None => out_done = true,
                }
            }
            res = err_lines.next_line(), if !err_done => {
                match res? {
                    Some(line) => push_bounded(&mut tail, line),
                    None => err_done = true,
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok(Captured {
        status: status.code().unwrap_or(-1),
        tail: tail.into_iter().collect(),
    })
}

fn push_bounded(tail: &mut VecDeque<String>, line: String) {
    debug!("[PROC] {line}");
    if tail.len() == CAPTURE_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_combined_capture_and_exit_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let captured = run_captured(cmd).await.unwrap();
        assert_eq!(captured.status, 3);
        assert!(captured.tail.iter().any(|l| l == "out"));
        assert!(captured.tail.iter().any(|l| l == "err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_is_bounded() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "seq 1 500"]);
        let captured = run_captured(cmd).await.unwrap();
        assert_eq!(captured.status, 0);
        assert_eq!(captured.tail.len(), CAPTURE_LINES);
        assert_eq!(captured.tail.last().unwrap(), "500");
    }
}
