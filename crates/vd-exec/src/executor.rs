use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};
use vd_core::DiagnosticsError;

/// Captured outcome of one spawned command.
///
/// A non-zero exit code is data, not an executor failure; the caller decides
/// what it means (an unreachable ping target is a legitimate result).
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub command: String,
    /// False when the command was killed for exceeding its time bound.
    pub duration_ok: bool,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.duration_ok && self.exit_code == 0
    }
}

/// Runs one external command per call, directly from an argument vector.
/// No shell is involved at any point.
pub struct Executor {
    timeout: Duration,
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn run(&self, argv: &[String]) -> Result<ExecutionResult, DiagnosticsError> {
        let (program, args) = argv
            .split_first()
            .ok_or(DiagnosticsError::InvalidParameters)?;
        let command_line = argv.join(" ");

        debug!(command = %command_line, "spawning diagnostic command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(ExecutionResult {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    command: command_line,
                    duration_ok: true,
                })
            }
            Err(_) => {
                // Dropping the wait future kills the child (kill_on_drop).
                warn!(command = %command_line, timeout = ?self.timeout, "command timed out");
                Ok(ExecutionResult {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: String::new(),
                    command: command_line,
                    duration_ok: false,
                })
            }
        }
    }
}
