//! External-process invocation.
//!
//! Every native compiler is driven the same way: spawn, drain stdout and
//! stderr to completion on two auxiliary threads, join them, then inspect the
//! exit status. The reader threads exist purely to avoid pipe-buffer deadlock
//! while the main thread blocks in `wait()`; there is no cancellation or
//! timeout, so a hung tool hangs the compile.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crate::toolchain::ToolError;

/// The drained output of one finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded for diagnostics.
    pub stderr: String,
}

/// Runs `command` to completion and returns its drained output.
///
/// The caller decides what a non-zero exit status means; this helper only
/// guarantees both pipes are fully drained before it returns.
pub fn run_tool(tool: &str, command: &mut Command) -> Result<ToolOutput, ToolError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| ToolError::Spawn {
        tool: tool.to_owned(),
        source,
    })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| ToolError::MalformedOutput {
        tool: tool.to_owned(),
        detail: "stdout pipe was not captured".to_owned(),
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| ToolError::MalformedOutput {
        tool: tool.to_owned(),
        detail: "stderr pipe was not captured".to_owned(),
    })?;

    let stdout_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).map(|_| buf)
    });
    let stderr_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).map(|_| buf)
    });

    let status = child.wait().map_err(|source| ToolError::Spawn {
        tool: tool.to_owned(),
        source,
    })?;

    let stdout = join_reader(tool, stdout_reader)?;
    let stderr_bytes = join_reader(tool, stderr_reader)?;
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}

fn join_reader(
    tool: &str,
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ToolError> {
    handle
        .join()
        .map_err(|_| ToolError::MalformedOutput {
            tool: tool.to_owned(),
            detail: "output reader thread panicked".to_owned(),
        })?
        .map_err(|e| ToolError::MalformedOutput {
            tool: tool.to_owned(),
            detail: format!("failed to drain output pipe: {e}"),
        })
}
