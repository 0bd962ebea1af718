//! # Code Runner
//!
//! Runs participant code and terminal commands as plain subprocesses.
//!
//! - One fresh temp directory per run, removed afterwards
//! - Environment cleared except `PATH`, `HOME` points at the run directory
//! - Wall clock timeout, the process is killed when it expires
//! - stdout/stderr are read up to the byte limit, the rest is drained and dropped
//!
//! This is an input filter plus a timeout, not a sandbox.
use std::{
    env,
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use records::{language::Language, workspace::FileEntry};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    time::timeout,
};
use tracing::{debug, warn};

pub const MAX_SOURCE_BYTES: usize = 64 * 1024;
pub const TERMINAL_COMMANDS: &[&str] = &[
    "ls", "cat", "pwd", "echo", "head", "tail", "wc", "grep", "python3", "node", "ruby",
];
const FORBIDDEN_CHARACTERS: &[char] = &[
    ';', '&', '|', '>', '<', '`', '$', '\\', '(', ')', '{', '}', '\n', '\r',
];

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0} is not available on this server")]
    MissingInterpreter(String),

    #[error("Process error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub truncated: bool,
    pub duration_ms: u64,
}

pub struct CodeRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buffer = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buffer).await?;

    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buffer, dropped > 0))
}

/// Paths may also hide inside flags: `-f/etc/passwd`, `--file=/etc/passwd`.
fn leaves_workspace(arg: &str) -> bool {
    let absolute = |path: &str| path.starts_with('/') || path.starts_with('~');

    if arg.contains("..") || absolute(arg) || arg.contains("=/") || arg.contains("=~") {
        return true;
    }

    match arg.strip_prefix("--") {
        Some(long) => long.split_once('=').is_some_and(|(_, value)| absolute(value)),
        None => arg.starts_with('-') && (arg.contains('/') || arg.contains('~')),
    }
}

/// Splits a terminal line into program and arguments, or explains why it is refused.
pub fn check_command(line: &str) -> Result<Vec<String>, RunnerError> {
    if let Some(c) = line.chars().find(|c| FORBIDDEN_CHARACTERS.contains(c)) {
        return Err(RunnerError::Rejected(format!(
            "character '{}' is not allowed",
            c.escape_default()
        )));
    }

    let parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let Some(program) = parts.first() else {
        return Err(RunnerError::Rejected("empty command".into()));
    };

    if !TERMINAL_COMMANDS.contains(&program.as_str()) {
        return Err(RunnerError::Rejected(format!(
            "command '{program}' is not allowed"
        )));
    }

    if let Some(arg) = parts[1..].iter().find(|arg| leaves_workspace(arg)) {
        return Err(RunnerError::Rejected(format!(
            "argument '{arg}' leaves the workspace"
        )));
    }

    Ok(parts)
}

impl CodeRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    pub async fn execute(
        &self,
        language: Language,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, RunnerError> {
        if code.len() > MAX_SOURCE_BYTES {
            return Err(RunnerError::Rejected(format!(
                "source exceeds {MAX_SOURCE_BYTES} bytes"
            )));
        }

        let (program, file_name) = language.program();
        let dir = TempDir::new()?;
        fs::write(dir.path().join(file_name), code).await?;

        self.run(program, &[file_name.to_string()], dir.path(), stdin)
            .await
    }

    pub async fn run_terminal(
        &self,
        line: &str,
        files: &[FileEntry],
    ) -> Result<ExecutionResult, RunnerError> {
        let parts = check_command(line)?;

        let dir = TempDir::new()?;
        for file in files {
            let path = dir.path().join(&file.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, &file.content).await?;
        }

        self.run(&parts[0], &parts[1..], dir.path(), "").await
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        stdin: &str,
    ) -> Result<ExecutionResult, RunnerError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .env_clear()
            .env("PATH", env::var("PATH").unwrap_or_default())
            .env("HOME", dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RunnerError::MissingInterpreter(program.to_string()),
            _ => RunnerError::Io(e),
        })?;
        debug!("Spawned {program} in {}", dir.display());

        if let Some(mut handle) = child.stdin.take() {
            let input = stdin.as_bytes().to_vec();
            tokio::spawn(async move {
                let _ = handle.write_all(&input).await;
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Rejected("stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::Rejected("stderr unavailable".into()))?;

        let limit = self.max_output_bytes;
        let outcome = timeout(self.timeout, async {
            tokio::join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                child.wait()
            )
        })
        .await;

        let duration_ms = started.elapsed().as_millis() as u64;

        let Ok((stdout, stderr, status)) = outcome else {
            warn!("{program} timed out after {}ms", self.timeout.as_millis());
            let _ = child.kill().await;

            return Ok(ExecutionResult {
                stdout: String::new(),
                stderr: format!("timed out after {}ms", self.timeout.as_millis()),
                exit_code: None,
                timed_out: true,
                truncated: false,
                duration_ms,
            });
        };

        let (stdout, stdout_truncated) = stdout?;
        let (stderr, stderr_truncated) = stderr?;
        let status = status?;

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            timed_out: false,
            truncated: stdout_truncated || stderr_truncated,
            duration_ms,
        })
    }
}
