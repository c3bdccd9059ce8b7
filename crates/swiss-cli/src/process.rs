//! # Process Execution
//!
//! Runs a child process, streaming stdout chunks to a progress callback
//! and collecting both output streams.
//!
//! A process that starts and exits always resolves to [`ExecOutput`],
//! whatever its exit status. Only a process that could not be started
//! (or whose pipes broke) produces an [`ExecError`].

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::args::map_to_flags;

/// Callback receiving each stdout chunk as it arrives.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for [`exec`].
#[derive(Clone, Default)]
pub struct ExecOptions {
    /// Converted to flags with [`map_to_flags`] and appended to the command.
    pub args: Map<String, Value>,
    /// Working directory. Defaults to the current directory.
    pub cwd: Option<PathBuf>,
    /// Replaces the child's environment when set. Otherwise inherited.
    pub env: Option<HashMap<String, String>>,
    pub progress: Option<ProgressFn>,
    /// Log command lines, stderr and exit results at `info` instead of `trace`.
    pub debug: bool,
}

impl fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecOptions")
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env", &self.env.as_ref().map(|env| env.len()))
            .field("progress", &self.progress.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

/// Collected output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Everything written to stdout. Chunks are concatenated exactly as
    /// read; no separator is inserted between them, so `result` is the
    /// child's byte stream decoded as UTF-8.
    pub result: String,
    /// Everything written to stderr, concatenated the same way.
    pub errors: String,
    /// Exit code, or `None` if the process was killed by a signal.
    pub status: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Failure to run a process to completion.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
        /// Stderr collected before the failure.
        errors: String,
    },
}

impl ExecError {
    /// Stderr collected before the failure, if any.
    pub fn errors(&self) -> &str {
        match self {
            ExecError::Io { errors, .. } => errors,
            ExecError::EmptyCommand | ExecError::Spawn { .. } => "",
        }
    }
}

/// Splits `command` on whitespace and appends the flags built from `args`.
pub fn command_line(command: &str, args: &Map<String, Value>) -> Vec<String> {
    command
        .split_whitespace()
        .map(str::to_string)
        .chain(map_to_flags(args))
        .filter(|token| !token.is_empty())
        .collect()
}

macro_rules! log_at {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::info!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Runs `command` to completion.
///
/// # Errors
///
/// Returns [`ExecError::EmptyCommand`] when the command line has no
/// tokens, [`ExecError::Spawn`] when the program cannot be started, and
/// [`ExecError::Io`] when reading its output or waiting on it fails.
pub async fn exec(command: &str, options: ExecOptions) -> Result<ExecOutput, ExecError> {
    let tokens = command_line(command, &options.args);
    let (program, rest) = tokens.split_first().ok_or(ExecError::EmptyCommand)?;
    let debug = options.debug;

    log_at!(debug, command = %tokens.join(" "), "spawning process");

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    if let Some(env) = &options.env {
        cmd.env_clear().envs(env);
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.clone(),
        source,
    })?;

    let progress = options.progress.clone();
    let mut result = String::new();
    let mut errors = String::new();
    let (out, err) = tokio::join!(
        drain(child.stdout.take(), &mut result, |chunk| {
            if let Some(progress) = &progress {
                progress(chunk);
            }
        }),
        drain(child.stderr.take(), &mut errors, |chunk| {
            log_at!(debug, stderr = chunk, "process stderr");
        }),
    );

    let io_error = |source| ExecError::Io {
        program: program.clone(),
        source,
        errors: errors.clone(),
    };
    out.map_err(io_error)?;
    err.map_err(io_error)?;
    let status = child.wait().await.map_err(io_error)?;

    log_at!(debug, program = %program, status = ?status.code(), "process exited");

    Ok(ExecOutput {
        result,
        errors,
        status: status.code(),
    })
}

/// Reads `reader` to the end, passing each decoded chunk to `on_chunk`
/// and appending it to `buf`. Multi-byte characters split across reads
/// are held back until complete.
async fn drain<R, F>(reader: Option<R>, buf: &mut String, mut on_chunk: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut block = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut block).await?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&block[..n]);

        let complete = match std::str::from_utf8(&pending) {
            Ok(_) => pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => pending.len(),
        };
        if complete == 0 {
            continue;
        }
        let rest = pending.split_off(complete);
        let text = String::from_utf8_lossy(&pending).into_owned();
        pending = rest;
        on_chunk(&text);
        buf.push_str(&text);
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        on_chunk(&text);
        buf.push_str(&text);
    }
    Ok(())
}
