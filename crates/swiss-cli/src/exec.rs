//! # Exec Subcommand
//!
//! Runs a command through [`crate::process::exec`], echoing stdout as it
//! streams and stderr once the process exits.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{Map, Value};

use crate::process::{exec, ExecOptions};

/// Arguments for the `swiss exec` subcommand.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command line to run, split on whitespace.
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Option name appended as a `--kebab-case` flag. Repeatable.
    #[arg(long = "flag", value_name = "NAME")]
    pub flags: Vec<String>,

    /// Working directory for the child.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment entry. When any are given they replace the inherited environment.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Log command lines, stderr and exit status at info level.
    #[arg(long)]
    pub debug: bool,
}

impl ExecArgs {
    /// Builds process options from the parsed flags.
    pub fn options(&self) -> ExecOptions {
        let args: Map<String, Value> = self
            .flags
            .iter()
            .map(|name| (name.clone(), Value::Bool(true)))
            .collect();
        let env = (!self.env.is_empty())
            .then(|| self.env.iter().cloned().collect::<HashMap<_, _>>());
        ExecOptions {
            args,
            cwd: self.cwd.clone(),
            env,
            progress: None,
            debug: self.debug,
        }
    }
}

/// Execute the exec subcommand.
///
/// Returns the child's exit code, or 1 if it was terminated by a signal.
pub async fn run_exec(args: &ExecArgs) -> Result<u8> {
    let mut options = args.options();
    options.progress = Some(Arc::new(|chunk: &str| {
        let mut stdout = std::io::stdout().lock();
        // Echo failures (closed pipe) do not affect the child.
        let _ = stdout.write_all(chunk.as_bytes()).and_then(|()| stdout.flush());
    }));

    let output = exec(&args.command, options)
        .await
        .with_context(|| format!("failed to run '{}'", args.command))?;

    if !output.errors.is_empty() {
        eprint!("{}", output.errors);
    }

    Ok(match output.status {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => 1,
    })
}

fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    if key.is_empty() {
        bail!("empty environment key in '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_args(command: &str) -> ExecArgs {
        ExecArgs {
            command: command.to_string(),
            flags: Vec::new(),
            cwd: None,
            env: Vec::new(),
            debug: false,
        }
    }

    #[test]
    fn env_pairs_split_on_the_first_equals() {
        assert_eq!(parse_env_pair("A=b=c").unwrap(), ("A".into(), "b=c".into()));
        assert!(parse_env_pair("novalue").is_err());
        assert!(parse_env_pair("=x").is_err());
    }

    #[test]
    fn flags_become_truthy_options() {
        let args = ExecArgs {
            flags: vec!["dryRun".into(), "json".into()],
            ..exec_args("npm install")
        };
        let options = args.options();
        assert_eq!(options.args.get("dryRun"), Some(&Value::Bool(true)));
        assert!(options.env.is_none());
    }

    #[test]
    fn env_entries_replace_the_environment() {
        let args = ExecArgs {
            env: vec![("HOME".into(), "/tmp".into())],
            ..exec_args("env")
        };
        assert_eq!(args.options().env.unwrap().get("HOME").map(String::as_str), Some("/tmp"));
    }

    #[tokio::test]
    async fn exit_status_becomes_the_exit_code() {
        assert_eq!(run_exec(&exec_args("true")).await.unwrap(), 0);
        assert_eq!(run_exec(&exec_args("false")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn spawn_failure_is_an_operational_error() {
        assert!(run_exec(&exec_args("swiss-no-such-program-here")).await.is_err());
    }
}
