//! # Validate Subcommand
//!
//! Loads a schema document and validates one JSON or YAML input against it.
//! Prints the clean object on success and one `FAIL:` line per failing
//! field otherwise.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};

use swiss_schema::{HookRegistry, SchemaLoader, SchemaOptions, SchemaValidator, ValidationError};

/// Arguments for the `swiss validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema document (JSON or YAML).
    #[arg(long, value_name = "PATH")]
    pub schema: PathBuf,

    /// Input document. Read from stdin when omitted.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Drop undeclared top-level keys instead of reporting them.
    #[arg(long)]
    pub no_strict: bool,

    /// Run async checks after the synchronous pass.
    #[arg(long = "async")]
    pub run_async: bool,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 on success, 1 on validation failure. Operational
/// errors (unreadable files, bad schema documents) propagate.
pub async fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let mut schema = SchemaLoader::new(HookRegistry::with_builtins())
        .load_file(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    if args.no_strict {
        schema = schema.with_options(SchemaOptions { strict: false });
    }

    let input = match &args.input {
        Some(path) => read_document(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read input from stdin")?;
            parse_document(&text, None)?
        }
    };

    tracing::info!(fields = schema.fields().len(), strict = schema.is_strict(), "loaded schema");

    match check(&schema, &input, args.run_async).await {
        Ok(clean) => {
            let rendered = serde_json::to_string_pretty(&Value::Object(clean))
                .context("failed to render clean object")?;
            println!("{rendered}");
            Ok(0)
        }
        Err(err) => {
            for line in failure_lines(&err) {
                println!("{line}");
            }
            Ok(1)
        }
    }
}

/// Runs the synchronous pass, and the async pass too when `run_async` is set.
pub async fn check(
    schema: &SchemaValidator,
    input: &Value,
    run_async: bool,
) -> Result<Map<String, Value>, ValidationError> {
    if run_async {
        schema.validate_async(input).await
    } else {
        schema.validate_sync(input)
    }
}

/// One report line per failing field.
pub fn failure_lines(err: &ValidationError) -> Vec<String> {
    err.errors()
        .errors()
        .iter()
        .map(|e| {
            let path = if e.path.is_empty() { "(root)" } else { e.path.as_str() };
            format!("  FAIL: {path} [{}] {}", e.stage, e.message)
        })
        .collect()
}

fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&text, path.extension().and_then(|ext| ext.to_str()))
}

/// Parses JSON, or YAML when the extension says so. Without an extension
/// JSON is tried first.
fn parse_document(text: &str, extension: Option<&str>) -> Result<Value> {
    match extension {
        Some("yaml") | Some("yml") => serde_yaml::from_str(text).context("invalid YAML input"),
        Some(_) => serde_json::from_str(text).context("invalid JSON input"),
        None => serde_json::from_str(text)
            .or_else(|_| serde_yaml::from_str(text))
            .context("input is neither JSON nor YAML"),
    }
}
