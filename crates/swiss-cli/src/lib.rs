//! # swiss-cli — Command-Line Helpers for swiss-schema
//!
//! ## Subcommands
//!
//! - `validate`: validate a JSON/YAML document against a schema document
//! - `exec`: run a command with options appended as flags
//!
//! ## Library Surface
//!
//! - [`args::map_to_flags`] formats an options map as `--kebab-case` flags.
//! - [`process::exec`] spawns a child process and collects its output.
//!
//! Argument parsing lives in the subcommand modules; the work itself is
//! delegated to `swiss-schema` and [`process`].

pub mod args;
pub mod exec;
pub mod process;
pub mod validate;
