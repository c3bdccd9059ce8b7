//! Option-to-flag formatting for child processes.

use heck::ToKebabCase;
use serde_json::{Map, Value};

/// Converts an options map into command-line flags.
///
/// Every key whose value is truthy becomes `--kebab-case-key`, in map
/// order. `false`, `null`, zero and the empty string are falsy; arrays
/// and objects are truthy even when empty.
pub fn map_to_flags(options: &Map<String, Value>) -> Vec<String> {
    options
        .iter()
        .filter(|(_, value)| is_truthy(value))
        .map(|(key, _)| format!("--{}", key.to_kebab_case()))
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
