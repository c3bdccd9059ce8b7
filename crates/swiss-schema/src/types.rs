//! # Type Descriptors
//!
//! A closed set of type descriptors, matched by variant. Values are
//! `serde_json::Value`s, so every check inspects the JSON shape directly.
//!
//! - `string`: JSON string
//! - `number`: JSON number (integer or float)
//! - `boolean`: JSON boolean
//! - `date`: string holding an RFC 3339 date-time or a `YYYY-MM-DD` date
//! - `array`: JSON array
//! - nested schema: JSON object validated recursively
//! - custom: named predicate

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde_json::{Number, Value};

use crate::validate::SchemaValidator;

/// Predicate used by [`FieldType::Custom`].
pub type TypePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A user-defined type: a name for messages and a predicate.
#[derive(Clone)]
pub struct CustomType {
    name: String,
    predicate: TypePredicate,
}

impl CustomType {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Name used in type mismatch messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the predicate.
    pub fn matches(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Type descriptor of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer or floating point number
    Number,
    /// Boolean
    Boolean,
    /// Date or date-time string
    Date,
    /// Ordered sequence of arbitrary values
    Array,
    /// Sub-object validated against its own schema
    Schema(Arc<SchemaValidator>),
    /// User-defined predicate
    Custom(CustomType),
}

impl FieldType {
    /// Shorthand for a custom type.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        FieldType::Custom(CustomType::new(name, predicate))
    }

    /// Resolves a built-in type name (`string`, `number`, `boolean`, `date`, `array`).
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "array" => Some(FieldType::Array),
            _ => None,
        }
    }

    /// Returns the type name for error messages.
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Schema(_) => "object",
            FieldType::Custom(custom) => custom.name(),
        }
    }

    /// Returns the nested schema, if this is a schema type.
    pub fn as_schema(&self) -> Option<&SchemaValidator> {
        match self {
            FieldType::Schema(schema) => Some(schema.as_ref()),
            _ => None,
        }
    }

    /// Checks a value against a non-schema type.
    ///
    /// Nested schemas are validated by the pipeline; for them this only
    /// confirms the value is an object.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value.as_str().is_some_and(is_date),
            FieldType::Array => value.is_array(),
            FieldType::Schema(_) => value.is_object(),
            FieldType::Custom(custom) => custom.matches(value),
        }
    }
}

impl From<SchemaValidator> for FieldType {
    fn from(schema: SchemaValidator) -> Self {
        FieldType::Schema(Arc::new(schema))
    }
}

impl From<Arc<SchemaValidator>> for FieldType {
    fn from(schema: Arc<SchemaValidator>) -> Self {
        FieldType::Schema(schema)
    }
}

impl From<CustomType> for FieldType {
    fn from(custom: CustomType) -> Self {
        FieldType::Custom(custom)
    }
}

/// True if `s` is an RFC 3339 date-time or a calendar date.
fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Returns the JSON type name of a value for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Length of a length-bearing value: strings count Unicode scalar
/// values, arrays count elements. Everything else has no length.
pub fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Equality used by `enum`: numbers compare by value, so `2` equals
/// `2.0`. Every other kind compares structurally.
pub fn strictly_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => same_number(x, y),
        _ => a == b,
    }
}

fn same_number(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Renders a value for regex matching and message templates.
///
/// Strings are used verbatim; everything else uses its JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
