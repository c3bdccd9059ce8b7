//! # Error Types
//!
//! Construction errors and validation errors are kept apart:
//!
//! - [`SchemaError`] is raised while declaring a schema. It is fatal to the
//!   caller and never aggregated.
//! - [`FieldError`] describes one failing field. A field stops at its first
//!   failing stage, so there is at most one per field path.
//! - [`ValidationError`] is the only error a validation call returns. It
//!   wraps every [`FieldError`] produced by that call, in field order.

use std::fmt;

use thiserror::Error;

/// Error raised while constructing a field rule or schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A field descriptor was not a mapping.
    #[error("invalid field '{field}': descriptor must be a mapping, found {found}")]
    NotAMapping {
        /// Field name the descriptor was declared under.
        field: String,
        /// JSON type name of the offending descriptor.
        found: &'static str,
    },

    /// A field descriptor used a key outside the recognized set.
    #[error("invalid field '{field}': unrecognized property '{key}'")]
    UnrecognizedKey {
        /// Field name the descriptor was declared under.
        field: String,
        /// The unrecognized key.
        key: String,
    },

    /// A field descriptor has no `type`.
    #[error("invalid field '{field}': missing 'type'")]
    MissingType {
        /// Field name.
        field: String,
    },

    /// Two fields in one schema share a name.
    #[error("duplicate field '{field}'")]
    DuplicateField {
        /// The repeated field name.
        field: String,
    },

    /// A descriptor's `name` disagrees with the key it is declared under.
    #[error("field declared as '{field}' names itself '{name}'")]
    NameMismatch {
        /// Key the descriptor was declared under.
        field: String,
        /// The `name` property inside the descriptor.
        name: String,
    },

    /// A property had the wrong shape (e.g. a malformed pair form).
    #[error("invalid field '{field}': property '{key}' {reason}")]
    InvalidProperty {
        /// Field name.
        field: String,
        /// Property key.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A `regex` property did not compile.
    #[error("invalid field '{field}': bad pattern: {source}")]
    InvalidPattern {
        /// Field name.
        field: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A hook or custom type name was not found in the registry.
    #[error("invalid field '{field}': unknown {kind} '{name}'")]
    UnknownHook {
        /// Field name.
        field: String,
        /// Hook kind (`filter`, `validate`, `validateAsync`, `type`).
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// The schema document itself was malformed.
    #[error("malformed schema document: {0}")]
    Document(String),

    /// JSON parse failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse failure.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error reading a schema document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Re-attributes a construction error raised inside a nested schema
    /// to its dotted path under `parent`.
    pub(crate) fn nested_under(self, parent: &str) -> Self {
        let nest = |field: String| join_path(parent, &field);
        match self {
            SchemaError::NotAMapping { field, found } => SchemaError::NotAMapping {
                field: nest(field),
                found,
            },
            SchemaError::UnrecognizedKey { field, key } => SchemaError::UnrecognizedKey {
                field: nest(field),
                key,
            },
            SchemaError::MissingType { field } => SchemaError::MissingType { field: nest(field) },
            SchemaError::DuplicateField { field } => SchemaError::DuplicateField {
                field: nest(field),
            },
            SchemaError::NameMismatch { field, name } => SchemaError::NameMismatch {
                field: nest(field),
                name,
            },
            SchemaError::InvalidProperty { field, key, reason } => SchemaError::InvalidProperty {
                field: nest(field),
                key,
                reason,
            },
            SchemaError::InvalidPattern { field, source } => SchemaError::InvalidPattern {
                field: nest(field),
                source,
            },
            SchemaError::UnknownHook { field, kind, name } => SchemaError::UnknownHook {
                field: nest(field),
                kind,
                name,
            },
            SchemaError::Document(reason) => {
                SchemaError::Document(format!("nested schema '{parent}': {reason}"))
            }
            other @ (SchemaError::Json(_) | SchemaError::Yaml(_) | SchemaError::Io(_)) => other,
        }
    }
}

/// Pipeline stage at which a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The `filter` hook returned an error.
    Filter,
    /// The working value did not match the declared type.
    Type,
    /// The working value was not one of the enumerated values.
    Enum,
    /// A required field was absent.
    Required,
    /// The value was shorter than `minlength`.
    MinLength,
    /// The value was longer than `maxlength`.
    MaxLength,
    /// The stringified value did not match `regex`.
    Regex,
    /// The synchronous `validate` hook rejected the value.
    Validate,
    /// The input carried a key the strict schema does not declare.
    Unknown,
    /// The `validate_async` hook rejected the value.
    Async,
}

impl Stage {
    /// Stable lowercase name used in messages and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Filter => "filter",
            Stage::Type => "type",
            Stage::Enum => "enum",
            Stage::Required => "required",
            Stage::MinLength => "minlength",
            Stage::MaxLength => "maxlength",
            Stage::Regex => "regex",
            Stage::Validate => "validate",
            Stage::Unknown => "unknown",
            Stage::Async => "validateAsync",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the field (`address.city` for nested fields).
    pub path: String,
    /// Stage that rejected the value.
    pub stage: Stage,
    /// Default or custom message.
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage,
            message: message.into(),
        }
    }

    /// Re-attributes this error under a parent field.
    pub(crate) fn nested_under(mut self, parent: &str) -> Self {
        self.path = join_path(parent, &self.path);
        self
    }

    /// True for errors raised by the async stage.
    pub fn is_async(&self) -> bool {
        self.stage == Stage::Async
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root) [{}]: {}", self.stage, self.message)
        } else {
            write!(f, "  {} [{}]: {}", self.path, self.stage, self.message)
        }
    }
}

/// Ordered collection of field failures from one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Returns the number of failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no failures.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all failures.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the failure for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path == path)
    }

    /// Returns the failing field paths in order.
    pub fn paths(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.path.as_str()).collect()
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<FieldError> {
        self.errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Aggregated error returned by `validate_sync` and `validate_async`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more fields failed the synchronous pipeline.
    #[error("validation failed for {n} field(s):\n{0}", n = .0.len())]
    Sync(FieldErrors),

    /// The synchronous pipeline passed but async checks failed.
    #[error("async validation failed for {n} field(s):\n{0}", n = .0.len())]
    Async(FieldErrors),
}

impl ValidationError {
    /// The wrapped field failures.
    pub fn errors(&self) -> &FieldErrors {
        match self {
            ValidationError::Sync(e) | ValidationError::Async(e) => e,
        }
    }

    /// Consumes self and returns the wrapped field failures.
    pub fn into_errors(self) -> FieldErrors {
        match self {
            ValidationError::Sync(e) | ValidationError::Async(e) => e,
        }
    }

    /// True when produced by the async stage.
    pub fn is_async(&self) -> bool {
        matches!(self, ValidationError::Async(_))
    }
}

/// Joins a parent path and a child field name with a dot.
pub(crate) fn join_path(prefix: &str, field: &str) -> String {
    match (prefix.is_empty(), field.is_empty()) {
        (true, _) => field.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{field}"),
    }
}
