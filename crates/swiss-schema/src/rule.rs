//! # Field Rules
//!
//! A [`FieldRule`] is the immutable description of one field: its type,
//! constraints and hooks. Rules are assembled with consuming builder
//! methods and become read-only once handed to a schema.
//!
//! Constraints that accept a custom message use [`Constraint`], the
//! pair form `(bound, message)`. A bare bound uses the default message.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use regex::Regex;
use serde_json::{Map, Value};

use crate::types::FieldType;

/// Transformation applied to a present value before any check.
pub type FilterFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Synchronous check: `Ok(true)` passes, `Ok(false)` fails with the
/// default message, `Err(msg)` fails with `msg`.
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>;

/// Asynchronous check with the same result contract as [`ValidateFn`].
pub type AsyncValidateFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<bool, String>> + Send + Sync>;

/// Decides whether a field is required, given the whole input object.
pub type RequiredPredicate = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

/// A bound or pattern with an optional custom error message.
#[derive(Debug, Clone)]
pub struct Constraint<T> {
    /// The bound or pattern.
    pub value: T,
    /// Message used instead of the default when the constraint fails.
    pub message: Option<String>,
}

impl<T> Constraint<T> {
    pub fn new(value: T) -> Self {
        Self { value, message: None }
    }

    pub fn with_message(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            message: Some(message.into()),
        }
    }
}

/// Whether a field must be present.
#[derive(Clone, Default)]
pub enum Requirement {
    /// Absent is fine; the field is left out of the clean object.
    #[default]
    Optional,
    /// Absent is an error.
    Required {
        /// Custom message for the required error.
        message: Option<String>,
    },
    /// Absent is an error when the predicate holds for the input object.
    When {
        predicate: RequiredPredicate,
        message: Option<String>,
    },
}

impl Requirement {
    /// Evaluates the requirement against the input object.
    pub fn applies(&self, input: &Map<String, Value>) -> bool {
        match self {
            Requirement::Optional => false,
            Requirement::Required { .. } => true,
            Requirement::When { predicate, .. } => predicate(input),
        }
    }

    /// Custom message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Requirement::Optional => None,
            Requirement::Required { message } | Requirement::When { message, .. } => {
                message.as_deref()
            }
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Optional => f.write_str("Optional"),
            Requirement::Required { message } => {
                f.debug_struct("Required").field("message", message).finish()
            }
            Requirement::When { message, .. } => f
                .debug_struct("When")
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}

/// Constraints and hooks for one schema field.
#[derive(Clone)]
pub struct FieldRule {
    name: Option<String>,
    field_type: FieldType,
    enum_values: Option<Vec<Value>>,
    required: Requirement,
    minlength: Option<Constraint<usize>>,
    maxlength: Option<Constraint<usize>>,
    regex: Option<Constraint<Regex>>,
    filter: Option<FilterFn>,
    validate: Option<ValidateFn>,
    validate_async: Option<AsyncValidateFn>,
}

impl FieldRule {
    /// Creates an optional field of the given type with no constraints.
    pub fn new(field_type: impl Into<FieldType>) -> Self {
        Self {
            name: None,
            field_type: field_type.into(),
            enum_values: None,
            required: Requirement::Optional,
            minlength: None,
            maxlength: None,
            regex: None,
            filter: None,
            validate: None,
            validate_async: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    /// Sets the field name. A schema rejects a rule whose name differs
    /// from the key it is declared under.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts the value to a closed set, compared by JSON equality.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = if required {
            Requirement::Required { message: None }
        } else {
            Requirement::Optional
        };
        self
    }

    /// Marks the field required with a custom message.
    pub fn required_with(mut self, message: impl Into<String>) -> Self {
        self.required = Requirement::Required {
            message: Some(message.into()),
        };
        self
    }

    /// Marks the field required when `predicate` holds for the input object.
    pub fn required_when<F>(mut self, predicate: F, message: Option<String>) -> Self
    where
        F: Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        self.required = Requirement::When {
            predicate: Arc::new(predicate),
            message,
        };
        self
    }

    pub fn minlength(mut self, min: usize) -> Self {
        self.minlength = Some(Constraint::new(min));
        self
    }

    pub fn minlength_with(mut self, min: usize, message: impl Into<String>) -> Self {
        self.minlength = Some(Constraint::with_message(min, message));
        self
    }

    pub fn maxlength(mut self, max: usize) -> Self {
        self.maxlength = Some(Constraint::new(max));
        self
    }

    pub fn maxlength_with(mut self, max: usize, message: impl Into<String>) -> Self {
        self.maxlength = Some(Constraint::with_message(max, message));
        self
    }

    pub fn regex(mut self, pattern: Regex) -> Self {
        self.regex = Some(Constraint::new(pattern));
        self
    }

    /// Regex constraint with a custom message. The message may use the
    /// `{{ value }}` and `{{ field }}` placeholders.
    pub fn regex_with(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.regex = Some(Constraint::with_message(pattern, message));
        self
    }

    /// Transformation run on the raw value; its output feeds every later stage.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(check));
        self
    }

    /// Async check run after the whole synchronous pass succeeds.
    pub fn validate_async<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, String>> + Send + 'static,
    {
        self.validate_async = Some(Arc::new(move |value| check(value).boxed()));
        self
    }

    pub(crate) fn set_filter(mut self, filter: FilterFn) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn set_validate(mut self, check: ValidateFn) -> Self {
        self.validate = Some(check);
        self
    }

    pub(crate) fn set_validate_async(mut self, check: AsyncValidateFn) -> Self {
        self.validate_async = Some(check);
        self
    }

    pub(crate) fn set_requirement(mut self, required: Requirement) -> Self {
        self.required = required;
        self
    }

    pub(crate) fn set_minlength(mut self, min: Constraint<usize>) -> Self {
        self.minlength = Some(min);
        self
    }

    pub(crate) fn set_maxlength(mut self, max: Constraint<usize>) -> Self {
        self.maxlength = Some(max);
        self
    }

    pub(crate) fn set_regex(mut self, pattern: Constraint<Regex>) -> Self {
        self.regex = Some(pattern);
        self
    }

    pub(crate) fn with_declared_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    // Read-only accessors.

    pub fn field_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        self.enum_values.as_deref()
    }

    pub fn requirement(&self) -> &Requirement {
        &self.required
    }

    pub fn min_length(&self) -> Option<&Constraint<usize>> {
        self.minlength.as_ref()
    }

    pub fn max_length(&self) -> Option<&Constraint<usize>> {
        self.maxlength.as_ref()
    }

    pub fn pattern(&self) -> Option<&Constraint<Regex>> {
        self.regex.as_ref()
    }

    pub(crate) fn filter_fn(&self) -> Option<&FilterFn> {
        self.filter.as_ref()
    }

    pub(crate) fn validate_fn(&self) -> Option<&ValidateFn> {
        self.validate.as_ref()
    }

    pub(crate) fn validate_async_fn(&self) -> Option<&AsyncValidateFn> {
        self.validate_async.as_ref()
    }

    /// True if this rule, or a nested schema under it, declares an async check.
    pub fn has_async_checks(&self) -> bool {
        self.validate_async.is_some()
            || self
                .field_type
                .as_schema()
                .is_some_and(|schema| schema.has_async_checks())
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("type", &self.field_type.type_name())
            .field("enum", &self.enum_values)
            .field("required", &self.required)
            .field("minlength", &self.minlength)
            .field("maxlength", &self.maxlength)
            .field("regex", &self.regex.as_ref().map(|c| c.value.as_str()))
            .field("filter", &self.filter.is_some())
            .field("validate", &self.validate.is_some())
            .field("validate_async", &self.validate_async.is_some())
            .finish()
    }
}
