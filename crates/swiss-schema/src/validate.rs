//! # Schema Validation
//!
//! [`SchemaValidator`] holds an ordered set of field rules and validates
//! candidate objects against them.
//!
//! ## Aggregation
//!
//! Each field stops at its first failing stage, but every declared field
//! is evaluated once per call. All failures come back together in one
//! [`ValidationError`] so callers can report every problem at once.
//!
//! ## Strict Mode
//!
//! With `strict` set (the default), any input key the schema does not
//! declare is reported as an `unknown` field error. Without it, extra
//! keys are dropped from the clean object silently.
//!
//! ## Thread Safety
//!
//! `SchemaValidator` is `Send + Sync` and holds no per-call state. The
//! clean object and error list live on the stack of each call.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, FieldErrors, SchemaError, Stage, ValidationError};
use crate::pipeline::evaluate_field;
use crate::rule::FieldRule;
use crate::types::{json_type_name, FieldType};

/// Options bag accepted at schema construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Reject input keys the schema does not declare.
    pub strict: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Validates objects against an ordered mapping of field name → [`FieldRule`].
///
/// Cloning shares the declared rules.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    /// Declared fields in declaration order.
    fields: Arc<[(String, FieldRule)]>,
    strict: bool,
}

impl SchemaValidator {
    /// Create a validator from `(name, rule)` pairs in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateField` if a name repeats, and
    /// `SchemaError::NameMismatch` if a rule names itself differently from
    /// the key it is declared under.
    pub fn new<I, K>(fields: I, options: SchemaOptions) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, FieldRule)>,
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut declared = Vec::new();

        for (name, rule) in fields {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateField { field: name });
            }
            if let Some(own) = rule.field_name() {
                if own != name {
                    return Err(SchemaError::NameMismatch {
                        field: name,
                        name: own.to_string(),
                    });
                }
            }
            let rule = rule.with_declared_name(&name);
            declared.push((name, rule));
        }

        Ok(Self {
            fields: declared.into(),
            strict: options.strict,
        })
    }

    /// Start declaring a schema field by field.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Declared field names, in declaration order.
    pub fn fields(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up the rule for a declared field.
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, rule)| rule)
    }

    pub(crate) fn rules(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Replaces the top-level options. Nested schemas keep their own.
    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.strict = options.strict;
        self
    }

    /// This schema as a field type, for use as a nested schema. The
    /// returned type shares this schema's rules.
    pub fn schema_type(&self) -> FieldType {
        FieldType::Schema(Arc::new(self.clone()))
    }

    /// Wraps this schema as a field type, for use as a nested schema.
    pub fn into_type(self) -> FieldType {
        FieldType::from(self)
    }

    /// True if any field, at any nesting depth, declares an async check.
    pub fn has_async_checks(&self) -> bool {
        self.fields.iter().any(|(_, rule)| rule.has_async_checks())
    }

    /// Runs the synchronous pipeline on every declared field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Sync` listing every failing field.
    pub fn validate_sync(&self, input: &Value) -> Result<Map<String, Value>, ValidationError> {
        tracing::debug!(
            fields = self.fields.len(),
            strict = self.strict,
            "validating object"
        );

        match self.validate_value(input) {
            Ok(clean) => {
                tracing::debug!(fields = clean.len(), "validation passed");
                Ok(clean)
            }
            Err(errors) => {
                tracing::debug!(errors = errors.len(), "validation failed");
                Err(ValidationError::Sync(FieldErrors::new(errors)))
            }
        }
    }

    /// Validates `input` and returns the clean object or the raw error list.
    /// Nested schemas call this directly so their errors can be re-attributed.
    pub(crate) fn validate_value(
        &self,
        input: &Value,
    ) -> Result<Map<String, Value>, Vec<FieldError>> {
        let Some(object) = input.as_object() else {
            return Err(vec![FieldError::new(
                "",
                Stage::Type,
                format!("expected object, found {}", json_type_name(input)),
            )]);
        };

        let mut clean = Map::new();
        let mut errors = Vec::new();

        for (name, rule) in self.fields.iter() {
            match evaluate_field(name, rule, object) {
                Ok(Some(value)) => {
                    clean.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(field_errors) => errors.extend(field_errors),
            }
        }

        if self.strict {
            for key in object.keys() {
                if self.rule(key).is_none() {
                    tracing::trace!(field = %key, "undeclared field");
                    errors.push(FieldError::new(
                        key.as_str(),
                        Stage::Unknown,
                        format!("{key} is not declared in the schema"),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(clean)
        } else {
            Err(errors)
        }
    }
}

/// Incremental schema declaration.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldRule)>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// # Errors
    ///
    /// See [`SchemaValidator::new`].
    pub fn build(self) -> Result<SchemaValidator, SchemaError> {
        SchemaValidator::new(self.fields, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> SchemaValidator {
        SchemaValidator::builder()
            .field("name", FieldRule::string().required(true))
            .field("age", FieldRule::number())
            .field("active", FieldRule::boolean().required(true))
            .build()
            .unwrap()
    }

    #[test]
    fn fields_keep_declaration_order() {
        assert_eq!(user_schema().fields(), vec!["name", "age", "active"]);
    }

    #[test]
    fn strict_is_the_default() {
        assert!(user_schema().is_strict());
        assert!(SchemaOptions::default().strict);
    }

    #[test]
    fn valid_object_returns_clean_copy() {
        let clean = user_schema()
            .validate_sync(&json!({"name": "Alice", "age": 30, "active": true}))
            .unwrap();
        assert_eq!(
            Value::Object(clean),
            json!({"name": "Alice", "age": 30, "active": true})
        );
    }

    #[test]
    fn optional_absent_field_is_omitted() {
        let clean = user_schema()
            .validate_sync(&json!({"name": "Alice", "active": false}))
            .unwrap();
        assert!(!clean.contains_key("age"));
        assert_eq!(clean.len(), 2);
    }

    #[test]
    fn every_failing_field_is_reported() {
        let err = user_schema()
            .validate_sync(&json!({"age": "thirty", "extra": 1}))
            .unwrap_err();
        assert!(!err.is_async());
        assert_eq!(err.errors().paths(), vec!["name", "age", "active", "extra"]);
        assert_eq!(err.errors().get("extra").map(|e| e.stage), Some(Stage::Unknown));
    }

    #[test]
    fn clean_object_follows_schema_order() {
        let clean = user_schema()
            .validate_sync(&json!({"active": true, "age": 1, "name": "A"}))
            .unwrap();
        let keys: Vec<&str> = clean.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "active"]);
    }

    #[test]
    fn non_object_input_is_a_root_error() {
        let err = user_schema()
            .validate_sync(&json!(["not", "an", "object"]))
            .unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors().errors()[0].path, "");
        assert_eq!(err.errors().errors()[0].message, "expected object, found array");
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let result = SchemaValidator::new(
            vec![("a", FieldRule::string()), ("a", FieldRule::number())],
            SchemaOptions::default(),
        );
        assert!(matches!(result, Err(SchemaError::DuplicateField { field }) if field == "a"));
    }

    #[test]
    fn mismatched_rule_name_is_rejected() {
        let result = SchemaValidator::builder()
            .field("email", FieldRule::string().name("mail"))
            .build();
        assert!(matches!(result, Err(SchemaError::NameMismatch { .. })));
    }

    #[test]
    fn declared_name_is_recorded_on_the_rule() {
        let schema = user_schema();
        assert_eq!(schema.rule("age").and_then(|r| r.field_name()), Some("age"));
    }

    #[test]
    fn schema_type_borrows_and_shares_the_rules() {
        let schema = user_schema();
        let field_type = schema.schema_type();

        assert_eq!(field_type.type_name(), "object");
        let nested = field_type.as_schema().unwrap();
        assert_eq!(nested.fields(), schema.fields());
        assert!(Arc::ptr_eq(&nested.fields, &schema.fields));

        let outer = SchemaValidator::builder()
            .field("user", FieldRule::new(schema.schema_type()))
            .build()
            .unwrap();
        let err = outer.validate_sync(&json!({"user": {}})).unwrap_err();
        assert_eq!(err.errors().paths(), vec!["user.name", "user.active"]);
        assert!(schema.validate_sync(&json!({"name": "A", "active": true})).is_ok());
    }

    #[test]
    fn options_deserialize_with_strict_default() {
        let options: SchemaOptions = serde_json::from_value(json!({})).unwrap();
        assert!(options.strict);
        let options: SchemaOptions = serde_json::from_value(json!({"strict": false})).unwrap();
        assert!(!options.strict);
    }
}
