//! # Schema Documents
//!
//! Loads schemas declared as JSON or YAML documents:
//!
//! ```yaml
//! strict: true
//! fields:
//!   email:
//!     type: string
//!     required: [true, "an e-mail is required"]
//!     maxlength: 120
//!     regex: ['^[a-z0-9._]+@[a-z0-9-.]+\.[a-z]{2,}$', "{{ value }} is not a valid e-mail address"]
//!     filter: trim
//!   address:
//!     type:
//!       fields:
//!         city: { type: string, required: true }
//! ```
//!
//! Field descriptors accept only `name`, `type`, `enum`, `minlength`,
//! `maxlength`, `required`, `regex`, `filter`, `validate` and
//! `validateAsync`. Anything else is rejected when the document is
//! loaded, never at validation time. Hook names and custom type names
//! resolve through the loader's [`HookRegistry`].

use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::hooks::HookRegistry;
use crate::rule::{Constraint, FieldRule, Requirement};
use crate::types::{json_type_name, FieldType};
use crate::validate::{SchemaOptions, SchemaValidator};

/// Property names a field descriptor may use.
pub const RECOGNIZED_KEYS: [&str; 10] = [
    "name",
    "type",
    "enum",
    "minlength",
    "maxlength",
    "required",
    "regex",
    "filter",
    "validate",
    "validateAsync",
];

/// Builds [`SchemaValidator`]s from schema documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    registry: HookRegistry,
}

impl SchemaLoader {
    pub fn new(registry: HookRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Parse and load a JSON schema document.
    pub fn load_json(&self, text: &str) -> Result<SchemaValidator, SchemaError> {
        let document: Value = serde_json::from_str(text)?;
        self.load_value(&document)
    }

    /// Parse and load a YAML schema document.
    pub fn load_yaml(&self, text: &str) -> Result<SchemaValidator, SchemaError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        let document = yaml_to_json(&yaml, "")?;
        self.load_value(&document)
    }

    /// Load a schema file, choosing the parser by extension
    /// (`.yaml`/`.yml` for YAML, anything else as JSON).
    pub fn load_file(&self, path: &Path) -> Result<SchemaValidator, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        tracing::debug!(path = %path.display(), "loading schema document");
        match ext {
            "yaml" | "yml" => self.load_yaml(&content),
            _ => self.load_json(&content),
        }
    }

    /// Load a schema from an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Document` when the top level is not
    /// `{ strict?, fields }`, and field-level construction errors for any
    /// malformed field descriptor.
    pub fn load_value(&self, document: &Value) -> Result<SchemaValidator, SchemaError> {
        let Some(top) = document.as_object() else {
            return Err(SchemaError::Document(format!(
                "expected a mapping, found {}",
                json_type_name(document)
            )));
        };

        let mut options = SchemaOptions::default();
        let mut fields = None;
        for (key, value) in top {
            match key.as_str() {
                "strict" => {
                    options.strict = value
                        .as_bool()
                        .ok_or_else(|| SchemaError::Document("'strict' must be a boolean".into()))?;
                }
                "fields" => {
                    fields = Some(
                        value.as_object().ok_or_else(|| {
                            SchemaError::Document("'fields' must be a mapping".into())
                        })?,
                    );
                }
                other => {
                    return Err(SchemaError::Document(format!(
                        "unrecognized top-level key '{other}'"
                    )));
                }
            }
        }

        let fields = fields.ok_or_else(|| SchemaError::Document("missing 'fields'".into()))?;
        let mut rules = Vec::with_capacity(fields.len());
        for (name, descriptor) in fields {
            rules.push((name.clone(), self.field_rule(name, descriptor)?));
        }

        SchemaValidator::new(rules, options)
    }

    /// Builds one [`FieldRule`] from its descriptor.
    pub fn field_rule(&self, field: &str, descriptor: &Value) -> Result<FieldRule, SchemaError> {
        let Some(props) = descriptor.as_object() else {
            return Err(SchemaError::NotAMapping {
                field: field.to_string(),
                found: json_type_name(descriptor),
            });
        };

        if let Some(key) = props.keys().find(|k| !RECOGNIZED_KEYS.contains(&k.as_str())) {
            return Err(SchemaError::UnrecognizedKey {
                field: field.to_string(),
                key: key.clone(),
            });
        }

        let type_descriptor = props.get("type").ok_or_else(|| SchemaError::MissingType {
            field: field.to_string(),
        })?;
        let mut rule = FieldRule::new(self.field_type(field, type_descriptor)?);

        if let Some(name) = props.get("name") {
            let name = name.as_str().ok_or_else(|| invalid(field, "name", "must be a string"))?;
            if name != field {
                return Err(SchemaError::NameMismatch {
                    field: field.to_string(),
                    name: name.to_string(),
                });
            }
            rule = rule.name(name);
        }

        if let Some(values) = props.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| invalid(field, "enum", "must be a sequence"))?;
            rule = rule.one_of(values.iter().cloned());
        }

        if let Some(required) = props.get("required") {
            rule = rule.set_requirement(requirement(field, required)?);
        }

        if let Some(min) = props.get("minlength") {
            rule = rule.set_minlength(length_bound(field, "minlength", min)?);
        }

        if let Some(max) = props.get("maxlength") {
            rule = rule.set_maxlength(length_bound(field, "maxlength", max)?);
        }

        if let Some(pattern) = props.get("regex") {
            rule = rule.set_regex(regex_constraint(field, pattern)?);
        }

        if let Some(name) = props.get("filter") {
            let name = hook_name(field, "filter", name)?;
            let filter = self.registry.filter(name).ok_or_else(|| unknown(field, "filter", name))?;
            rule = rule.set_filter(filter);
        }

        if let Some(name) = props.get("validate") {
            let name = hook_name(field, "validate", name)?;
            let check = self
                .registry
                .validator(name)
                .ok_or_else(|| unknown(field, "validate", name))?;
            rule = rule.set_validate(check);
        }

        if let Some(name) = props.get("validateAsync") {
            let name = hook_name(field, "validateAsync", name)?;
            let check = self
                .registry
                .async_validator(name)
                .ok_or_else(|| unknown(field, "validateAsync", name))?;
            rule = rule.set_validate_async(check);
        }

        Ok(rule)
    }

    fn field_type(&self, field: &str, descriptor: &Value) -> Result<FieldType, SchemaError> {
        match descriptor {
            Value::String(name) => FieldType::builtin(name)
                .or_else(|| self.registry.custom_type(name).map(FieldType::Custom))
                .ok_or_else(|| unknown(field, "type", name)),
            Value::Object(_) => self
                .load_value(descriptor)
                .map(SchemaValidator::into_type)
                .map_err(|e| e.nested_under(field)),
            other => Err(invalid(
                field,
                "type",
                format!("must be a type name or a nested schema, found {}", json_type_name(other)),
            )),
        }
    }
}

fn invalid(field: &str, key: &'static str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidProperty {
        field: field.to_string(),
        key,
        reason: reason.into(),
    }
}

fn unknown(field: &str, kind: &'static str, name: &str) -> SchemaError {
    SchemaError::UnknownHook {
        field: field.to_string(),
        kind,
        name: name.to_string(),
    }
}

fn hook_name<'v>(field: &str, key: &'static str, value: &'v Value) -> Result<&'v str, SchemaError> {
    value
        .as_str()
        .ok_or_else(|| invalid(field, key, "must name a registered hook"))
}

/// Splits a bare value or a `[value, message]` pair.
fn pair_form<'v>(
    field: &str,
    key: &'static str,
    value: &'v Value,
) -> Result<(&'v Value, Option<String>), SchemaError> {
    match value {
        Value::Array(items) => match items.as_slice() {
            [bound, Value::String(message)] => Ok((bound, Some(message.clone()))),
            _ => Err(invalid(field, key, "must be a value or a [value, message] pair")),
        },
        bare => Ok((bare, None)),
    }
}

fn requirement(field: &str, value: &Value) -> Result<Requirement, SchemaError> {
    let (flag, message) = pair_form(field, "required", value)?;
    let flag = flag
        .as_bool()
        .ok_or_else(|| invalid(field, "required", "must be a boolean"))?;
    Ok(if flag {
        Requirement::Required { message }
    } else {
        Requirement::Optional
    })
}

fn length_bound(
    field: &str,
    key: &'static str,
    value: &Value,
) -> Result<Constraint<usize>, SchemaError> {
    let (bound, message) = pair_form(field, key, value)?;
    let bound = bound
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(field, key, "must be a non-negative integer"))?;
    Ok(Constraint { value: bound, message })
}

fn regex_constraint(field: &str, value: &Value) -> Result<Constraint<Regex>, SchemaError> {
    let (pattern, message) = pair_form(field, "regex", value)?;
    let pattern = pattern
        .as_str()
        .ok_or_else(|| invalid(field, "regex", "must be a pattern string"))?;
    let compiled = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
        field: field.to_string(),
        source,
    })?;
    Ok(Constraint {
        value: compiled,
        message,
    })
}

/// Converts a parsed YAML document to JSON, keeping mapping order.
/// Tags are dropped in favor of their inner value. `path` locates the
/// node in error messages (`fields.age.enum[2]`).
fn yaml_to_json(yaml: &serde_yaml::Value, path: &str) -> Result<Value, SchemaError> {
    use serde_yaml::Value as Yaml;

    let converted = match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => yaml_number(n)
            .ok_or_else(|| yaml_error(path, format!("number {n} has no JSON form")))?,
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| yaml_to_json(item, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, item) in mapping {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => return Err(yaml_error(path, "mapping keys must be scalars")),
                };
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                object.insert(key, yaml_to_json(item, &child)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value, path)?,
    };
    Ok(converted)
}

fn yaml_number(n: &serde_yaml::Number) -> Option<Value> {
    n.as_i64()
        .map(Value::from)
        .or_else(|| n.as_u64().map(Value::from))
        .or_else(|| n.as_f64().and_then(serde_json::Number::from_f64).map(Value::Number))
}

fn yaml_error(path: &str, reason: impl std::fmt::Display) -> SchemaError {
    let at = if path.is_empty() { "(root)" } else { path };
    SchemaError::Document(format!("at {at}: {reason}"))
}
