//! # Rule Evaluation Pipeline
//!
//! Runs the synchronous stages for one field, in order, stopping at the
//! first failure:
//!
//! 1. `filter`: replaces the working value
//! 2. type check: nested schemas recurse and substitute the clean sub-object
//! 3. enum
//! 4. required: only reached for absent values
//! 5. `maxlength`, then `minlength`: strings and arrays only
//! 6. `regex`: against the stringified value
//! 7. `validate`
//!
//! An absent field goes straight to the required check: required fields
//! fail, optional ones are skipped and stay absent.

use serde_json::{Map, Value};

use crate::error::{FieldError, Stage};
use crate::rule::FieldRule;
use crate::types::{json_type_name, strictly_equal, stringify, value_length, FieldType};

/// Result of evaluating one field: the clean value (`None` when the field
/// is optional and absent) or the field's errors. Nested schemas can
/// report several errors, one per nested path.
pub type FieldOutcome = Result<Option<Value>, Vec<FieldError>>;

/// Evaluates one field of `input`.
pub fn evaluate_field(field: &str, rule: &FieldRule, input: &Map<String, Value>) -> FieldOutcome {
    let Some(raw) = input.get(field) else {
        return check_absent(field, rule, input).map(|()| None);
    };

    let value = apply_filter(field, rule, raw.clone())?;
    let value = check_type(field, rule, value)?;
    check_enum(field, rule, &value).map_err(single)?;
    check_length(field, rule, &value).map_err(single)?;
    check_regex(field, rule, &value).map_err(single)?;
    check_custom(field, rule, &value).map_err(single)?;

    Ok(Some(value))
}

fn single(err: FieldError) -> Vec<FieldError> {
    tracing::trace!(field = %err.path, stage = %err.stage, "field rejected");
    vec![err]
}

fn check_absent(
    field: &str,
    rule: &FieldRule,
    input: &Map<String, Value>,
) -> Result<(), Vec<FieldError>> {
    let requirement = rule.requirement();
    if !requirement.applies(input) {
        return Ok(());
    }
    let message = match requirement.message() {
        Some(template) => render(template, field, None),
        None => format!("{field} is required"),
    };
    Err(single(FieldError::new(field, Stage::Required, message)))
}

fn apply_filter(field: &str, rule: &FieldRule, value: Value) -> Result<Value, Vec<FieldError>> {
    match rule.filter_fn() {
        Some(filter) => filter(value)
            .map_err(|message| single(FieldError::new(field, Stage::Filter, message))),
        None => Ok(value),
    }
}

fn check_type(field: &str, rule: &FieldRule, value: Value) -> Result<Value, Vec<FieldError>> {
    let field_type = rule.field_type();

    if let FieldType::Schema(schema) = field_type {
        if !value.is_object() {
            return Err(single(type_mismatch(field, field_type, &value)));
        }
        return schema
            .validate_value(&value)
            .map(Value::Object)
            .map_err(|errors| errors.into_iter().map(|e| e.nested_under(field)).collect());
    }

    if field_type.matches(&value) {
        Ok(value)
    } else {
        Err(single(type_mismatch(field, field_type, &value)))
    }
}

fn type_mismatch(field: &str, expected: &FieldType, actual: &Value) -> FieldError {
    FieldError::new(
        field,
        Stage::Type,
        format!(
            "{field}: expected {}, found {}",
            expected.type_name(),
            json_type_name(actual)
        ),
    )
}

fn check_enum(field: &str, rule: &FieldRule, value: &Value) -> Result<(), FieldError> {
    let Some(allowed) = rule.enum_values() else {
        return Ok(());
    };
    if allowed.iter().any(|candidate| strictly_equal(candidate, value)) {
        return Ok(());
    }
    let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
    Err(FieldError::new(
        field,
        Stage::Enum,
        format!("{field}: {value} is not one of [{}]", listed.join(", ")),
    ))
}

fn check_length(field: &str, rule: &FieldRule, value: &Value) -> Result<(), FieldError> {
    let Some(len) = value_length(value) else {
        return Ok(());
    };

    if let Some(max) = rule.max_length() {
        if len > max.value {
            let message = match &max.message {
                Some(template) => render(template, field, Some(value)),
                None => format!("{field}: length {len} exceeds the maximum of {}", max.value),
            };
            return Err(FieldError::new(field, Stage::MaxLength, message));
        }
    }

    if let Some(min) = rule.min_length() {
        if len < min.value {
            let message = match &min.message {
                Some(template) => render(template, field, Some(value)),
                None => format!("{field}: length {len} is below the minimum of {}", min.value),
            };
            return Err(FieldError::new(field, Stage::MinLength, message));
        }
    }

    Ok(())
}

fn check_regex(field: &str, rule: &FieldRule, value: &Value) -> Result<(), FieldError> {
    let Some(pattern) = rule.pattern() else {
        return Ok(());
    };
    let text = stringify(value);
    if pattern.value.is_match(&text) {
        return Ok(());
    }
    let message = match &pattern.message {
        Some(template) => render(template, field, Some(value)),
        None => format!("{field}: '{text}' does not match /{}/", pattern.value.as_str()),
    };
    Err(FieldError::new(field, Stage::Regex, message))
}

fn check_custom(field: &str, rule: &FieldRule, value: &Value) -> Result<(), FieldError> {
    let Some(check) = rule.validate_fn() else {
        return Ok(());
    };
    match check(value) {
        Ok(true) => Ok(()),
        Ok(false) => Err(FieldError::new(
            field,
            Stage::Validate,
            format!("{field}: custom validation failed"),
        )),
        Err(message) => Err(FieldError::new(field, Stage::Validate, message)),
    }
}

/// Fills `{{ value }}` and `{{ field }}` placeholders in a custom message.
pub fn render(template: &str, field: &str, value: Option<&Value>) -> String {
    let value_text = value.map(stringify).unwrap_or_default();
    template
        .replace("{{ value }}", &value_text)
        .replace("{{value}}", &value_text)
        .replace("{{ field }}", field)
        .replace("{{field}}", field)
}
