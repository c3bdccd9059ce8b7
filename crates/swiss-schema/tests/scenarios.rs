//! End-to-end validation scenarios: required fields, length bounds on
//! non-length values, custom regex messages, enums, non-strict schemas,
//! nested schemas, filter coercion, and sync/async ordering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};
use swiss_schema::{FieldRule, HookRegistry, SchemaLoader, SchemaValidator, Stage};

// =============================================================================
// Helper Functions
// =============================================================================

fn email_pattern() -> Regex {
    Regex::new(r"^[a-z]+@[a-z]+\.[a-z]{2,}$").unwrap()
}

fn user_schema() -> SchemaValidator {
    let address = SchemaValidator::builder()
        .field("city", FieldRule::string().required(true))
        .field("zip", FieldRule::string().regex(Regex::new(r"^\d{5}$").unwrap()))
        .build()
        .unwrap();

    SchemaValidator::builder()
        .field("name", FieldRule::string().required(true).maxlength(40))
        .field("email", FieldRule::string().required(true).regex_with(email_pattern(), "bad email"))
        .field("birthday", FieldRule::date())
        .field("color", FieldRule::string().one_of(["red", "green", "blue"]))
        .field("tags", FieldRule::array().maxlength(3))
        .field("address", FieldRule::new(address))
        .build()
        .unwrap()
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

#[test]
fn missing_required_field_is_reported() {
    let schema = SchemaValidator::builder()
        .field("name", FieldRule::string().required(true))
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({})).unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.errors()[0].path, "name");
    assert_eq!(errors.errors()[0].stage, Stage::Required);
    assert!(errors.errors()[0].message.contains("required"));
}

#[test]
fn length_bounds_do_not_apply_to_numbers() {
    let schema = SchemaValidator::builder()
        .field("age", FieldRule::number().minlength(2))
        .build()
        .unwrap();

    let clean = schema.validate_sync(&json!({"age": 5})).unwrap();
    assert_eq!(Value::Object(clean), json!({"age": 5}));
}

#[test]
fn regex_pair_form_uses_the_exact_custom_message() {
    let schema = SchemaValidator::builder()
        .field("email", FieldRule::string().regex_with(email_pattern(), "bad email"))
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({"email": "not-an-email"})).unwrap_err();
    assert_eq!(err.errors().errors()[0].message, "bad email");
}

#[test]
fn value_outside_enum_is_rejected() {
    let schema = SchemaValidator::builder()
        .field("color", FieldRule::string().one_of(["red", "green", "blue"]))
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({"color": "purple"})).unwrap_err();
    let failure = err.errors().get("color").unwrap();
    assert_eq!(failure.stage, Stage::Enum);
}

#[test]
fn non_strict_schema_drops_extra_keys() {
    let schema = SchemaValidator::builder()
        .field("a", FieldRule::string())
        .strict(false)
        .build()
        .unwrap();

    let clean = schema.validate_sync(&json!({"a": "x", "b": "extra"})).unwrap();
    assert_eq!(Value::Object(clean), json!({"a": "x"}));
}

#[test]
fn strict_schema_reports_extra_keys() {
    let schema = SchemaValidator::builder()
        .field("a", FieldRule::string())
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({"a": "x", "b": "extra"})).unwrap_err();
    assert_eq!(err.errors().paths(), vec!["b"]);
    assert_eq!(err.errors().errors()[0].stage, Stage::Unknown);
}

#[test]
fn nested_failures_are_attributed_with_dotted_paths() {
    let address = SchemaValidator::builder()
        .field("city", FieldRule::string().required(true))
        .build()
        .unwrap();
    let schema = SchemaValidator::builder()
        .field("address", FieldRule::new(address))
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({"address": {}})).unwrap_err();
    assert_eq!(err.errors().paths(), vec!["address.city"]);
    assert_eq!(err.errors().errors()[0].stage, Stage::Required);
}

#[test]
fn nested_clean_object_replaces_the_raw_value() {
    let address = SchemaValidator::builder()
        .field(
            "city",
            FieldRule::string().filter(|v| Ok(json!(v.as_str().unwrap_or("").to_uppercase()))),
        )
        .strict(false)
        .build()
        .unwrap();
    let schema = SchemaValidator::builder()
        .field("address", FieldRule::new(address))
        .build()
        .unwrap();

    let clean = schema
        .validate_sync(&json!({"address": {"city": "cdmx", "floor": 3}}))
        .unwrap();
    assert_eq!(clean.get("address"), Some(&json!({"city": "CDMX"})));
}

#[test]
fn nested_schema_rejects_non_objects() {
    let err = user_schema()
        .validate_sync(&json!({"name": "A", "email": "a@b.io", "address": "Main St"}))
        .unwrap_err();
    let failure = err.errors().get("address").unwrap();
    assert_eq!(failure.stage, Stage::Type);
    assert_eq!(failure.message, "address: expected object, found string");
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn all_failing_fields_appear_in_one_error() {
    let err = user_schema()
        .validate_sync(&json!({
            "email": "nope",
            "birthday": "6/11/1983",
            "color": "purple",
            "tags": ["a", "b", "c", "d"],
            "address": {"zip": "abc"},
            "nickname": "tin"
        }))
        .unwrap_err();

    assert_eq!(
        err.errors().paths(),
        vec![
            "name",
            "email",
            "birthday",
            "color",
            "tags",
            "address.city",
            "address.zip",
            "nickname",
        ]
    );
    let stages: Vec<Stage> = err.errors().errors().iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Required,
            Stage::Regex,
            Stage::Type,
            Stage::Enum,
            Stage::MaxLength,
            Stage::Required,
            Stage::Regex,
            Stage::Unknown,
        ]
    );
}

#[test]
fn a_field_stops_at_its_first_failure() {
    let schema = SchemaValidator::builder()
        .field(
            "code",
            FieldRule::string()
                .maxlength(2)
                .regex_with(Regex::new("^[A-Z]+$").unwrap(), "uppercase only"),
        )
        .build()
        .unwrap();

    let err = schema.validate_sync(&json!({"code": "abcd"})).unwrap_err();
    assert_eq!(err.errors().len(), 1);
    assert_eq!(err.errors().errors()[0].stage, Stage::MaxLength);
}

// =============================================================================
// Filters
// =============================================================================

#[test]
fn filter_coercion_feeds_later_stages() {
    let schema = SchemaLoader::new(HookRegistry::with_builtins())
        .load_value(&json!({
            "fields": {
                "zip": {"type": "number", "filter": "to_number", "minlength": 10},
                "qty": {"type": "number", "filter": "to_number", "enum": [1, 2, 3]}
            }
        }))
        .unwrap();

    let clean = schema.validate_sync(&json!({"zip": "90210", "qty": "2"})).unwrap();
    assert_eq!(Value::Object(clean), json!({"zip": 90210, "qty": 2}));

    let err = schema.validate_sync(&json!({"zip": "90210", "qty": "7"})).unwrap_err();
    assert_eq!(err.errors().paths(), vec!["qty"]);
}

#[test]
fn float_coerced_by_a_filter_still_matches_an_integer_enum() {
    let schema = SchemaLoader::new(HookRegistry::with_builtins())
        .load_value(&json!({
            "fields": {
                "qty": {"type": "number", "filter": "to_number", "enum": [1, 2, 3]}
            }
        }))
        .unwrap();

    let clean = schema.validate_sync(&json!({"qty": "2.0"})).unwrap();
    assert_eq!(clean.get("qty").and_then(Value::as_f64), Some(2.0));
    assert!(schema.validate_sync(&json!({"qty": 2.0})).is_ok());
}

#[test]
fn optional_absent_fields_are_not_filtered_or_defaulted() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let schema = SchemaValidator::builder()
        .field(
            "nick",
            FieldRule::string().filter(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(v)
            }),
        )
        .build()
        .unwrap();

    let clean = schema.validate_sync(&json!({})).unwrap();
    assert!(clean.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn conditional_requirement_sees_the_whole_input() {
    let schema = SchemaValidator::builder()
        .field("country", FieldRule::string())
        .field(
            "state",
            FieldRule::string().required_when(
                |input| input.get("country") == Some(&json!("US")),
                Some("{{ field }} is required for US addresses".to_string()),
            ),
        )
        .build()
        .unwrap();

    assert!(schema.validate_sync(&json!({"country": "MX"})).is_ok());
    let err = schema.validate_sync(&json!({"country": "US"})).unwrap_err();
    assert_eq!(err.errors().errors()[0].message, "state is required for US addresses");
}

// =============================================================================
// Async
// =============================================================================

#[tokio::test]
async fn sync_failure_never_reaches_async_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let schema = SchemaValidator::builder()
        .field("email", FieldRule::string().regex_with(email_pattern(), "bad email"))
        .field(
            "username",
            FieldRule::string().validate_async(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(true) }
            }),
        )
        .build()
        .unwrap();

    let err = schema
        .validate_async(&json!({"email": "bad", "username": "tin"}))
        .await
        .unwrap_err();
    assert!(!err.is_async());
    assert_eq!(err.errors().errors()[0].message, "bad email");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn async_hooks_receive_the_clean_value() {
    let mut registry = HookRegistry::with_builtins();
    registry.register_async_validator("not_taken", |value| async move {
        match value.as_str() {
            Some("admin") => Err("admin is reserved".to_string()),
            _ => Ok(true),
        }
    });
    let schema = SchemaLoader::new(registry)
        .load_value(&json!({
            "fields": {
                "username": {"type": "string", "filter": "lowercase", "validateAsync": "not_taken"}
            }
        }))
        .unwrap();

    let err = schema.validate_async(&json!({"username": "ADMIN"})).await.unwrap_err();
    assert!(err.is_async());
    assert_eq!(err.errors().errors()[0].path, "username");
    assert_eq!(err.errors().errors()[0].stage, Stage::Async);
    assert_eq!(err.errors().errors()[0].message, "admin is reserved");

    let clean = schema.validate_async(&json!({"username": "Tin"})).await.unwrap();
    assert_eq!(clean.get("username"), Some(&json!("tin")));
}

#[tokio::test]
async fn async_and_sync_produce_the_same_clean_object() {
    let schema = user_schema();
    let input = json!({
        "name": "Martin Rafael",
        "email": "tin@devtin.io",
        "birthday": "1983-06-11",
        "address": {"city": "Miami", "zip": "33101"}
    });

    let sync = schema.validate_sync(&input).unwrap();
    let asynced = schema.validate_async(&input).await.unwrap();
    assert_eq!(sync, asynced);
}
