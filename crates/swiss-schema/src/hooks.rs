//! # Hook Registry
//!
//! Schema documents cannot carry code, so their `filter`, `validate`,
//! `validateAsync` and custom `type` entries are names resolved through a
//! [`HookRegistry`]. Programs register their hooks once and hand the
//! registry to the descriptor loader.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::FutureExt;
use serde_json::Value;

use crate::rule::{AsyncValidateFn, FilterFn, ValidateFn};
use crate::types::CustomType;

/// Named hooks available to schema documents.
#[derive(Clone, Default)]
pub struct HookRegistry {
    filters: HashMap<String, FilterFn>,
    validators: HashMap<String, ValidateFn>,
    async_validators: HashMap<String, AsyncValidateFn>,
    types: HashMap<String, CustomType>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the `trim`, `lowercase`, `uppercase`
    /// and `to_number` filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_filter("trim", |v| Ok(map_str(v, |s| s.trim().to_string())));
        registry.register_filter("lowercase", |v| Ok(map_str(v, |s| s.to_lowercase())));
        registry.register_filter("uppercase", |v| Ok(map_str(v, |s| s.to_uppercase())));
        registry.register_filter("to_number", to_number);
        registry
    }

    pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn register_validator<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.validators.insert(name.into(), Arc::new(check));
        self
    }

    pub fn register_async_validator<F, Fut>(
        &mut self,
        name: impl Into<String>,
        check: F,
    ) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, String>> + Send + 'static,
    {
        self.async_validators
            .insert(name.into(), Arc::new(move |value| check(value).boxed()));
        self
    }

    /// Registers a custom type under its own name.
    pub fn register_type(&mut self, custom: CustomType) -> &mut Self {
        self.types.insert(custom.name().to_string(), custom);
        self
    }

    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).cloned()
    }

    pub fn validator(&self, name: &str) -> Option<ValidateFn> {
        self.validators.get(name).cloned()
    }

    pub fn async_validator(&self, name: &str) -> Option<AsyncValidateFn> {
        self.async_validators.get(name).cloned()
    }

    pub fn custom_type(&self, name: &str) -> Option<CustomType> {
        self.types.get(name).cloned()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut filters: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        filters.sort_unstable();
        let mut validators: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        validators.sort_unstable();
        let mut async_validators: Vec<&str> =
            self.async_validators.keys().map(String::as_str).collect();
        async_validators.sort_unstable();
        let mut types: Vec<&str> = self.types.keys().map(String::as_str).collect();
        types.sort_unstable();

        f.debug_struct("HookRegistry")
            .field("filters", &filters)
            .field("validators", &validators)
            .field("async_validators", &async_validators)
            .field("types", &types)
            .finish()
    }
}

/// Applies `f` to string values and passes everything else through.
fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

/// Coerces numeric strings to numbers. Integers stay integers.
fn to_number(value: Value) -> Result<Value, String> {
    let s = match value {
        Value::String(s) => s,
        other => return Ok(other),
    };
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::from(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("'{s}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_filters_transform_strings_only() {
        let registry = HookRegistry::with_builtins();
        let trim = registry.filter("trim").unwrap();
        assert_eq!(trim(json!("  a b  ")), Ok(json!("a b")));
        assert_eq!(trim(json!(3)), Ok(json!(3)));

        let lower = registry.filter("lowercase").unwrap();
        assert_eq!(lower(json!("MiXeD")), Ok(json!("mixed")));

        let upper = registry.filter("uppercase").unwrap();
        assert_eq!(upper(json!("mx")), Ok(json!("MX")));
    }

    #[test]
    fn to_number_coerces_numeric_strings() {
        assert_eq!(to_number(json!("42")), Ok(json!(42)));
        assert_eq!(to_number(json!(" 2.5 ")), Ok(json!(2.5)));
        assert_eq!(to_number(json!(7)), Ok(json!(7)));
        assert_eq!(to_number(json!("forty")), Err("'forty' is not a number".to_string()));
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let registry = HookRegistry::new();
        assert!(registry.filter("trim").is_none());
        assert!(registry.validator("x").is_none());
        assert!(registry.async_validator("x").is_none());
        assert!(registry.custom_type("x").is_none());
    }

    #[test]
    fn registered_hooks_are_found() {
        let mut registry = HookRegistry::new();
        registry
            .register_validator("positive", |v| Ok(v.as_f64().is_some_and(|n| n > 0.0)))
            .register_type(CustomType::new("uuid", |v| v.as_str().is_some_and(|s| s.len() == 36)));

        let positive = registry.validator("positive").unwrap();
        assert_eq!(positive(&json!(3)), Ok(true));
        assert_eq!(positive(&json!(-3)), Ok(false));
        assert!(registry.custom_type("uuid").is_some());
        assert!(format!("{registry:?}").contains("positive"));
    }
}
