//! # Async Validation Stage
//!
//! `validate_async` runs the full synchronous pipeline first. Only when it
//! passes are the `validate_async` hooks invoked, each with its field's
//! clean value. All hooks of one call (including those of nested schemas)
//! are started together and joined; a failure in one field does not stop
//! the others, and every failure is reported.
//!
//! The join runs on the caller's task. No hook is spawned onto a runtime,
//! so the stage works under any executor.

use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::error::{FieldError, FieldErrors, Stage, ValidationError};
use crate::types::FieldType;
use crate::validate::SchemaValidator;

impl SchemaValidator {
    /// Synchronous pipeline followed by the async hooks.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Sync` without running any hook when the
    /// synchronous pass fails, and `ValidationError::Async` listing every
    /// rejected hook otherwise.
    pub async fn validate_async(
        &self,
        input: &Value,
    ) -> Result<Map<String, Value>, ValidationError> {
        let clean = self.validate_sync(input)?;

        let errors = self.run_async_checks(&clean).await;
        if errors.is_empty() {
            Ok(clean)
        } else {
            tracing::debug!(errors = errors.len(), "async validation failed");
            Err(ValidationError::Async(FieldErrors::new(errors)))
        }
    }

    /// Starts every async check for `clean` and collects the failures in
    /// field order.
    fn run_async_checks<'a>(
        &'a self,
        clean: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Vec<FieldError>> {
        let mut checks: Vec<BoxFuture<'a, Vec<FieldError>>> = Vec::new();

        for (name, rule) in self.rules() {
            let Some(value) = clean.get(name) else {
                continue;
            };

            if let Some(check) = rule.validate_async_fn() {
                let pending = check(value.clone());
                checks.push(
                    async move {
                        match pending.await {
                            Ok(true) => Vec::new(),
                            Ok(false) => vec![FieldError::new(
                                name,
                                Stage::Async,
                                format!("{name}: async validation failed"),
                            )],
                            Err(message) => vec![FieldError::new(name, Stage::Async, message)],
                        }
                    }
                    .boxed(),
                );
            }

            if let (FieldType::Schema(schema), Some(sub)) = (rule.field_type(), value.as_object()) {
                if schema.has_async_checks() {
                    checks.push(
                        async move {
                            schema
                                .run_async_checks(sub)
                                .await
                                .into_iter()
                                .map(|e| e.nested_under(name))
                                .collect::<Vec<_>>()
                        }
                        .boxed(),
                    );
                }
            }
        }

        tracing::trace!(checks = checks.len(), "running async checks");
        async move { join_all(checks).await.into_iter().flatten().collect::<Vec<_>>() }.boxed()
    }
}
