//! # swiss-schema — Declarative Object Validation
//!
//! Validates candidate objects (`serde_json::Value`) against a schema of
//! named fields, producing either a clean, filtered object or one
//! aggregated error listing every failing field.
//!
//! ## Pipeline (`pipeline`)
//!
//! Each field runs a fixed sequence of stages and stops at its first
//! failure: filter, type (nested schemas recurse), enum, required,
//! maxlength, minlength, regex, validate. Fields never stop each other.
//!
//! ## Sync and Async (`validate`, `async_stage`)
//!
//! - [`SchemaValidator::validate_sync`] runs the pipeline on every field.
//! - [`SchemaValidator::validate_async`] runs the synchronous pass, then,
//!   only if it succeeded, every `validate_async` hook concurrently.
//!
//! ## Schema Documents (`descriptor`, `hooks`)
//!
//! Schemas can be declared in Rust with [`FieldRule`] builders or loaded
//! from JSON/YAML with [`SchemaLoader`]. Documents refer to hooks and
//! custom types by name through a [`HookRegistry`].
//!
//! ## Crate Policy
//!
//! - Construction errors ([`SchemaError`]) surface immediately and are
//!   never aggregated.
//! - Validation returns exactly one [`ValidationError`] or none per call.
//! - Validators hold no per-call state and can be shared across threads.
//! - No `.unwrap()` outside tests.
//!
//! ```
//! use serde_json::json;
//! use swiss_schema::{FieldRule, SchemaValidator};
//!
//! let schema = SchemaValidator::builder()
//!     .field("name", FieldRule::string().required(true))
//!     .field("age", FieldRule::number())
//!     .build()
//!     .unwrap();
//!
//! let clean = schema.validate_sync(&json!({"name": "Martin"})).unwrap();
//! assert_eq!(clean.get("name"), Some(&json!("Martin")));
//! assert!(!clean.contains_key("age"));
//! ```

pub mod async_stage;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod rule;
pub mod types;
pub mod validate;

pub use descriptor::{SchemaLoader, RECOGNIZED_KEYS};
pub use error::{FieldError, FieldErrors, SchemaError, Stage, ValidationError};
pub use hooks::HookRegistry;
pub use rule::{Constraint, FieldRule, Requirement};
pub use types::{CustomType, FieldType};
pub use validate::{SchemaBuilder, SchemaOptions, SchemaValidator};
