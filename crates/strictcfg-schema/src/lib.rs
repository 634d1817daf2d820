//! # strictcfg-schema — Schema Expressions & Validation
//!
//! Describes the expected shape of configuration values and checks
//! documents against it.
//!
//! ## Responsibilities
//!
//! - **Expressions:** [`SchemaExpr`] is a tagged tree of scalar types,
//!   sequences, mappings with per-field defaults, alternatives, literals
//!   and JSON Schema documents. Literal schemas such as
//!   `{"user": "str", "ports": ["int"]}` parse via
//!   [`SchemaExpr::from_value`].
//!
//! - **Validation:** an expression compiles once into a [`Schema`], which
//!   validates a `serde_json::Value` and returns its normalized form, or a
//!   structured list of [`Violation`]s.
//!
//! - **Reuse:** [`SchemaCache`] stores compiled schemas by name so one
//!   sub-schema can be referenced from several composites.
//!
//! Custom validation logic plugs in through the [`Validate`] trait.

pub mod cache;
pub mod expr;
pub mod validate;

// Re-export primary types for ergonomic imports.
pub use cache::SchemaCache;
pub use expr::{ExtraKeys, Field, IntoSchema, ScalarType, SchemaExpr};
pub use validate::{
    value_kind, Schema, SchemaError, Validate, ValidationViolations, Violation,
};
