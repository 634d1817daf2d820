//! # strictcfg — Single-Assignment Configuration Access
//!
//! Loads one YAML or JSON configuration file and hands out its top-level
//! values through a validating accessor that remembers what was taken.
//!
//! ```no_run
//! use strictcfg::{ConfigAccessor, ScalarType, SchemaExpr};
//!
//! # fn main() -> strictcfg::Result<()> {
//! let mut config = ConfigAccessor::open("service.yml")?;
//! let port = config.fetch("port", ScalarType::Integer)?;
//! let hosts = config.fetch("hosts", SchemaExpr::sequence(ScalarType::String))?;
//! let workers = config.fetch_or("workers", ScalarType::Integer, 4)?;
//! config.audit()?; // fails if the file has keys nobody fetched
//! # let _ = (port, hosts, workers);
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - **Single assignment.** Every key is fetched at most once; a second
//!   fetch is an error, so two call sites cannot silently disagree about
//!   the same setting.
//!
//! - **Defaults are explicit.** [`ConfigAccessor::fetch`] requires the key;
//!   [`ConfigAccessor::fetch_or`] falls back to a default which is written
//!   back into the in-memory mapping.
//!
//! - **Normalized values.** Validation returns the normalized value
//!   (coercions, nested defaults) and that is what the caller receives.
//!
//! - **Redundancy audit.** [`ConfigAccessor::audit`] reports keys present
//!   in the file that were never fetched.
//!
//! Schemas come from the `strictcfg-schema` crate and are re-exported
//! here.

pub mod accessor;
pub mod error;
pub mod format;

// Re-export primary types for ergonomic imports.
pub use accessor::ConfigAccessor;
pub use error::{BoxError, ConfigError, ConfigErrorKind, Result};
pub use format::Format;

pub use strictcfg_schema::{
    ExtraKeys, Field, IntoSchema, ScalarType, Schema, SchemaCache, SchemaError, SchemaExpr,
    Validate, ValidationViolations, Violation,
};
