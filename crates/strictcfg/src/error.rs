//! # Error Types
//!
//! Every failure the accessor can report. All of them are terminal for the
//! operation that raised them: nothing is retried or silently recovered,
//! and a failed fetch leaves earlier successful fetches recorded.
//!
//! Each variant carries the key, file path and underlying cause a human
//! needs to fix the file or the calling code.

use strictcfg_schema::{SchemaError, ValidationViolations};
use thiserror::Error;

/// Boxed error returned by pluggable parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for accessor operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error raised by [`ConfigAccessor`](crate::ConfigAccessor).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No built-in parser handles the file extension and no explicit
    /// parser was supplied.
    #[error(
        "cannot load '{path}': extension \"{extension}\" is not supported; \
         supply an explicit parser for non-standard formats"
    )]
    FileExtension {
        /// Path of the configuration file.
        path: String,
        /// The extension found, without the dot. Empty when there is none.
        extension: String,
    },

    /// The configuration file could not be read.
    #[error("cannot read configuration file '{path}': {source}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be parsed into a top-level mapping.
    #[error("cannot parse configuration file '{path}': {source}")]
    Parse {
        /// Path of the configuration file.
        path: String,
        /// Parser diagnostic.
        #[source]
        source: BoxError,
    },

    /// A key is absent from the file and no default was supplied.
    #[error("key '{key}' not found in configuration file '{path}'")]
    IncompleteConfig {
        /// The requested key.
        key: String,
        /// Path of the configuration file.
        path: String,
    },

    /// The stored value does not conform to the schema.
    #[error("key '{key}' in '{path}' failed validation:\n{violations}")]
    Validation {
        /// The requested key.
        key: String,
        /// Path of the configuration file.
        path: String,
        /// Every violation found in the value.
        violations: ValidationViolations,
    },

    /// The key was already fetched.
    #[error("key '{key}' is already loaded")]
    Reassignment {
        /// The requested key.
        key: String,
    },

    /// Keys in the file were never fetched.
    #[error("configuration file '{path}' has unused keys: {}", .keys.join(", "))]
    RedundantConfig {
        /// Path of the configuration file.
        path: String,
        /// Every unused key, sorted.
        keys: Vec<String>,
    },

    /// A schema could not be registered in, or looked up from, the cache.
    #[error("schema '{name}': {reason}")]
    ValidatorManagement {
        /// Cache name of the schema.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// An empty key was passed to a fetch.
    #[error("configuration key must not be empty")]
    EmptyKey,

    /// The schema passed to a fetch did not compile.
    #[error("schema for key '{key}' is invalid: {source}")]
    InvalidSchema {
        /// The requested key.
        key: String,
        /// Compilation failure.
        #[source]
        source: SchemaError,
    },

    /// A typed fetch could not deserialize the validated value into the
    /// requested type.
    #[error("key '{key}' cannot be deserialized into the requested type: {source}")]
    Deserialize {
        /// The requested key.
        key: String,
        /// Conversion failure.
        #[source]
        source: serde_json::Error,
    },

    /// The typed default passed to a fetch could not be serialized.
    #[error("default for key '{key}' cannot be serialized: {source}")]
    Serialize {
        /// The requested key.
        key: String,
        /// Conversion failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Discriminant of [`ConfigError`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorKind {
    FileExtension,
    Read,
    Parse,
    IncompleteConfig,
    Validation,
    Reassignment,
    RedundantConfig,
    ValidatorManagement,
    EmptyKey,
    InvalidSchema,
    Deserialize,
    Serialize,
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            Self::FileExtension { .. } => ConfigErrorKind::FileExtension,
            Self::Read { .. } => ConfigErrorKind::Read,
            Self::Parse { .. } => ConfigErrorKind::Parse,
            Self::IncompleteConfig { .. } => ConfigErrorKind::IncompleteConfig,
            Self::Validation { .. } => ConfigErrorKind::Validation,
            Self::Reassignment { .. } => ConfigErrorKind::Reassignment,
            Self::RedundantConfig { .. } => ConfigErrorKind::RedundantConfig,
            Self::ValidatorManagement { .. } => ConfigErrorKind::ValidatorManagement,
            Self::EmptyKey => ConfigErrorKind::EmptyKey,
            Self::InvalidSchema { .. } => ConfigErrorKind::InvalidSchema,
            Self::Deserialize { .. } => ConfigErrorKind::Deserialize,
            Self::Serialize { .. } => ConfigErrorKind::Serialize,
        }
    }

    /// The configuration key involved, for fetch-level errors.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::IncompleteConfig { key, .. }
            | Self::Validation { key, .. }
            | Self::Reassignment { key }
            | Self::InvalidSchema { key, .. }
            | Self::Deserialize { key, .. }
            | Self::Serialize { key, .. } => Some(key.as_str()),
            _ => None,
        }
    }
}
