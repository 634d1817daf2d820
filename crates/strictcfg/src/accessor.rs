//! # Configuration Accessor
//!
//! [`ConfigAccessor`] owns the parsed top-level mapping of one
//! configuration file and hands out its values one key at a time.
//!
//! ## Protocol
//!
//! 1. Construct from a path ([`ConfigAccessor::open`]), optionally with an
//!    explicit parser ([`ConfigAccessor::open_with`]).
//! 2. Fetch every key the application needs, each exactly once, through a
//!    schema ([`ConfigAccessor::fetch`], [`ConfigAccessor::fetch_or`] and
//!    their typed variants).
//! 3. Once all expected keys are fetched, call [`ConfigAccessor::audit`] to
//!    fail on keys present in the file that nobody fetched.
//!
//! ## Invariants
//!
//! - A key is consumed at most once. A second fetch fails with
//!   [`ConfigError::Reassignment`] whatever schema or default it uses.
//! - A key is consumed only after its value validated, or after a default
//!   was back-filled for an absent key, and for typed fetches only after
//!   the conversion to the target type succeeded. A failed fetch leaves
//!   the key fetchable and [`ConfigAccessor::data`] untouched.
//! - Every consumed key is present in [`ConfigAccessor::data`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use strictcfg_schema::{value_kind, IntoSchema, Schema, SchemaCache};

use crate::error::{BoxError, ConfigError, Result};
use crate::format::Format;

/// Validating, single-assignment access to one configuration file.
///
/// Not internally synchronized: fetches and schema registration take
/// `&mut self`.
#[derive(Debug)]
pub struct ConfigAccessor {
    path: PathBuf,
    data: Map<String, Value>,
    consumed: Vec<String>,
    consumed_index: HashSet<String>,
    schemas: SchemaCache,
}

/// Outcome of a fetch that has not been recorded yet.
struct Resolved {
    value: Value,
    defaulted: bool,
}

impl ConfigAccessor {
    /// Load the file at `path`, choosing the parser from its extension.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::FileExtension`] if the extension is not `yml`,
    ///   `yaml` or `json`. Raised before the file is touched.
    /// - [`ConfigError::Read`] if the file cannot be read.
    /// - [`ConfigError::Parse`] if the content is malformed or its root is
    ///   not a mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path).ok_or_else(|| ConfigError::FileExtension {
            path: path.display().to_string(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        Self::open_with(path, |text| format.parse(text))
    }

    /// Load the file at `path` with an explicit parser, whatever its
    /// extension. Parser arguments are captured by the closure.
    pub fn open_with<F, E>(path: impl AsRef<Path>, parse: F) -> Result<Self>
    where
        F: FnOnce(&str) -> std::result::Result<Value, E>,
        E: Into<BoxError>,
    {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let document = parse(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e.into(),
        })?;
        Self::from_document(path, document)
    }

    /// Build an accessor from text already in memory. `label` takes the
    /// place of the file path in diagnostics.
    pub fn from_text(label: impl Into<PathBuf>, text: &str, format: Format) -> Result<Self> {
        let path = label.into();
        let document = format.parse(text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_document(path, document)
    }

    fn from_document(path: PathBuf, document: Value) -> Result<Self> {
        let data = match document {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::Parse {
                    path: path.display().to_string(),
                    source: format!(
                        "top-level value is a {}, expected a mapping",
                        value_kind(&other)
                    )
                    .into(),
                })
            }
        };
        tracing::info!(path = %path.display(), keys = data.len(), "configuration loaded");
        Ok(Self {
            path,
            data,
            consumed: Vec::new(),
            consumed_index: HashSet::new(),
            schemas: SchemaCache::new(),
        })
    }

    /// Path the configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current top-level mapping, including back-filled defaults and
    /// normalized values of fetched keys.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Keys fetched so far, in call order.
    pub fn consumed(&self) -> &[String] {
        &self.consumed
    }

    pub fn is_consumed(&self, name: &str) -> bool {
        self.consumed_index.contains(name)
    }

    /// Fetch `name`, validated against `schema`. The key must be present.
    ///
    /// Returns the normalized value, which also replaces the raw value in
    /// [`data`](Self::data).
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyKey`] for an empty `name`.
    /// - [`ConfigError::Reassignment`] if `name` was already fetched.
    /// - [`ConfigError::InvalidSchema`] if `schema` does not compile.
    /// - [`ConfigError::IncompleteConfig`] if `name` is absent.
    /// - [`ConfigError::Validation`] if the value does not conform.
    pub fn fetch(&mut self, name: &str, schema: impl IntoSchema) -> Result<Value> {
        let resolved = self.resolve(name, schema, None)?;
        Ok(self.commit(name, resolved))
    }

    /// Fetch `name`, falling back to `default` when it is absent.
    ///
    /// The default is back-filled into [`data`](Self::data) and trusted:
    /// it is not validated. `Value::Null` is a legitimate default.
    pub fn fetch_or(
        &mut self,
        name: &str,
        schema: impl IntoSchema,
        default: impl Into<Value>,
    ) -> Result<Value> {
        let resolved = self.resolve(name, schema, Some(default.into()))?;
        Ok(self.commit(name, resolved))
    }

    /// [`fetch`](Self::fetch), then deserialize the normalized value into `T`.
    ///
    /// The key is consumed only if the conversion succeeds.
    pub fn fetch_as<T>(&mut self, name: &str, schema: impl IntoSchema) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let resolved = self.resolve(name, schema, None)?;
        let typed = Self::convert(name, &resolved.value)?;
        self.commit(name, resolved);
        Ok(typed)
    }

    /// [`fetch_or`](Self::fetch_or) with a typed default.
    pub fn fetch_as_or<T>(&mut self, name: &str, schema: impl IntoSchema, default: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let default = serde_json::to_value(&default).map_err(|source| ConfigError::Serialize {
            key: name.to_string(),
            source,
        })?;
        let resolved = self.resolve(name, schema, Some(default))?;
        let typed = Self::convert(name, &resolved.value)?;
        self.commit(name, resolved);
        Ok(typed)
    }

    fn convert<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T> {
        T::deserialize(value).map_err(|source| ConfigError::Deserialize {
            key: name.to_string(),
            source,
        })
    }

    /// Pick the value a fetch would hand out, without recording anything.
    fn resolve(
        &self,
        name: &str,
        schema: impl IntoSchema,
        default: Option<Value>,
    ) -> Result<Resolved> {
        if name.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        if self.is_consumed(name) {
            return Err(ConfigError::Reassignment {
                key: name.to_string(),
            });
        }
        let schema = schema
            .into_schema()
            .map_err(|source| ConfigError::InvalidSchema {
                key: name.to_string(),
                source,
            })?;

        match (self.data.get(name), default) {
            (Some(raw), _) => {
                let value = schema
                    .validate(raw)
                    .map_err(|violations| ConfigError::Validation {
                        key: name.to_string(),
                        path: self.path.display().to_string(),
                        violations,
                    })?;
                Ok(Resolved {
                    value,
                    defaulted: false,
                })
            }
            (None, Some(value)) => Ok(Resolved {
                value,
                defaulted: true,
            }),
            (None, None) => Err(ConfigError::IncompleteConfig {
                key: name.to_string(),
                path: self.path.display().to_string(),
            }),
        }
    }

    /// Write the resolved value back and mark `name` consumed.
    fn commit(&mut self, name: &str, resolved: Resolved) -> Value {
        let Resolved { value, defaulted } = resolved;
        self.data.insert(name.to_string(), value.clone());
        self.consumed.push(name.to_string());
        self.consumed_index.insert(name.to_string());
        tracing::debug!(key = name, defaulted, "configuration key fetched");
        value
    }

    /// Compile `schema` and register it under `name` for reuse. Re-assigning
    /// a name replaces the previous schema. Never touches consumed keys.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidatorManagement`] if `name` is empty or the
    /// schema does not compile.
    pub fn set_schema(&mut self, name: &str, schema: impl IntoSchema) -> Result<()> {
        if name.is_empty() {
            return Err(ConfigError::ValidatorManagement {
                name: String::new(),
                reason: "schema name must not be empty".to_string(),
            });
        }
        let replaced = self
            .schemas
            .set(name, schema)
            .map_err(|e| ConfigError::ValidatorManagement {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(name, replaced = replaced.is_some(), "schema registered");
        Ok(())
    }

    /// Look up a schema registered with [`set_schema`](Self::set_schema).
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidatorManagement`] if `name` was never registered.
    pub fn get_schema(&self, name: &str) -> Result<Schema> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::ValidatorManagement {
                name: name.to_string(),
                reason: "no schema registered under this name".to_string(),
            })
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Keys present in [`data`](Self::data) that were never fetched, sorted.
    pub fn unused_keys(&self) -> Vec<&str> {
        let mut unused: Vec<&str> = self
            .data
            .keys()
            .map(String::as_str)
            .filter(|key| !self.consumed_index.contains(*key))
            .collect();
        unused.sort_unstable();
        unused
    }

    /// Fail if any key in the file was never fetched.
    ///
    /// Only meaningful once every intended fetch has happened. Calling it
    /// repeatedly without intervening fetches gives the same answer.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RedundantConfig`] listing every unused key.
    pub fn audit(&self) -> Result<()> {
        let unused = self.unused_keys();
        if unused.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = unused.into_iter().map(str::to_string).collect();
        tracing::warn!(
            path = %self.path.display(),
            unused = %keys.join(", "),
            "configuration has unused keys"
        );
        Err(ConfigError::RedundantConfig {
            path: self.path.display().to_string(),
            keys,
        })
    }
}
