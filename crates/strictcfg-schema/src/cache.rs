//! Named registry of compiled schemas.
//!
//! Lets a caller compile a sub-schema once (a credential pair, a listener
//! address) and reference it from several composite schemas by name.

use std::collections::HashMap;

use crate::expr::IntoSchema;
use crate::validate::{Schema, SchemaError};

/// A mapping from schema name to compiled [`Schema`]. Re-assigning a name
/// replaces the previous entry.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    schemas: HashMap<String, Schema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `schema` and store it under `name`, returning the entry it
    /// replaced, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the schema does not compile. The cache is
    /// left untouched in that case.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        schema: impl IntoSchema,
    ) -> Result<Option<Schema>, SchemaError> {
        let compiled = schema.into_schema()?;
        Ok(self.schemas.insert(name.into(), compiled))
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Schema> {
        self.schemas.remove(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns the registered names, sorted alphabetically.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}
