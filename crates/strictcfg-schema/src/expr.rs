//! # Schema Expressions
//!
//! A [`SchemaExpr`] describes the expected shape of a configuration value.
//! Expressions are plain data: they are built with the constructor
//! functions below (or parsed from a literal with
//! [`SchemaExpr::from_value`]) and compiled exactly once into a
//! [`Schema`] before any value is checked.
//!
//! ## Literal Schemas
//!
//! Short schemas can be written as JSON literals, mirroring the way a
//! configuration file itself is written:
//!
//! | Literal | Expression |
//! |---|---|
//! | `"int"`, `"float"`, `"str"`, `"bool"`, `"null"`, `"any"` | [`SchemaExpr::Scalar`] |
//! | `["int"]` | [`SchemaExpr::Sequence`] of the single element |
//! | `{"user": "str", "port": "int"}` | [`SchemaExpr::Mapping`] with every field required |

use std::fmt;

use serde_json::Value;

use crate::validate::{value_kind, Schema, SchemaError};

/// The primitive kinds a configuration value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Accepts every value unchanged.
    Any,
    /// Only `null`.
    Null,
    /// `true` or `false`.
    Bool,
    /// Whole numbers. Floats and booleans are rejected.
    Integer,
    /// Any number. Integers are normalized to floating point.
    Float,
    /// Text.
    String,
}

impl ScalarType {
    /// Short name used in literal schemas and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "int",
            Self::Float => "float",
            Self::String => "str",
        }
    }

    /// Resolve a type name from a literal schema.
    ///
    /// Accepts the short names returned by [`ScalarType::name`] as well as
    /// the long spellings `boolean`, `integer`, `number` and `string`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "any" => Some(Self::Any),
            "null" => Some(Self::Null),
            "bool" | "boolean" => Some(Self::Bool),
            "int" | "integer" => Some(Self::Integer),
            "float" | "number" => Some(Self::Float),
            "str" | "string" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a mapping schema treats keys it does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtraKeys {
    /// Undeclared keys are violations.
    #[default]
    Reject,
    /// Undeclared keys pass through unchecked.
    Allow,
    /// Undeclared keys are silently dropped from the normalized value.
    Remove,
}

/// One declared field of a [`SchemaExpr::Mapping`].
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) schema: SchemaExpr,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
}

impl Field {
    /// The field must be present.
    pub fn required(schema: impl Into<SchemaExpr>) -> Self {
        Self {
            schema: schema.into(),
            required: true,
            default: None,
        }
    }

    /// The field may be absent. Nothing is filled in when it is.
    pub fn optional(schema: impl Into<SchemaExpr>) -> Self {
        Self {
            schema: schema.into(),
            required: false,
            default: None,
        }
    }

    /// The field may be absent, in which case `default` is filled into the
    /// normalized value. The default itself is not validated.
    pub fn with_default(schema: impl Into<SchemaExpr>, default: impl Into<Value>) -> Self {
        Self {
            schema: schema.into(),
            required: false,
            default: Some(default.into()),
        }
    }

    pub fn schema(&self) -> &SchemaExpr {
        &self.schema
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

impl From<SchemaExpr> for Field {
    fn from(schema: SchemaExpr) -> Self {
        Self::required(schema)
    }
}

impl From<ScalarType> for Field {
    fn from(scalar: ScalarType) -> Self {
        Self::required(scalar)
    }
}

impl From<Schema> for Field {
    fn from(schema: Schema) -> Self {
        Self::required(schema)
    }
}

/// A schema expression, compiled into a [`Schema`] before use.
#[derive(Debug, Clone)]
pub enum SchemaExpr {
    /// The value must be of exactly this kind.
    Scalar(ScalarType),
    /// The value must be of this kind or convertible into it
    /// (`"42"` → `42`, `7` → `"7"`, `"yes"` → `true`).
    Coerce(ScalarType),
    /// The value must equal this literal.
    Literal(Value),
    /// An array whose every item matches the inner schema.
    Sequence(Box<SchemaExpr>),
    /// An object with declared fields.
    Mapping {
        fields: Vec<(String, Field)>,
        extra: ExtraKeys,
    },
    /// An object with arbitrary keys whose every value matches the inner schema.
    MapOf(Box<SchemaExpr>),
    /// `null`, or a value matching the inner schema.
    Maybe(Box<SchemaExpr>),
    /// The first alternative that matches wins.
    AnyOf(Vec<SchemaExpr>),
    /// A JSON Schema (Draft 2020-12) document.
    JsonSchema(Value),
    /// An already compiled schema, e.g. one fetched from a [`SchemaCache`].
    ///
    /// [`SchemaCache`]: crate::SchemaCache
    Validator(Schema),
}

impl SchemaExpr {
    pub fn any() -> Self {
        Self::Scalar(ScalarType::Any)
    }

    pub fn null() -> Self {
        Self::Scalar(ScalarType::Null)
    }

    pub fn boolean() -> Self {
        Self::Scalar(ScalarType::Bool)
    }

    pub fn integer() -> Self {
        Self::Scalar(ScalarType::Integer)
    }

    pub fn float() -> Self {
        Self::Scalar(ScalarType::Float)
    }

    pub fn string() -> Self {
        Self::Scalar(ScalarType::String)
    }

    pub fn coerce(scalar: ScalarType) -> Self {
        Self::Coerce(scalar)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn sequence(inner: impl Into<SchemaExpr>) -> Self {
        Self::Sequence(Box::new(inner.into()))
    }

    /// A mapping that rejects undeclared keys. Chain
    /// [`with_extra`](Self::with_extra) to change that.
    pub fn mapping<I, K, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
        F: Into<Field>,
    {
        Self::Mapping {
            fields: fields
                .into_iter()
                .map(|(name, field)| (name.into(), field.into()))
                .collect(),
            extra: ExtraKeys::default(),
        }
    }

    pub fn map_of(inner: impl Into<SchemaExpr>) -> Self {
        Self::MapOf(Box::new(inner.into()))
    }

    pub fn maybe(inner: impl Into<SchemaExpr>) -> Self {
        Self::Maybe(Box::new(inner.into()))
    }

    pub fn any_of<I, E>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<SchemaExpr>,
    {
        Self::AnyOf(alternatives.into_iter().map(Into::into).collect())
    }

    pub fn json_schema(document: Value) -> Self {
        Self::JsonSchema(document)
    }

    /// Set the undeclared-key policy. No effect on non-mapping expressions.
    #[must_use]
    pub fn with_extra(self, policy: ExtraKeys) -> Self {
        match self {
            Self::Mapping { fields, .. } => Self::Mapping {
                fields,
                extra: policy,
            },
            other => other,
        }
    }

    /// Parse a literal schema (see the module docs for the accepted forms).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidExpression`] for unknown type names,
    /// arrays that do not hold exactly one element, and values that have
    /// no schema meaning (numbers, booleans, `null`).
    pub fn from_value(literal: &Value) -> Result<Self, SchemaError> {
        match literal {
            Value::String(name) => ScalarType::from_name(name)
                .map(Self::Scalar)
                .ok_or_else(|| SchemaError::InvalidExpression {
                    reason: format!("unknown type name \"{name}\""),
                }),
            Value::Array(items) => match items.as_slice() {
                [inner] => Ok(Self::sequence(Self::from_value(inner)?)),
                _ => Err(SchemaError::InvalidExpression {
                    reason: format!(
                        "sequence schema must hold exactly one item schema, found {}",
                        items.len()
                    ),
                }),
            },
            Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (name, inner) in map {
                    fields.push((name.clone(), Field::required(Self::from_value(inner)?)));
                }
                Ok(Self::Mapping {
                    fields,
                    extra: ExtraKeys::Reject,
                })
            }
            other => Err(SchemaError::InvalidExpression {
                reason: format!("a {} is not a schema", value_kind(other)),
            }),
        }
    }
}

impl From<ScalarType> for SchemaExpr {
    fn from(scalar: ScalarType) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<Schema> for SchemaExpr {
    fn from(schema: Schema) -> Self {
        Self::Validator(schema)
    }
}

impl From<&Schema> for SchemaExpr {
    fn from(schema: &Schema) -> Self {
        Self::Validator(schema.clone())
    }
}

/// Anything that can stand in for a compiled [`Schema`].
///
/// Implemented for compiled schemas (a no-op), expressions and bare
/// scalar types (compiled on the spot).
pub trait IntoSchema {
    fn into_schema(self) -> Result<Schema, SchemaError>;
}

impl IntoSchema for Schema {
    fn into_schema(self) -> Result<Schema, SchemaError> {
        Ok(self)
    }
}

impl IntoSchema for &Schema {
    fn into_schema(self) -> Result<Schema, SchemaError> {
        Ok(self.clone())
    }
}

impl IntoSchema for SchemaExpr {
    fn into_schema(self) -> Result<Schema, SchemaError> {
        Schema::compile(self)
    }
}

impl IntoSchema for ScalarType {
    fn into_schema(self) -> Result<Schema, SchemaError> {
        Schema::compile(SchemaExpr::Scalar(self))
    }
}
