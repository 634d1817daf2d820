//! # Schema Validation
//!
//! Compiles [`SchemaExpr`] trees into [`Schema`] validators and runs them
//! against `serde_json::Value` documents.
//!
//! ## Normalization
//!
//! Validation is not a yes/no check. A successful run returns the
//! *normalized* value: coercions applied, integers widened where a float
//! was asked for, mapping defaults filled in and removable extras dropped.
//! Callers must use the returned value, not the input.
//!
//! ## Violations
//!
//! A failed run reports every violation found in the document, each with
//! the JSON Pointer to the offending value and the path within the schema
//! that rejected it, in the same shape the JSON Schema backend reports.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::expr::{ExtraKeys, ScalarType, SchemaExpr};

/// A schema expression could not be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The expression has no schema meaning.
    #[error("invalid schema expression: {reason}")]
    InvalidExpression {
        /// What was wrong with it.
        reason: String,
    },

    /// An `AnyOf` with nothing to choose from can never match.
    #[error("alternative schema has no alternatives")]
    EmptyAlternatives,

    /// A mapping schema declared a field with an empty name.
    #[error("mapping schema declares a field with an empty name")]
    EmptyFieldName,

    /// A mapping schema declared the same field twice.
    #[error("mapping schema declares field \"{name}\" more than once")]
    DuplicateField {
        /// The repeated field name.
        name: String,
    },

    /// The JSON Schema document could not be compiled.
    #[error("json schema could not be compiled: {reason}")]
    JsonSchema {
        /// Diagnostic from the JSON Schema compiler.
        reason: String,
    },
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating value in the instance.
    pub instance_path: String,
    /// Path within the schema that rejected the value.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl Violation {
    pub fn new(
        instance_path: impl Into<String>,
        schema_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            instance_path: instance_path.into(),
            schema_path: schema_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// A collection holding one violation at the document root.
    pub fn at_root(message: impl Into<String>) -> Self {
        Self::new(vec![Violation::new("", "", message)])
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A validation capability: checks a value and returns its normalized form.
///
/// Implement this to plug a custom validator into a schema tree via
/// [`Schema::custom`]. Violation paths are relative to the value passed
/// in; they are re-rooted when the validator runs nested in a larger
/// schema.
pub trait Validate: Send + Sync {
    fn validate(&self, value: &Value) -> Result<Value, ValidationViolations>;

    /// Short description used in diagnostics.
    fn describe(&self) -> String {
        "custom validator".to_string()
    }
}

/// A compiled schema.
///
/// Cheap to clone: the compiled tree is shared behind an `Arc`, so one
/// schema can be reused across many fetches and composite schemas.
#[derive(Clone)]
pub struct Schema {
    root: Arc<Node>,
}

impl Schema {
    /// Compile an expression.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if any part of the expression tree is
    /// malformed: empty alternatives, empty or duplicate field names, or
    /// a JSON Schema document the backend refuses.
    pub fn compile(expr: SchemaExpr) -> Result<Self, SchemaError> {
        Ok(Self {
            root: Arc::new(Node::compile(expr)?),
        })
    }

    /// Parse and compile a literal schema in one step.
    pub fn from_literal(literal: &Value) -> Result<Self, SchemaError> {
        Self::compile(SchemaExpr::from_value(literal)?)
    }

    /// Wrap a custom validator.
    pub fn custom(validator: impl Validate + 'static) -> Self {
        Self {
            root: Arc::new(Node::Custom(Arc::new(validator))),
        }
    }

    /// Wrap a closure returning the normalized value or a message.
    pub fn from_fn<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::custom(FnValidator {
            description: description.into(),
            check,
        })
    }

    /// Validate `value`, returning its normalized form.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationViolations> {
        let mut violations = Vec::new();
        match self.root.eval(value, "", "", &mut violations) {
            Some(normalized) if violations.is_empty() => Ok(normalized),
            _ => Err(ValidationViolations::new(violations)),
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    /// Compact description of the expected shape, e.g. `{host: str, port?: int}`.
    pub fn describe(&self) -> String {
        self.root.describe()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.describe()).finish()
    }
}

impl Validate for Schema {
    fn validate(&self, value: &Value) -> Result<Value, ValidationViolations> {
        Schema::validate(self, value)
    }

    fn describe(&self) -> String {
        Schema::describe(self)
    }
}

struct FnValidator<F> {
    description: String,
    check: F,
}

impl<F> Validate for FnValidator<F>
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationViolations> {
        (self.check)(value).map_err(ValidationViolations::at_root)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Name of a value's kind, as used in diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

struct CompiledField {
    name: String,
    node: Node,
    required: bool,
    default: Option<Value>,
}

enum Node {
    Scalar(ScalarType),
    Coerce(ScalarType),
    Literal(Value),
    Sequence(Box<Node>),
    Mapping {
        fields: Vec<CompiledField>,
        extra: ExtraKeys,
    },
    MapOf(Box<Node>),
    Maybe(Box<Node>),
    AnyOf(Vec<Node>),
    JsonSchema(jsonschema::Validator),
    Delegate(Schema),
    Custom(Arc<dyn Validate>),
}

impl Node {
    fn compile(expr: SchemaExpr) -> Result<Self, SchemaError> {
        let node = match expr {
            SchemaExpr::Scalar(scalar) => Self::Scalar(scalar),
            SchemaExpr::Coerce(scalar) => Self::Coerce(scalar),
            SchemaExpr::Literal(value) => Self::Literal(value),
            SchemaExpr::Sequence(inner) => Self::Sequence(Box::new(Self::compile(*inner)?)),
            SchemaExpr::Mapping { fields, extra } => {
                let mut compiled: Vec<CompiledField> = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    if name.is_empty() {
                        return Err(SchemaError::EmptyFieldName);
                    }
                    if compiled.iter().any(|f| f.name == name) {
                        return Err(SchemaError::DuplicateField { name });
                    }
                    compiled.push(CompiledField {
                        name,
                        node: Self::compile(field.schema)?,
                        required: field.required,
                        default: field.default,
                    });
                }
                Self::Mapping {
                    fields: compiled,
                    extra,
                }
            }
            SchemaExpr::MapOf(inner) => Self::MapOf(Box::new(Self::compile(*inner)?)),
            SchemaExpr::Maybe(inner) => Self::Maybe(Box::new(Self::compile(*inner)?)),
            SchemaExpr::AnyOf(alternatives) => {
                if alternatives.is_empty() {
                    return Err(SchemaError::EmptyAlternatives);
                }
                Self::AnyOf(
                    alternatives
                        .into_iter()
                        .map(Self::compile)
                        .collect::<Result<_, _>>()?,
                )
            }
            SchemaExpr::JsonSchema(document) => {
                let mut opts = jsonschema::options();
                opts.with_draft(jsonschema::Draft::Draft202012);
                let validator = opts.build(&document).map_err(|e| SchemaError::JsonSchema {
                    reason: e.to_string(),
                })?;
                Self::JsonSchema(validator)
            }
            SchemaExpr::Validator(schema) => Self::Delegate(schema),
        };
        Ok(node)
    }

    /// Returns the normalized value, or `None` after pushing at least one
    /// violation.
    fn eval(
        &self,
        value: &Value,
        instance: &str,
        schema: &str,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        match self {
            Self::Scalar(scalar) => {
                let checked = check_scalar(*scalar, value);
                if checked.is_none() {
                    out.push(self.mismatch(value, instance, schema));
                }
                checked
            }
            Self::Coerce(scalar) => {
                let coerced = coerce_scalar(*scalar, value);
                if coerced.is_none() {
                    out.push(Violation::new(
                        instance,
                        schema,
                        format!(
                            "cannot convert {} {} to {}",
                            value_kind(value),
                            value,
                            scalar
                        ),
                    ));
                }
                coerced
            }
            Self::Literal(expected) => {
                if value == expected {
                    Some(value.clone())
                } else {
                    out.push(Violation::new(
                        instance,
                        schema,
                        format!("expected {expected}, found {value}"),
                    ));
                    None
                }
            }
            Self::Sequence(item) => {
                let Value::Array(items) = value else {
                    out.push(self.mismatch(value, instance, schema));
                    return None;
                };
                let item_schema = format!("{schema}/items");
                let mut normalized = Vec::with_capacity(items.len());
                let mut ok = true;
                for (index, element) in items.iter().enumerate() {
                    let at = format!("{instance}/{index}");
                    match item.eval(element, &at, &item_schema, out) {
                        Some(v) => normalized.push(v),
                        None => ok = false,
                    }
                }
                ok.then_some(Value::Array(normalized))
            }
            Self::Mapping { fields, extra } => {
                let Value::Object(map) = value else {
                    out.push(self.mismatch(value, instance, schema));
                    return None;
                };
                let mut normalized = Map::new();
                let mut ok = true;
                for field in fields {
                    let key = pointer_escape(&field.name);
                    match map.get(&field.name) {
                        Some(present) => {
                            let at = format!("{instance}/{key}");
                            let field_schema = format!("{schema}/properties/{key}");
                            match field.node.eval(present, &at, &field_schema, out) {
                                Some(v) => {
                                    normalized.insert(field.name.clone(), v);
                                }
                                None => ok = false,
                            }
                        }
                        None => {
                            if let Some(default) = &field.default {
                                normalized.insert(field.name.clone(), default.clone());
                            } else if field.required {
                                out.push(Violation::new(
                                    instance,
                                    format!("{schema}/required"),
                                    format!("\"{}\" is a required property", field.name),
                                ));
                                ok = false;
                            }
                        }
                    }
                }
                for (key, present) in map {
                    if fields.iter().any(|f| &f.name == key) {
                        continue;
                    }
                    match extra {
                        ExtraKeys::Reject => {
                            out.push(Violation::new(
                                format!("{instance}/{}", pointer_escape(key)),
                                format!("{schema}/additionalProperties"),
                                format!("additional property \"{key}\" is not allowed"),
                            ));
                            ok = false;
                        }
                        ExtraKeys::Allow => {
                            normalized.insert(key.clone(), present.clone());
                        }
                        ExtraKeys::Remove => {}
                    }
                }
                ok.then_some(Value::Object(normalized))
            }
            Self::MapOf(inner) => {
                let Value::Object(map) = value else {
                    out.push(self.mismatch(value, instance, schema));
                    return None;
                };
                let value_schema = format!("{schema}/additionalProperties");
                let mut normalized = Map::new();
                let mut ok = true;
                for (key, present) in map {
                    let at = format!("{instance}/{}", pointer_escape(key));
                    match inner.eval(present, &at, &value_schema, out) {
                        Some(v) => {
                            normalized.insert(key.clone(), v);
                        }
                        None => ok = false,
                    }
                }
                ok.then_some(Value::Object(normalized))
            }
            Self::Maybe(inner) => {
                if value.is_null() {
                    Some(Value::Null)
                } else {
                    inner.eval(value, instance, schema, out)
                }
            }
            Self::AnyOf(alternatives) => {
                for (index, alternative) in alternatives.iter().enumerate() {
                    let mut scratch = Vec::new();
                    let at = format!("{schema}/anyOf/{index}");
                    if let Some(v) = alternative.eval(value, instance, &at, &mut scratch) {
                        return Some(v);
                    }
                }
                out.push(Violation::new(
                    instance,
                    format!("{schema}/anyOf"),
                    format!("{value} does not match {}", self.describe()),
                ));
                None
            }
            Self::JsonSchema(validator) => {
                let before = out.len();
                out.extend(validator.iter_errors(value).map(|e| {
                    Violation::new(
                        format!("{instance}{}", e.instance_path),
                        format!("{schema}{}", e.schema_path),
                        e.to_string(),
                    )
                }));
                (out.len() == before).then(|| value.clone())
            }
            Self::Delegate(inner) => inner.root.eval(value, instance, schema, out),
            Self::Custom(validator) => match validator.validate(value) {
                Ok(v) => Some(v),
                Err(violations) => {
                    let mut reported = violations.into_inner();
                    if reported.is_empty() {
                        reported.push(Violation::new(
                            "",
                            "",
                            format!("rejected by {}", validator.describe()),
                        ));
                    }
                    out.extend(reported.into_iter().map(|v| {
                        Violation::new(
                            format!("{instance}{}", v.instance_path),
                            format!("{schema}{}", v.schema_path),
                            v.message,
                        )
                    }));
                    None
                }
            },
        }
    }

    fn mismatch(&self, value: &Value, instance: &str, schema: &str) -> Violation {
        Violation::new(
            instance,
            schema,
            format!("expected {}, found {}", self.describe(), value_kind(value)),
        )
    }

    fn describe(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.name().to_string(),
            Self::Coerce(scalar) => format!("coercible {scalar}"),
            Self::Literal(value) => value.to_string(),
            Self::Sequence(item) => format!("[{}]", item.describe()),
            Self::Mapping { fields, .. } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        let marker = if f.required { "" } else { "?" };
                        format!("{}{marker}: {}", f.name, f.node.describe())
                    })
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::MapOf(inner) => format!("{{str: {}}}", inner.describe()),
            Self::Maybe(inner) => format!("{}?", inner.describe()),
            Self::AnyOf(alternatives) => alternatives
                .iter()
                .map(Node::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            Self::JsonSchema(_) => "json schema".to_string(),
            Self::Delegate(inner) => inner.describe(),
            Self::Custom(validator) => validator.describe(),
        }
    }
}

fn check_scalar(scalar: ScalarType, value: &Value) -> Option<Value> {
    match (scalar, value) {
        (ScalarType::Any, v) => Some(v.clone()),
        (ScalarType::Null, Value::Null) => Some(Value::Null),
        (ScalarType::Bool, Value::Bool(_)) => Some(value.clone()),
        (ScalarType::Integer, Value::Number(n)) if !n.is_f64() => Some(value.clone()),
        (ScalarType::Float, Value::Number(n)) => {
            n.as_f64().and_then(Number::from_f64).map(Value::Number)
        }
        (ScalarType::String, Value::String(_)) => Some(value.clone()),
        _ => None,
    }
}

/// Bounds of the integers an `f64` can hold without leaving `i64`.
const I64_FLOAT_MIN: f64 = -9_223_372_036_854_775_808.0;
const I64_FLOAT_END: f64 = 9_223_372_036_854_775_808.0;

fn coerce_scalar(scalar: ScalarType, value: &Value) -> Option<Value> {
    if let Some(exact) = check_scalar(scalar, value) {
        return Some(exact);
    }
    match (scalar, value) {
        (ScalarType::Integer, Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
        }
        (ScalarType::Integer, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= I64_FLOAT_MIN && *f < I64_FLOAT_END)
            .map(|f| Value::from(f as i64)),
        (ScalarType::Integer, Value::Bool(b)) => Some(Value::from(i64::from(*b))),
        (ScalarType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ScalarType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ScalarType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (ScalarType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        (ScalarType::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        _ => None,
    }
}

fn pointer_escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
