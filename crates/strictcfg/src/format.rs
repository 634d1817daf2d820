//! # File Formats
//!
//! Built-in parsers for the formats recognized by file extension:
//! `.yml`/`.yaml` → YAML, `.json` → JSON. Both produce a
//! `serde_json::Value`; YAML documents are converted into the JSON value
//! model right after parsing so the rest of the crate sees one value type.
//!
//! YAML is parsed with `serde_yaml`, which builds plain data only and
//! never constructs application objects from tags.

use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::error::BoxError;

/// A configuration file format with a built-in parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Map an extension (without the dot) to a format. Matching is exact:
    /// `YML` is not recognized.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse `text` into a structured value.
    ///
    /// An empty or whitespace-only YAML document parses to `null`. JSON has
    /// no empty document, so empty JSON text is a parse error.
    pub fn parse(self, text: &str) -> Result<Value, BoxError> {
        match self {
            Self::Yaml => {
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                let yaml_value: serde_yaml::Value = serde_yaml::from_str(text)?;
                Ok(yaml_to_json_value(&yaml_value)?)
            }
            Self::Json => Ok(serde_json::from_str(text)?),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("yaml"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Tags are dropped and their inner value kept. Mapping keys that are
/// numbers or booleans are stringified; sequences or mappings used as keys
/// have no JSON equivalent and are rejected, as are NaN and infinities.
pub(crate) fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(Format::from_extension("yml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("json"), Some(Format::Json));
        assert_eq!(Format::from_extension("YML"), None);
        assert_eq!(Format::from_extension("toml"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Format::from_path(Path::new("conf/app.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("app.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("app.wrong")), None);
        assert_eq!(Format::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_yaml_to_json_conversion() {
        let yaml_str = r#"
a: 13
b: foo
c: 4.44
enabled: true
cool_list:
  - 6
  - 12
cool_dict:
  khrum: bar
  dfght: 90
"#;
        let value = Format::Yaml.parse(yaml_str).unwrap();
        assert_eq!(
            value,
            json!({
                "a": 13,
                "b": "foo",
                "c": 4.44,
                "enabled": true,
                "cool_list": [6, 12],
                "cool_dict": {"khrum": "bar", "dfght": 90},
            })
        );
    }

    #[test]
    fn test_yaml_scalar_keys_are_stringified() {
        let value = Format::Yaml.parse("1: one\ntrue: yes_value\n").unwrap();
        assert_eq!(value["1"], "one");
        assert_eq!(value["true"], "yes_value");
    }

    #[test]
    fn test_yaml_tags_are_dropped() {
        let value = Format::Yaml.parse("port: !port 8080\n").unwrap();
        assert_eq!(value["port"], 8080);
    }

    #[test]
    fn test_yaml_complex_keys_rejected() {
        let err = Format::Yaml.parse("? [a, b]\n: value\n").unwrap_err();
        assert!(err.to_string().contains("unsupported YAML map key"));
    }

    #[test]
    fn test_yaml_nan_rejected() {
        assert!(Format::Yaml.parse("ratio: .nan\n").is_err());
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(Format::Yaml.parse("").unwrap(), Value::Null);
        assert_eq!(Format::Yaml.parse("  \n").unwrap(), Value::Null);
        assert!(Format::Json.parse("").is_err());
    }

    #[test]
    fn test_malformed_input() {
        assert!(Format::Json.parse("{\"a\": ").is_err());
        assert!(Format::Yaml.parse("a: [1, 2").is_err());
    }
}
