//! Integration tests: load real files from `tests/assets/` and temporary
//! directories, then drive the fetch / audit protocol end to end.

use std::io::Write;
use std::path::PathBuf;

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use strictcfg::{
    BoxError, ConfigAccessor, ConfigError, ConfigErrorKind, Field, Format, ScalarType, Schema,
    SchemaExpr,
};

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("assets")
        .join(name)
}

/// Parse `key<sep>value` lines, the values as integers when they look like one.
fn parse_pairs(text: &str, separator: char) -> Result<Value, BoxError> {
    let mut map = Map::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let (key, value) = line
            .split_once(separator)
            .ok_or_else(|| format!("line without '{separator}': {line}"))?;
        let value = value.trim();
        let parsed = value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value));
        map.insert(key.trim().to_string(), parsed);
    }
    Ok(Value::Object(map))
}

#[test]
fn test_yaml() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();

    assert_eq!(config.fetch("a", ScalarType::Integer).unwrap(), json!(13));
    assert_eq!(config.fetch("b", ScalarType::String).unwrap(), json!("foo"));
    assert_eq!(config.fetch("c", ScalarType::Float).unwrap(), json!(4.44));
    assert_eq!(
        config
            .fetch("cool_list", SchemaExpr::sequence(ScalarType::Integer))
            .unwrap(),
        json!([6, 12])
    );
    assert_eq!(
        config
            .fetch(
                "cool_dict",
                SchemaExpr::mapping([("khrum", ScalarType::String), ("dfght", ScalarType::Integer)]),
            )
            .unwrap(),
        json!({"khrum": "bar", "dfght": 90})
    );
    config.audit().unwrap();
}

#[test]
fn test_json() {
    let mut config = ConfigAccessor::open(asset("1.json")).unwrap();

    assert_eq!(config.fetch("foo", ScalarType::String).unwrap(), json!("TheBar!"));
    let my_list: Vec<String> = config
        .fetch_as("my_list", SchemaExpr::sequence(ScalarType::String))
        .unwrap();
    assert_eq!(my_list, vec!["the_first", "the_next"]);
    config.audit().unwrap();
}

#[test]
fn test_literal_schemas() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();
    let list = Schema::from_literal(&json!(["int"])).unwrap();
    let dict = Schema::from_literal(&json!({"khrum": "str", "dfght": "int"})).unwrap();
    assert_eq!(config.fetch("cool_list", list).unwrap(), json!([6, 12]));
    assert_eq!(config.fetch("cool_dict", dict).unwrap()["dfght"], 90);
}

#[test]
fn test_wrong_extension() {
    let err = ConfigAccessor::open(asset("1.wrong")).unwrap_err();
    match err {
        ConfigError::FileExtension { extension, .. } => assert_eq!(extension, "wrong"),
        other => panic!("Expected FileExtension, got: {other}"),
    }
}

#[test]
fn test_wrong_extension_checked_before_reading() {
    let err = ConfigAccessor::open(asset("does-not-exist.toml")).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::FileExtension);
}

#[test]
fn test_cant_access() {
    let err = ConfigAccessor::open(asset("99.yml")).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Read);
    assert!(err.to_string().contains("99.yml"));
}

#[test]
fn test_cant_load() {
    let err = ConfigAccessor::open(asset("bad.json")).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Parse);
    assert!(err.to_string().contains("bad.json"));
}

#[test]
fn test_incomplete_config() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();
    let err = config.fetch("I_Want_This_Please", ScalarType::Integer).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::IncompleteConfig);
    assert!(err.to_string().contains("1.yml"));
}

#[test]
fn test_validation_error() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();
    let err = config.fetch("b", ScalarType::Integer).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Validation);
    assert!(err.to_string().contains("expected int, found string"));
}

#[test]
fn test_multiple_loading() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();
    config.fetch("a", ScalarType::Integer).unwrap();
    let err = config.fetch("a", ScalarType::Integer).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Reassignment);
}

#[test]
fn test_audit_names_unfetched_keys() {
    let mut config = ConfigAccessor::open(asset("1.yml")).unwrap();
    config.fetch("a", ScalarType::Integer).unwrap();
    config.fetch("b", ScalarType::String).unwrap();
    match config.audit().unwrap_err() {
        ConfigError::RedundantConfig { keys, .. } => {
            assert_eq!(keys, vec!["c", "cool_dict", "cool_list"]);
        }
        other => panic!("Expected RedundantConfig, got: {other}"),
    }
}

#[test]
fn test_explicit_parser_for_custom_extension() {
    let separator = '=';
    let mut config =
        ConfigAccessor::open_with(asset("1.wrong"), |text| parse_pairs(text, separator)).unwrap();
    assert_eq!(config.fetch("a", ScalarType::Integer).unwrap(), json!(13));
    config.audit().unwrap();
}

#[test]
fn test_explicit_parser_overrides_extension() {
    let config = ConfigAccessor::open_with(asset("1.json"), |_| -> Result<Value, BoxError> {
        Ok(json!({"overridden": true}))
    })
    .unwrap();
    assert_eq!(config.unused_keys(), vec!["overridden"]);
}

#[test]
fn test_explicit_parser_failure_is_parse_error() {
    let err = ConfigAccessor::open_with(asset("1.yml"), |text| parse_pairs(text, '=')).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Parse);
    assert!(err.to_string().contains("line without '='"));
}

#[test]
fn test_empty_yaml_file_is_empty_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    std::fs::File::create(&path).unwrap();

    let mut config = ConfigAccessor::open(&path).unwrap();
    assert!(config.data().is_empty());
    assert_eq!(config.fetch_or("retries", ScalarType::Integer, 3).unwrap(), json!(3));
    config.audit().unwrap();
}

#[test]
fn test_directory_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.yml");
    std::fs::create_dir(&path).unwrap();

    let err = ConfigAccessor::open(&path).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::Read);
}

#[test]
fn test_service_startup_flow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "listen: \"8080\"\n\
         database:\n  primary:\n    user: app\n    password: s3cret\n  replica:\n    user: ro\n    password: r3ad\n\
         features: [search, export]"
    )
    .unwrap();
    drop(file);

    let mut config = ConfigAccessor::open(&path).unwrap();
    config
        .set_schema(
            "credentials",
            SchemaExpr::mapping([("user", ScalarType::String), ("password", ScalarType::String)]),
        )
        .unwrap();
    let credentials = config.get_schema("credentials").unwrap();

    let port: u16 = config
        .fetch_as("listen", SchemaExpr::coerce(ScalarType::Integer))
        .unwrap();
    assert_eq!(port, 8080);

    let database = config
        .fetch(
            "database",
            SchemaExpr::mapping([
                ("primary", Field::required(&credentials)),
                ("replica", Field::optional(&credentials)),
                ("pool_size", Field::with_default(ScalarType::Integer, 10)),
            ]),
        )
        .unwrap();
    assert_eq!(database["pool_size"], 10);
    assert_eq!(database["replica"]["user"], "ro");

    config
        .fetch("features", SchemaExpr::sequence(ScalarType::String))
        .unwrap();
    let timeout = config
        .fetch_or("timeout_secs", ScalarType::Integer, 30)
        .unwrap();
    assert_eq!(timeout, json!(30));

    config.audit().unwrap();
    assert_eq!(
        config.consumed(),
        ["listen", "database", "features", "timeout_secs"]
    );
}

#[test]
fn test_from_text_matches_file_loading() {
    let text = std::fs::read_to_string(asset("1.yml")).unwrap();
    let from_text = ConfigAccessor::from_text("inline.yml", &text, Format::Yaml).unwrap();
    let from_file = ConfigAccessor::open(asset("1.yml")).unwrap();
    assert_eq!(from_text.data(), from_file.data());
    assert_eq!(from_text.path(), std::path::Path::new("inline.yml"));
}

fn key_map() -> impl Strategy<Value = std::collections::BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..12)
}

proptest! {
    #[test]
    fn prop_every_key_fetches_once(entries in key_map()) {
        let doc = serde_json::to_string(&entries).unwrap();
        let mut config = ConfigAccessor::from_text("prop.json", &doc, Format::Json).unwrap();
        for (key, value) in &entries {
            prop_assert_eq!(config.fetch(key, ScalarType::Integer).unwrap(), json!(value));
        }
        for key in entries.keys() {
            let err = config.fetch_or(key, ScalarType::Any, 0).unwrap_err();
            prop_assert_eq!(err.kind(), ConfigErrorKind::Reassignment);
        }
        prop_assert!(config.audit().is_ok());
    }

    #[test]
    fn prop_audit_reports_exactly_the_unfetched(entries in key_map(), mask in prop::collection::vec(any::<bool>(), 12)) {
        let doc = serde_json::to_string(&entries).unwrap();
        let mut config = ConfigAccessor::from_text("prop.json", &doc, Format::Json).unwrap();
        let mut expected = Vec::new();
        for (index, key) in entries.keys().enumerate() {
            if mask[index] {
                config.fetch(key, ScalarType::Integer).unwrap();
            } else {
                expected.push(key.clone());
            }
        }
        match config.audit() {
            Ok(()) => prop_assert!(expected.is_empty()),
            Err(ConfigError::RedundantConfig { keys, .. }) => prop_assert_eq!(keys, expected),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
