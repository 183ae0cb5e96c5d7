use bzr_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// Validates:
/// 1) Unused keys are detected in WARN mode but do not error.
/// 2) Unused keys cause failure in FAIL mode.
/// 3) Keys the service reads are never flagged.
/// 4) Deterministic ordering of unused pointers.

#[test]
fn warn_mode_reports_misspelled_keys_without_error() {
    let yaml = r#"
server:
  bind_addr: "127.0.0.1:8899"
purchase:
  request_timeout_sec: 15
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/purchase/request_timeout_sec".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = r#"
legacy:
  cache_ttl: 60
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");
    let result = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail);

    let msg = format!("{:?}", result.err().expect("fail policy must error"));
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("/legacy/cache_ttl"));
}

#[test]
fn every_known_key_is_consumed() {
    let yaml = r#"
server:
  bind_addr: "127.0.0.1:8899"
  cors_origins: ["http://localhost:3000", "http://localhost:5173"]
database:
  url_env: "BZR_DATABASE_URL"
  max_connections: 4
files:
  base_url: "http://127.0.0.1:8081"
  timeout_secs: 5
purchase:
  request_timeout_secs: 30
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("fully consumed config must pass in fail mode");
    assert!(report.is_clean());
}

#[test]
fn empty_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

#[test]
fn deterministic_unused_pointer_ordering() {
    let yaml = r#"
unused:
  b: 2
  a: 1
"#;

    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/unused/a".to_string(), "/unused/b".to_string()]
    );
}
