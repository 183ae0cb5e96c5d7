//! Config hash stability.
//!
//! GREEN when:
//! - the same inputs hash identically
//! - key order in the source YAML does not change the hash
//! - different values hash differently
//! - overlays take effect and the typed view sees them

use bzr_config::{load_layered_yaml_from_strings, ServiceConfig};

const BASE_YAML: &str = r#"
server:
  bind_addr: "127.0.0.1:8899"
  cors_origins: ["http://localhost:5173"]
database:
  url_env: "BZR_DATABASE_URL"
  max_connections: 10
files:
  base_url: "http://files.internal:8081"
  timeout_secs: 5
purchase:
  request_timeout_secs: 30
"#;

const BASE_YAML_REORDERED: &str = r#"
purchase:
  request_timeout_secs: 30
files:
  timeout_secs: 5
  base_url: "http://files.internal:8081"
database:
  max_connections: 10
  url_env: "BZR_DATABASE_URL"
server:
  cors_origins: ["http://localhost:5173"]
  bind_addr: "127.0.0.1:8899"
"#;

const OVERLAY_YAML: &str = r#"
server:
  bind_addr: "0.0.0.0:8080"
purchase:
  request_timeout_secs: 10
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_reaches_typed_view() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let cfg = ServiceConfig::from_json(&loaded.config_json).unwrap();

    assert_eq!(cfg.server.bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.purchase.request_timeout_secs, 10);
    // Untouched by the overlay.
    assert_eq!(cfg.files.base_url, "http://files.internal:8081");
    assert_eq!(cfg.server.cors_origins, vec!["http://localhost:5173"]);
}

#[test]
fn empty_config_yields_defaults() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&[""]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64);
    assert!(a.config_hash.chars().all(|c| c.is_ascii_hexdigit()));

    let cfg = ServiceConfig::from_json(&a.config_json).unwrap();
    assert_eq!(cfg, ServiceConfig::default());
    assert_eq!(cfg.database.url_env, "BZR_DATABASE_URL");
    assert_eq!(cfg.purchase.request_timeout_secs, 30);
}

#[test]
fn wrong_types_are_rejected() {
    let loaded = load_layered_yaml_from_strings(&["files:\n  timeout_secs: \"soon\"\n"]).unwrap();
    assert!(ServiceConfig::from_json(&loaded.config_json).is_err());
}
