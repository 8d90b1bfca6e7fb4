//! Configuration loading tests: YAML files, defaults and env overrides.

use std::io::Write;
use std::sync::{LazyLock, Mutex};

use chirp_common::config::{AppConfig, FailurePolicy, SearchSourceConfig};

static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// RAII guard for setting environment variables that automatically cleans up on drop.
/// Holds a global mutex so tests reading the environment do not interleave.
struct EnvGuard {
    _lock: std::sync::MutexGuard<'static, ()>,
    keys: Vec<String>,
}

impl EnvGuard {
    fn new(vars: Vec<(&str, &str)>) -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let keys = vars
            .iter()
            .map(|(k, v)| {
                std::env::set_var(k, v);
                k.to_string()
            })
            .collect();
        Self { _lock: lock, keys }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_search_source_yaml_parsing() {
    let yaml = r#"
        name: "rust_tweets"
        endpoint: "https://api.example.com/search.json"
        max_results: 100
        on_fetch_failure: empty
    "#;
    let config: SearchSourceConfig = serde_yaml::from_str(yaml).expect("Failed to parse config");
    assert_eq!(config.name, "rust_tweets");
    assert_eq!(config.endpoint, "https://api.example.com/search.json");
    assert_eq!(config.max_results, 100);
    assert_eq!(config.on_fetch_failure, FailurePolicy::Empty);
    // unspecified keys fall back to defaults
    assert_eq!(config.search_column, "q");
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn test_unknown_failure_policy_is_rejected() {
    let yaml = r#"
        on_fetch_failure: retry
    "#;
    assert!(serde_yaml::from_str::<SearchSourceConfig>(yaml).is_err());
}

#[test]
fn test_from_file_reads_yaml() {
    let _env = EnvGuard::new(vec![]);
    let file = write_config(
        r#"
search:
  endpoint: "http://localhost:9000/search.json"
  timeout_secs: 3
logging:
  filter: "debug"
"#,
    );

    let config = AppConfig::from_file(file.path().to_str().unwrap()).expect("load config");
    assert_eq!(config.search.endpoint, "http://localhost:9000/search.json");
    assert_eq!(config.search.timeout_secs, 3);
    assert_eq!(config.logging.filter, "debug");
}

#[test]
fn test_missing_file_uses_defaults() {
    let _env = EnvGuard::new(vec![]);
    let config = AppConfig::from_file("/nonexistent/chirp.yaml").expect("defaults");
    assert_eq!(config.search.name, "tweets");
    assert_eq!(config.search.max_results, 512);
}

#[test]
fn test_env_overrides_file() {
    let _env = EnvGuard::new(vec![
        ("CHIRP__SEARCH__MAX_RESULTS", "64"),
        ("CHIRP__SEARCH__ON_FETCH_FAILURE", "empty"),
    ]);
    let file = write_config(
        r#"
search:
  max_results: 10
"#,
    );

    let config = AppConfig::from_file(file.path().to_str().unwrap()).expect("load config");
    assert_eq!(config.search.max_results, 64);
    assert_eq!(config.search.on_fetch_failure, FailurePolicy::Empty);
}

#[test]
fn test_invalid_file_fails_validation() {
    let _env = EnvGuard::new(vec![]);
    let file = write_config(
        r#"
search:
  endpoint: "definitely not a url"
"#,
    );

    let err = AppConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("validation failed"));
}
