use prospect_common::SearchEngineKind;
use prospect_config::{ConfigLoadError, LlmConfig, ProspectConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
search:
  engine: duckduckgo
  limit: 20
  sites: [github.com, gitlab.com]
fetch:
  headless: true
  concurrency: 2
inference:
  use_ai: true
llm:
  provider: ollama
  model: "llama3.2:3b"
store:
  database_url: "sqlite://${PROSPECT_TEST_DB_DIR}/prospect.db"
"#;

#[test]
#[serial]
fn file_values_and_placeholders_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "prospect.yaml", FILE_YAML);

    temp_env::with_var("PROSPECT_TEST_DB_DIR", Some("/var/lib/prospect"), || {
        let config = ProspectConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config");

        assert_eq!(config.search.engine, SearchEngineKind::DuckDuckGo);
        assert_eq!(config.search.limit, 20);
        assert_eq!(config.search.sites, vec!["github.com", "gitlab.com"]);
        assert_eq!(config.search.providers.len(), 5);
        assert_eq!(config.fetch.concurrency, 2);
        assert!(config.inference.use_ai);
        assert_eq!(config.store.database_url, "sqlite:///var/lib/prospect/prospect.db");
        match config.llm {
            Some(LlmConfig::Ollama { model, endpoint, .. }) => {
                assert_eq!(model, "llama3.2:3b");
                assert_eq!(endpoint, "http://localhost:11434");
            }
            other => panic!("expected ollama, got {other:?}"),
        }
    });
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "prospect.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("PROSPECT_TEST_DB_DIR", Some("/tmp")),
            ("PROSPECT__SEARCH__LIMIT", Some("7")),
            ("PROSPECT__FETCH__HEADLESS", Some("false")),
            ("PROSPECT__DEMO__ENABLED", Some("true")),
        ],
        || {
            let config = ProspectConfigLoader::new().with_file(&p).load().expect("load config");
            assert_eq!(config.search.limit, 7);
            assert!(!config.fetch.headless);
            assert!(config.demo.enabled);
        },
    );
}

#[test]
#[serial]
fn env_overlay_can_be_disabled() {
    temp_env::with_var("PROSPECT__SEARCH__LIMIT", Some("99"), || {
        let config = ProspectConfigLoader::new()
            .without_env()
            .with_yaml_str("search:\n  limit: 4")
            .load()
            .expect("load config");
        assert_eq!(config.search.limit, 4);
    });
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = ProspectConfigLoader::new()
        .without_env()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(config.search.limit, 10);
    assert!(config.llm.is_none());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = ProspectConfigLoader::new()
        .without_env()
        .with_file(tmp.path().join("absent.yaml"))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Source(_)));
}

#[test]
#[serial]
fn unknown_engine_is_a_schema_error() {
    let err = ProspectConfigLoader::new()
        .without_env()
        .with_yaml_str("search:\n  engine: altavista")
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Schema(_)));
}
