use parlor_common::{ReplyOrdering, SameTargetPolicy, observability::LogFormat};
use parlor_config::ParlorConfigLoader;
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
version: "0.1"
endpoint:
  url: "http://${PARLOR_TEST_HOST}/chat"
  auth_token: "${PARLOR_TEST_TOKEN}"
  timeout_secs: 30
typewriter:
  char_interval_ms: 10
  same_target: queue
  ordering: send
intro:
  slogan: "Ask away."
logging:
  format: json
  filter: "debug"
"#;

#[test]
#[serial]
fn loads_file_and_expands_env() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "parlor.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("PARLOR_TEST_HOST", Some("localhost:8000")),
            ("PARLOR_TEST_TOKEN", Some("secret")),
        ],
        || {
            let config = ParlorConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load parlor config");

            assert_eq!(config.version.as_deref(), Some("0.1"));
            assert_eq!(config.endpoint.url, "http://localhost:8000/chat");
            assert_eq!(config.endpoint.auth_token.as_deref(), Some("secret"));
            assert_eq!(config.endpoint.timeout_secs, Some(30));
            assert_eq!(config.typewriter.char_interval_ms, 10);
            assert_eq!(config.typewriter.same_target, SameTargetPolicy::Queue);
            assert_eq!(config.typewriter.ordering, ReplyOrdering::Send);
            assert_eq!(config.intro.slogan, "Ask away.");
            assert_eq!(config.intro.delay_ms, 2200);
            assert_eq!(config.logging.format, LogFormat::Json);
        },
    );
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "parlor.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("PARLOR__ENDPOINT__URL", Some("http://override.test/chat")),
            ("PARLOR__TYPEWRITER__CHAR_INTERVAL_MS", Some("42")),
            ("PARLOR__INTRO__ENABLED", Some("false")),
        ],
        || {
            let config = ParlorConfigLoader::new().with_file(&p).load().unwrap();
            assert_eq!(config.endpoint.url, "http://override.test/chat");
            assert_eq!(config.typewriter.char_interval_ms, 42);
            assert!(!config.intro.enabled);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = ParlorConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("optional file may be absent");

    assert_eq!(config.endpoint.url, parlor_config::DEFAULT_ENDPOINT);
    assert_eq!(config.typewriter.same_target, SameTargetPolicy::Replace);
    assert_eq!(config.typewriter.ordering, ReplyOrdering::Arrival);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = ParlorConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
