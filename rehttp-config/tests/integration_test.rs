//! Integration tests for rehttp-config

use rehttp_config::*;
use std::io::Write;
use std::time::Duration;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_toml_file_then_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "rehttp.toml",
        r#"
            max_additional_attempts = 5
            backoff_base_ms = 100
            backoff_cap_ms = 400
        "#,
    );

    let settings = SettingsLoader::new()
        .file(&path)
        .env_vars([("REHTTP_BACKOFF_CAP_MS", "2000")])
        .load()
        .unwrap();

    assert_eq!(settings.max_additional_attempts, 5);
    assert_eq!(settings.backoff_base_ms, 100);
    assert_eq!(settings.backoff_cap_ms, 2000);
    assert_eq!(settings.timeout_secs, 30);
}

#[test]
fn test_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "rehttp.json",
        r#"{"timeout_secs": 3, "user_agent": "json-agent"}"#,
    );

    let settings = SettingsLoader::new().file(&path).without_env().load().unwrap();
    assert_eq!(settings.timeout_secs, 3);
    assert_eq!(settings.user_agent.as_deref(), Some("json-agent"));

    let config = settings.to_client_config();
    assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    assert_eq!(config.user_agent, "json-agent");
}

#[test]
fn test_env_file_uses_prefixed_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "client.env",
        "REHTTP_MAX_ADDITIONAL_ATTEMPTS=0\nREHTTP_CONNECT_TIMEOUT_SECS=1\nOTHER=ignored\n",
    );

    let settings = SettingsLoader::new().file(&path).without_env().load().unwrap();
    assert_eq!(settings.max_additional_attempts, 0);
    assert_eq!(settings.connect_timeout_secs, 1);
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bad.json", r#"{"timeout_secs": 0}"#);

    let err = SettingsLoader::new().file(&path).without_env().load().unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_wrong_type_in_file_is_a_deserialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "bad.toml", r#"backoff_base_ms = "fast""#);

    let err = SettingsLoader::new().file(&path).without_env().load().unwrap_err();
    assert!(matches!(err, ConfigError::DeserializationError(_)));
}

#[test]
fn test_missing_and_unsupported_files() {
    let err = SettingsLoader::new()
        .file("/nonexistent/rehttp.toml")
        .without_env()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::LoadError(_)));

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "rehttp.yaml", "timeout_secs: 1");
    let err = SettingsLoader::new().file(&path).without_env().load().unwrap_err();
    assert!(err.to_string().contains("Unsupported format"));
}

#[test]
fn test_process_environment_overrides() {
    // Unique name so parallel tests never observe it.
    let loader = EnvLoader::new(Some("REHTTP_IT_PROCESS".to_string()));
    unsafe {
        std::env::set_var("REHTTP_IT_PROCESS_TIMEOUT_SECS", "12");
    }

    assert_eq!(loader.load_var("timeout_secs").unwrap(), "12");
    assert_eq!(loader.load()["timeout_secs"], "12");

    unsafe {
        std::env::remove_var("REHTTP_IT_PROCESS_TIMEOUT_SECS");
    }
}

#[test]
fn test_dotenv_file_feeds_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, ".env", "REHTTP_IT_DOTENV_VALUE=from-dotenv\n");

    load_dotenv(path.to_str()).unwrap();
    let loader = EnvLoader::new(Some("REHTTP_IT_DOTENV".to_string()));
    assert_eq!(loader.load_var("value").unwrap(), "from-dotenv");
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::InvalidValue {
        key: "timeout_secs".to_string(),
        value: "soon".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid value for timeout_secs: \"soon\"");
}
