use super::*;

#[test]
fn test_load_config_missing_file_returns_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.agent.model, "gpt-4o");
    assert_eq!(config.agent.max_tool_iterations, 10);
}

#[test]
fn test_load_config_minimal_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.agent.title_max_chars, 30);
    assert_eq!(config.gateway.port, 18790);
}

#[test]
fn test_load_config_invalid_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = load_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config JSON"));
}

#[test]
fn test_load_config_validation_failure_surfaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"agent": {"maxTokens": 0}}"#).unwrap();
    let err = load_config(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("maxTokens"));
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = Config::default();
    config.agent.model = "gpt-4o-mini".into();
    config.database.path = dir.path().join("t.db").to_string_lossy().into_owned();
    save_config(&config, Some(&path)).unwrap();
    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.agent.model, "gpt-4o-mini");
    assert_eq!(loaded.database.path, config.database.path);
}

#[cfg(unix)]
#[test]
fn test_save_config_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    save_config(&Config::default(), Some(&path)).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_env_override_applies() {
    use crate::config::credentials::apply_env_overrides;

    let mut config = Config::default();
    assert!(config.providers.openai.api_key.is_empty());

    unsafe { std::env::set_var("TASKPILOT_OPENAI_API_KEY", "test-key-from-env") };
    apply_env_overrides(&mut config);
    assert_eq!(config.providers.openai.api_key, "test-key-from-env");

    unsafe { std::env::remove_var("TASKPILOT_OPENAI_API_KEY") };
}

#[test]
fn test_env_override_empty_string_ignored() {
    use crate::config::credentials::apply_env_overrides;

    let mut config = Config::default();
    config.gateway.auth_secret = "original".to_string();

    unsafe { std::env::set_var("TASKPILOT_AUTH_SECRET", "") };
    apply_env_overrides(&mut config);
    assert_eq!(config.gateway.auth_secret, "original");

    unsafe { std::env::remove_var("TASKPILOT_AUTH_SECRET") };
}

#[test]
fn test_credential_status_reports_slots() {
    use crate::config::credentials::{CREDENTIAL_ENV_VARS, credential_status};

    let mut config = Config::default();
    config.providers.openai.api_key = "sk".into();
    let status = credential_status(&config);
    assert_eq!(status.len(), CREDENTIAL_ENV_VARS.len());
    assert!(status.contains(&("openai-api-key", true)));
    assert!(status.contains(&("auth-secret", false)));
}
