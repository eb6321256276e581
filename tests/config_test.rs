//! Integration tests for configuration loading and persistence.
//!
//! These run outside `#[cfg(test)]`, so `WORKDISTRO_CONFIG_DIR` is
//! honored and the real file round-trip is exercised.

use std::sync::Mutex;

use tempfile::TempDir;
use workdistro_notify::Config;

// Config tests mutate process-wide env vars; serialize them
static ENV_LOCK: Mutex<()> = Mutex::new(());

const OVERRIDE_VARS: &[&str] = &[
    "WORKDISTRO_ENDPOINT",
    "WORKDISTRO_TOKEN",
    "WORKDISTRO_ROLE",
    "WORKDISTRO_INITIAL_BACKOFF_MS",
    "WORKDISTRO_MAX_BACKOFF_MS",
];

fn clear_override_vars() {
    for var in OVERRIDE_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_save_then_load_roundtrip() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    std::env::set_var("WORKDISTRO_CONFIG_DIR", dir.path());
    clear_override_vars();

    let config = Config {
        endpoint: "wss://staging.workdistro.example".to_string(),
        token: "never-on-disk".to_string(),
        initial_backoff_ms: 500,
        max_backoff_ms: 8_000,
        role: "worker".to_string(),
    };
    config.save().unwrap();

    let loaded = Config::load().unwrap();
    assert_eq!(loaded.endpoint, "wss://staging.workdistro.example");
    assert_eq!(loaded.initial_backoff_ms, 500);
    assert_eq!(loaded.max_backoff_ms, 8_000);
    assert_eq!(loaded.role, "worker");
    assert!(loaded.token.is_empty());

    // The token never touches the file
    let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(!raw.contains("never-on-disk"));

    std::env::remove_var("WORKDISTRO_CONFIG_DIR");
}

#[test]
fn test_env_overrides_shadow_the_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    std::env::set_var("WORKDISTRO_CONFIG_DIR", dir.path());
    clear_override_vars();

    Config::default().save().unwrap();

    std::env::set_var("WORKDISTRO_ENDPOINT", "wss://override.workdistro.example");
    std::env::set_var("WORKDISTRO_TOKEN", "env-token");
    std::env::set_var("WORKDISTRO_ROLE", "worker");
    std::env::set_var("WORKDISTRO_INITIAL_BACKOFF_MS", "250");
    // Unparseable values are ignored, keeping the file's setting
    std::env::set_var("WORKDISTRO_MAX_BACKOFF_MS", "not-a-number");

    let loaded = Config::load().unwrap();
    assert_eq!(loaded.endpoint, "wss://override.workdistro.example");
    assert_eq!(loaded.token, "env-token");
    assert_eq!(loaded.role, "worker");
    assert_eq!(loaded.initial_backoff_ms, 250);
    assert_eq!(loaded.max_backoff_ms, 30_000);

    clear_override_vars();
    std::env::remove_var("WORKDISTRO_CONFIG_DIR");
}
