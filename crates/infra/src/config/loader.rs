//! Configuration loader
//!
//! Loads sync configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `FIELDSYNC_STORAGE_BACKEND` is unset, falls back to loading from file
//! 3. Searches candidate paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `FIELDSYNC_STORAGE_BACKEND`: `file`, `sqlite` or `memory` (required)
//! - `FIELDSYNC_STORAGE_PATH`: Blob directory or database file
//! - `FIELDSYNC_MAX_ATTEMPTS`: Attempts before a job is moved to failed jobs
//! - `FIELDSYNC_RETRY_DELAY_MS`: Delay between inline attempts
//! - `FIELDSYNC_DRAIN_INTERVAL_SECS`: Period of the background drain
//! - `FIELDSYNC_LOG_LEVEL`: Fallback log filter when `RUST_LOG` is unset
//! - `FIELDSYNC_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! Optional variables fall back to the defaults in `fieldsync-domain`.
//!
//! ## File Locations
//! The loader searches the following names, first in the current working
//! directory and its parent, then next to the executable:
//! `fieldsync.toml`, `fieldsync.json`, `config.toml`, `config.json`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fieldsync_domain::{
    Config, FieldSyncError, LoggingConfig, Result, StorageBackend, StorageConfig, SyncConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["fieldsync.toml", "fieldsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `FieldSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded values fail validation
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `FieldSyncError::Config` if `FIELDSYNC_STORAGE_BACKEND` is missing
/// or any variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let backend = env_var("FIELDSYNC_STORAGE_BACKEND").and_then(|s| {
        StorageBackend::from_str(&s)
            .map_err(|e| FieldSyncError::Config(format!("Invalid storage backend: {e}")))
    })?;

    let defaults = Config::default();
    let path = std::env::var("FIELDSYNC_STORAGE_PATH")
        .map_or(defaults.storage.path, PathBuf::from);

    let sync = SyncConfig {
        max_attempts: env_parse("FIELDSYNC_MAX_ATTEMPTS", defaults.sync.max_attempts)?,
        retry_delay_ms: env_parse("FIELDSYNC_RETRY_DELAY_MS", defaults.sync.retry_delay_ms)?,
        drain_interval_secs: env_parse(
            "FIELDSYNC_DRAIN_INTERVAL_SECS",
            defaults.sync.drain_interval_secs,
        )?,
        ..defaults.sync
    };

    let logging = LoggingConfig {
        level: std::env::var("FIELDSYNC_LOG_LEVEL").unwrap_or(defaults.logging.level),
        json: env_bool("FIELDSYNC_LOG_JSON", defaults.logging.json),
    };

    let config = Config { storage: StorageConfig { backend, path }, sync, logging };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the candidate locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `FieldSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded values fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FieldSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            FieldSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FieldSyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); missing
/// sections and fields take their defaults.
///
/// # Errors
/// Returns `FieldSyncError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FieldSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search the candidate locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        let parent = cwd.join("..");
        dirs.extend([cwd, parent]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `FieldSyncError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        FieldSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional numeric environment variable, `default` when unset
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| FieldSyncError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parking_lot::Mutex;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 7] = [
        "FIELDSYNC_STORAGE_BACKEND",
        "FIELDSYNC_STORAGE_PATH",
        "FIELDSYNC_MAX_ATTEMPTS",
        "FIELDSYNC_RETRY_DELAY_MS",
        "FIELDSYNC_DRAIN_INTERVAL_SECS",
        "FIELDSYNC_LOG_LEVEL",
        "FIELDSYNC_LOG_JSON",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock();

        for (i, value) in ["1", "true", "yes", "on", "TRUE"].iter().enumerate() {
            let key = format!("FIELDSYNC_TEST_BOOL_TRUE_{i}");
            std::env::set_var(&key, value);
            assert!(env_bool(&key, false), "{value} should parse as true");
            std::env::remove_var(&key);
        }
        for (i, value) in ["0", "false", "no", "off"].iter().enumerate() {
            let key = format!("FIELDSYNC_TEST_BOOL_FALSE_{i}");
            std::env::set_var(&key, value);
            assert!(!env_bool(&key, true), "{value} should parse as false");
            std::env::remove_var(&key);
        }

        std::env::remove_var("FIELDSYNC_TEST_BOOL_MISSING");
        assert!(env_bool("FIELDSYNC_TEST_BOOL_MISSING", true));
        assert!(!env_bool("FIELDSYNC_TEST_BOOL_MISSING", false));
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        std::env::set_var("FIELDSYNC_STORAGE_BACKEND", "sqlite");
        std::env::set_var("FIELDSYNC_STORAGE_PATH", "/tmp/fieldsync.db");
        std::env::set_var("FIELDSYNC_MAX_ATTEMPTS", "5");
        std::env::set_var("FIELDSYNC_RETRY_DELAY_MS", "250");
        std::env::set_var("FIELDSYNC_DRAIN_INTERVAL_SECS", "60");
        std::env::set_var("FIELDSYNC_LOG_LEVEL", "debug");
        std::env::set_var("FIELDSYNC_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/fieldsync.db"));
        assert_eq!(config.sync.max_attempts, 5);
        assert_eq!(config.sync.retry_delay_ms, 250);
        assert_eq!(config.sync.drain_interval_secs, 60);
        assert_eq!(config.sync.queue_key, "sync_job_queue");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_optional_vars_default() {
        let _guard = ENV_LOCK.lock();
        clear_env();
        std::env::set_var("FIELDSYNC_STORAGE_BACKEND", "Memory");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_from_env_missing_backend() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, FieldSyncError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        std::env::set_var("FIELDSYNC_STORAGE_BACKEND", "floppy");
        assert!(matches!(load_from_env(), Err(FieldSyncError::Config(_))));

        std::env::set_var("FIELDSYNC_STORAGE_BACKEND", "file");
        std::env::set_var("FIELDSYNC_MAX_ATTEMPTS", "not-a-number");
        assert!(matches!(load_from_env(), Err(FieldSyncError::Config(_))));

        std::env::set_var("FIELDSYNC_MAX_ATTEMPTS", "0");
        let err = load_from_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_load_from_file_json() {
        let (_temp, path) = write_temp(
            r#"{
                "storage": { "backend": "file", "path": "/var/lib/fieldsync" },
                "sync": { "max_attempts": 4, "retry_delay_ms": 500 }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/fieldsync"));
        assert_eq!(config.sync.max_attempts, 4);
        assert_eq!(config.sync.drain_interval_secs, 300);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let (_temp, path) = write_temp(
            r#"
[storage]
backend = "sqlite"
path = "queue.db"

[logging]
level = "warn"
json = true
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json);
        assert_eq!(config.sync, SyncConfig::default());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let (_temp, path) = write_temp(
            r#"{ "sync": { "queue_key": "jobs", "failed_key": "jobs" } }"#,
            "json",
        );

        let err = load_from_file(Some(path.clone())).unwrap_err();
        assert!(matches!(err, FieldSyncError::Config(_)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/fieldsync.json")));
        assert!(matches!(result, Err(FieldSyncError::Config(_))));
    }

    #[test]
    fn test_parse_config_formats() {
        assert_eq!(parse_config("{}", Path::new("a.json")).unwrap(), Config::default());
        assert_eq!(parse_config("", Path::new("a.toml")).unwrap(), Config::default());
        assert!(parse_config("{ nope", Path::new("a.json")).is_err());
        assert!(parse_config("backend: file", Path::new("a.yaml")).is_err());
    }
}
