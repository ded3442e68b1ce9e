//! Cache settings loader
//!
//! Resolves [`CacheSettings`] from the environment or a settings file.
//!
//! ## Loading Strategy
//! 1. First, applies `STRATA_*` environment variables over the defaults
//! 2. If none are set, falls back to loading from file
//! 3. If no file is found either, the built-in defaults are used
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `STRATA_KEY_PREFIX`: Prefix prepended to every generated key
//! - `STRATA_DEFAULT_EXPIRATION_MINUTES`: Baseline query TTL
//! - `STRATA_DISTRIBUTED_CACHE_ENABLED`: Whether the redis tier runs (true/false)
//! - `STRATA_MEMORY_CACHE_SIZE_LIMIT_MB`: In-process tier capacity
//! - `STRATA_SLIDING_EXPIRATION_MINUTES`: Sliding window for redis reads, 0 disables
//! - `STRATA_REDIS_URL`: Connection string for the redis tier
//! - `STRATA_OPERATION_TIMEOUT_MS`: Per-operation deadline for redis calls
//! - `STRATA_SCAN_BATCH_SIZE`: SCAN page size for pattern removal
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./strata.json` or `./strata.toml` (current working directory)
//! 2. `../strata.json` or `../strata.toml` (parent directory)
//! 3. `../../strata.json` or `../../strata.toml` (grandparent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use strata_domain::config::CacheSettings;
use strata_domain::{Result, StrataError};

/// Every variable the environment loader understands.
const STRATA_VARS: [&str; 8] = [
    "STRATA_KEY_PREFIX",
    "STRATA_DEFAULT_EXPIRATION_MINUTES",
    "STRATA_DISTRIBUTED_CACHE_ENABLED",
    "STRATA_MEMORY_CACHE_SIZE_LIMIT_MB",
    "STRATA_SLIDING_EXPIRATION_MINUTES",
    "STRATA_REDIS_URL",
    "STRATA_OPERATION_TIMEOUT_MS",
    "STRATA_SCAN_BATCH_SIZE",
];

/// Load settings with automatic fallback strategy
///
/// Environment variables win when any are set; otherwise the standard file
/// locations are probed; otherwise the built-in defaults apply. A file that
/// exists but fails to parse or validate is an error, not a fallback.
///
/// # Errors
/// Returns `StrataError::Config` if:
/// - An environment variable holds an unparsable value
/// - A found file has an invalid format or fails validation
pub fn load() -> Result<CacheSettings> {
    if env_overrides_present() {
        let settings = load_from_env()?;
        tracing::info!("cache settings loaded from environment variables");
        return Ok(settings);
    }

    tracing::debug!("no STRATA_* variables set, probing for a settings file");
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("no settings overrides found, using built-in defaults");
            Ok(CacheSettings::default())
        }
    }
}

fn env_overrides_present() -> bool {
    STRATA_VARS.iter().any(|key| std::env::var_os(key).is_some())
}

/// Load settings from environment variables
///
/// Variables that are set override the corresponding default; the rest keep
/// their built-in values. At least one `STRATA_*` variable must be present,
/// so an untouched environment falls through to the file loader.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `StrataError::Config` if no `STRATA_*` variable is set, a value
/// fails to parse, or the resulting settings fail validation.
pub fn load_from_env() -> Result<CacheSettings> {
    if !env_overrides_present() {
        return Err(StrataError::Config(
            "no STRATA_* environment variables are set".to_string(),
        ));
    }

    let defaults = CacheSettings::default();
    let settings = CacheSettings {
        key_prefix: std::env::var("STRATA_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        default_expiration_minutes: env_parse(
            "STRATA_DEFAULT_EXPIRATION_MINUTES",
            defaults.default_expiration_minutes,
        )?,
        enable_distributed_cache: env_bool(
            "STRATA_DISTRIBUTED_CACHE_ENABLED",
            defaults.enable_distributed_cache,
        ),
        memory_cache_size_limit_mb: env_parse(
            "STRATA_MEMORY_CACHE_SIZE_LIMIT_MB",
            defaults.memory_cache_size_limit_mb,
        )?,
        distributed_sliding_expiration_minutes: env_sliding_window(
            "STRATA_SLIDING_EXPIRATION_MINUTES",
        )?,
        redis_url: std::env::var("STRATA_REDIS_URL").unwrap_or(defaults.redis_url),
        operation_timeout_millis: env_parse(
            "STRATA_OPERATION_TIMEOUT_MS",
            defaults.operation_timeout_millis,
        )?,
        scan_batch_size: env_parse("STRATA_SCAN_BATCH_SIZE", defaults.scan_batch_size)?,
    };

    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes multiple locations for settings files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Fields absent from the file keep their defaults.
///
/// # Arguments
/// * `path` - Optional path to settings file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `StrataError::Config` if:
/// - File not found (when path is specified)
/// - No settings file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<CacheSettings> {
    let settings_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(StrataError::Config(format!(
                    "settings file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            StrataError::Config(
                "no settings file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %settings_path.display(), "loading cache settings from file");

    let contents = std::fs::read_to_string(&settings_path)
        .map_err(|e| StrataError::Config(format!("failed to read settings file: {e}")))?;

    parse_settings(&contents, &settings_path)
}

/// Parse settings from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `StrataError::Config` if the format is unsupported, parsing
/// fails, or the parsed settings fail validation.
fn parse_settings(contents: &str, path: &Path) -> Result<CacheSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    let settings: CacheSettings = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| StrataError::Config(format!("invalid TOML format: {e}")))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| StrataError::Config(format!("invalid JSON format: {e}")))?,
        _ => {
            return Err(StrataError::Config(format!(
                "unsupported settings format: {extension}"
            )))
        }
    };

    settings.validate()?;
    Ok(settings)
}

/// Probe multiple paths for settings files
///
/// Searches for `strata.json` / `strata.toml` in the current working
/// directory, up to two parent levels, and next to the executable.
///
/// # Returns
/// The first settings file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory and two levels up
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("strata.json"),
            cwd.join("strata.toml"),
            cwd.join("../strata.json"),
            cwd.join("../strata.toml"),
            cwd.join("../../strata.json"),
            cwd.join("../../strata.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![exe_dir.join("strata.json"), exe_dir.join("strata.toml")]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Parse an environment variable, keeping `default` when it is not set.
///
/// # Errors
/// Returns `StrataError::Config` if the variable is set but unparsable.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| StrataError::Config(format!("invalid {key}: {e}"))),
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

/// Sliding window minutes: unset keeps the default (off), `0` disables.
fn env_sliding_window(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => {
            let minutes = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| StrataError::Config(format!("invalid {key}: {e}")))?;
            Ok((minutes > 0).then_some(minutes))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn clear_strata_env() -> Vec<(&'static str, Option<String>)> {
        let saved = STRATA_VARS.iter().map(|key| (*key, std::env::var(key).ok())).collect();
        for key in STRATA_VARS {
            std::env::remove_var(key);
        }
        saved
    }

    fn restore_strata_env(saved: Vec<(&'static str, Option<String>)>) {
        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_BOOL_TRUE", "yes");
        std::env::set_var("TEST_BOOL_FALSE", "off");

        assert!(env_bool("TEST_BOOL_TRUE", false));
        assert!(!env_bool("TEST_BOOL_FALSE", true));

        std::env::remove_var("TEST_BOOL_MISSING");
        assert!(env_bool("TEST_BOOL_MISSING", true));
        assert!(!env_bool("TEST_BOOL_MISSING", false));

        // Cleanup
        std::env::remove_var("TEST_BOOL_TRUE");
        std::env::remove_var("TEST_BOOL_FALSE");
    }

    #[test]
    fn test_load_from_env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        let saved = clear_strata_env();

        std::env::set_var("STRATA_DEFAULT_EXPIRATION_MINUTES", "45");
        std::env::set_var("STRATA_DISTRIBUTED_CACHE_ENABLED", "true");
        std::env::set_var("STRATA_REDIS_URL", "redis://cache.internal:6380");
        std::env::set_var("STRATA_SLIDING_EXPIRATION_MINUTES", "15");

        let result = load_from_env();
        assert!(result.is_ok(), "should load from env vars, error: {:?}", result.err());

        let settings = result.unwrap();
        assert_eq!(settings.default_expiration_minutes, 45);
        assert!(settings.enable_distributed_cache);
        assert_eq!(settings.redis_url, "redis://cache.internal:6380");
        assert_eq!(settings.distributed_sliding_expiration_minutes, Some(15));

        // Untouched fields keep their defaults.
        assert_eq!(settings.key_prefix, "strata:");
        assert_eq!(settings.scan_batch_size, 512);

        restore_strata_env(saved);
    }

    #[test]
    fn test_load_from_env_requires_at_least_one_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        let saved = clear_strata_env();

        let result = load_from_env();
        assert!(result.is_err(), "should fail with an untouched environment");
        assert!(matches!(result.unwrap_err(), StrataError::Config(_)));

        restore_strata_env(saved);
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        let saved = clear_strata_env();

        std::env::set_var("STRATA_OPERATION_TIMEOUT_MS", "soon");

        let result = load_from_env();
        assert!(result.is_err(), "should fail with unparsable timeout");
        assert!(matches!(result.unwrap_err(), StrataError::Config(_)));

        restore_strata_env(saved);
    }

    #[test]
    fn test_load_from_env_rejects_invalid_settings() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        let saved = clear_strata_env();

        std::env::set_var("STRATA_DEFAULT_EXPIRATION_MINUTES", "0");

        let result = load_from_env();
        assert!(result.is_err(), "validation should reject a zero TTL");

        restore_strata_env(saved);
    }

    #[test]
    fn test_sliding_window_zero_disables() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        let saved = clear_strata_env();

        std::env::set_var("STRATA_SLIDING_EXPIRATION_MINUTES", "0");

        let settings = load_from_env().unwrap();
        assert_eq!(settings.distributed_sliding_expiration_minutes, None);

        restore_strata_env(saved);
    }

    #[test]
    fn test_load_from_file_toml_partial() {
        let toml_content = r#"
key_prefix = "tenant-a:"
default_expiration_minutes = 10
enable_distributed_cache = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_ok(), "should load settings from TOML file");

        let settings = result.unwrap();
        assert_eq!(settings.key_prefix, "tenant-a:");
        assert_eq!(settings.default_expiration_minutes, 10);
        assert!(settings.enable_distributed_cache);
        // Absent fields keep their defaults.
        assert_eq!(settings.memory_cache_size_limit_mb, 64);

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "key_prefix": "qa:",
            "memory_cache_size_limit_mb": 16,
            "operation_timeout_millis": 500
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_ok(), "should load settings from JSON file");

        let settings = result.unwrap();
        assert_eq!(settings.key_prefix, "qa:");
        assert_eq!(settings.memory_cache_size_limit_mb, 16);
        assert_eq!(settings.operation_timeout_millis, 500);

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/strata.json")));
        assert!(result.is_err(), "should fail when file not found");
        assert!(matches!(result.unwrap_err(), StrataError::Config(_)));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let invalid_toml = "key_prefix = ";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "should fail with invalid TOML");

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_rejects_invalid_settings() {
        let toml_content = "scan_batch_size = 0";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "validation should reject a zero batch size");

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_settings_unsupported_format() {
        let path = PathBuf::from("strata.yaml");
        let result = parse_settings("key_prefix: nope", &path);
        assert!(result.is_err(), "should fail with unsupported format");
    }
}
