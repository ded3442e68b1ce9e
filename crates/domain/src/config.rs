//! Cache subsystem settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StrataError};

/// Tunables for the cache subsystem.
///
/// Every field has a working default; deployments override the ones they
/// care about through the environment or a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Prefix prepended to every generated key. Keeps one shared backend
    /// usable by several applications.
    pub key_prefix: String,

    /// Baseline TTL for cached query results, in minutes.
    pub default_expiration_minutes: u64,

    /// Whether the networked tier participates at all.
    pub enable_distributed_cache: bool,

    /// Upper bound for the in-process tier, in megabytes of payload.
    pub memory_cache_size_limit_mb: u64,

    /// Sliding TTL extension applied by the networked tier on reads.
    /// `None` disables sliding expiration.
    pub distributed_sliding_expiration_minutes: Option<u64>,

    /// Connection string for the networked tier.
    pub redis_url: String,

    /// Per-operation deadline for networked tier calls, in milliseconds.
    pub operation_timeout_millis: u64,

    /// Page size for cursor-based key enumeration in the networked tier.
    pub scan_batch_size: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: "strata:".to_owned(),
            default_expiration_minutes: 30,
            enable_distributed_cache: false,
            memory_cache_size_limit_mb: 64,
            distributed_sliding_expiration_minutes: None,
            redis_url: "redis://127.0.0.1:6379".to_owned(),
            operation_timeout_millis: 2000,
            scan_batch_size: 512,
        }
    }
}

impl CacheSettings {
    /// Baseline query TTL as a `Duration`.
    #[must_use]
    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_minutes * 60)
    }

    /// Networked tier per-operation deadline as a `Duration`.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_millis)
    }

    /// Sliding expiration window as a `Duration`, when configured.
    #[must_use]
    pub fn sliding_expiration(&self) -> Option<Duration> {
        self.distributed_sliding_expiration_minutes.map(|m| Duration::from_secs(m * 60))
    }

    /// In-process tier capacity in bytes of payload.
    #[must_use]
    pub fn memory_capacity_bytes(&self) -> u64 {
        self.memory_cache_size_limit_mb * 1024 * 1024
    }

    /// Reject settings that would disable the subsystem in surprising ways.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.default_expiration_minutes == 0 {
            return Err(StrataError::Config(
                "default_expiration_minutes must be greater than 0".to_owned(),
            ));
        }
        if self.memory_cache_size_limit_mb == 0 {
            return Err(StrataError::Config(
                "memory_cache_size_limit_mb must be greater than 0".to_owned(),
            ));
        }
        if self.operation_timeout_millis == 0 {
            return Err(StrataError::Config(
                "operation_timeout_millis must be greater than 0".to_owned(),
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(StrataError::Config("scan_batch_size must be greater than 0".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the defaults describe a working memory-only deployment.
    #[test]
    fn test_defaults_are_valid() {
        let settings = CacheSettings::default();

        assert!(settings.validate().is_ok());
        assert!(!settings.enable_distributed_cache);
        assert_eq!(settings.default_expiration(), Duration::from_secs(30 * 60));
        assert_eq!(settings.sliding_expiration(), None);
    }

    /// Validates each zero-valued tunable is rejected by name.
    #[test]
    fn test_validate_rejects_zeroes() {
        let mut settings = CacheSettings { default_expiration_minutes: 0, ..Default::default() };
        assert!(settings.validate().is_err());

        settings = CacheSettings { memory_cache_size_limit_mb: 0, ..Default::default() };
        assert!(settings.validate().is_err());

        settings = CacheSettings { operation_timeout_millis: 0, ..Default::default() };
        assert!(settings.validate().is_err());

        settings = CacheSettings { scan_batch_size: 0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    /// Validates partial config files fill the remaining fields from defaults.
    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{"key_prefix":"app:","enable_distributed_cache":true}"#)
                .unwrap();

        assert_eq!(settings.key_prefix, "app:");
        assert!(settings.enable_distributed_cache);
        assert_eq!(settings.default_expiration_minutes, 30);
        assert_eq!(settings.scan_batch_size, 512);
    }

    /// Validates the megabyte limit converts to bytes for the tier builder.
    #[test]
    fn test_memory_capacity_bytes() {
        let settings = CacheSettings { memory_cache_size_limit_mb: 8, ..Default::default() };
        assert_eq!(settings.memory_capacity_bytes(), 8 * 1024 * 1024);
    }
}
