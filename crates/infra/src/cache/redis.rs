//! Networked cache tier backed by redis.
//!
//! The tier is built for degraded environments: an unreachable server at
//! startup yields a disabled tier that quietly misses instead of failing
//! composition, every round trip runs under the configured operation
//! timeout, and pattern removal steps down from a server-side script to
//! cursor-based SCAN when the deployment forbids EVAL. Restrictions are
//! remembered so a blocked path is not retried on every call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use strata_core::cache::StatisticsCollector;
use strata_core::{CacheError, CacheResult, CacheTier};
use strata_domain::config::CacheSettings;
use strata_domain::types::CacheStatistics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Deletes every key matching a glob in one round trip.
const PATTERN_DELETE_SCRIPT: &str = r"
local removed = 0
for _, key in ipairs(redis.call('KEYS', ARGV[1])) do
    redis.call('DEL', key)
    removed = removed + 1
end
return removed
";

/// INFO fields worth surfacing through `backend_info`.
const INFO_FIELDS: [&str; 5] = [
    "redis_version",
    "used_memory_human",
    "connected_clients",
    "uptime_in_seconds",
    "maxmemory_policy",
];

/// Second tier of the stack: a shared redis instance.
pub struct RedisCacheTier {
    /// `None` means the tier is disabled and every operation no-ops.
    manager: Option<ConnectionManager>,
    operation_timeout: Duration,
    sliding_expiration: Option<Duration>,
    scan_batch_size: u32,
    /// Why the EVAL removal path is off, once a deployment rejects it.
    script_blocked: RwLock<Option<String>>,
    /// Same memory for the SCAN fallback.
    scan_blocked: RwLock<Option<String>>,
    cancel: CancellationToken,
    /// Most recent DBSIZE observation, refreshed by `backend_info`.
    observed_keys: AtomicU64,
    stats: StatisticsCollector,
}

impl RedisCacheTier {
    /// Connect to the server named in `settings`.
    ///
    /// Never fails: an invalid URL or unreachable server is logged and the
    /// tier comes up disabled, leaving the rest of the stack intact.
    pub async fn connect(settings: &CacheSettings) -> Self {
        match Self::open(settings).await {
            Ok(manager) => {
                info!(url = %settings.redis_url, "redis tier connected");
                Self::assemble(Some(manager), settings)
            }
            Err(e) => {
                warn!(url = %settings.redis_url, error = %e, "redis unreachable, tier disabled");
                Self::assemble(None, settings)
            }
        }
    }

    /// A tier that answers every read with a miss and accepts every write
    /// by dropping it.
    #[must_use]
    pub fn disabled() -> Self {
        Self::assemble(None, &CacheSettings::default())
    }

    fn assemble(manager: Option<ConnectionManager>, settings: &CacheSettings) -> Self {
        Self {
            manager,
            operation_timeout: settings.operation_timeout(),
            sliding_expiration: settings.sliding_expiration(),
            scan_batch_size: settings.scan_batch_size,
            script_blocked: RwLock::new(None),
            scan_blocked: RwLock::new(None),
            cancel: CancellationToken::new(),
            observed_keys: AtomicU64::new(0),
            stats: StatisticsCollector::new(),
        }
    }

    async fn open(settings: &CacheSettings) -> Result<ConnectionManager, CacheError> {
        let client = redis::Client::open(settings.redis_url.as_str())
            .map_err(|e| CacheError::Config(format!("invalid redis url: {e}")))?;

        match tokio::time::timeout(settings.operation_timeout(), ConnectionManager::new(client))
            .await
        {
            Ok(Ok(manager)) => Ok(manager),
            Ok(Err(e)) => Err(CacheError::Unavailable(e.to_string())),
            Err(_) => {
                Err(CacheError::Timeout { elapsed_ms: settings.operation_timeout_millis })
            }
        }
    }

    /// Whether a connection was established at startup.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.manager.is_some()
    }

    /// Token that aborts in-flight operations on shutdown.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one redis round trip under the operation timeout and the
    /// shutdown token, mapping driver errors into [`CacheError`].
    async fn execute<T, F>(&self, op: &'static str, enumeration: bool, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(CacheError::Unavailable(format!("{op} aborted by shutdown")))
            }
            outcome = tokio::time::timeout(self.operation_timeout, fut) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) if enumeration && is_privilege_error(&e) => {
                    Err(CacheError::PatternUnsupported(e.to_string()))
                }
                Ok(Err(e)) => Err(CacheError::Unavailable(format!("{op}: {e}"))),
                Err(_) => Err(CacheError::Timeout {
                    elapsed_ms: self.operation_timeout.as_millis() as u64,
                }),
            },
        }
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        self.execute(op, false, fut).await
    }

    /// Like [`Self::run`], but privilege rejections surface as
    /// [`CacheError::PatternUnsupported`] so the caller can fall back.
    async fn run_enumeration<T, F>(&self, op: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        self.execute(op, true, fut).await
    }

    async fn delete_by_script(
        &self,
        manager: &ConnectionManager,
        pattern: &str,
    ) -> CacheResult<u64> {
        let mut conn = manager.clone();
        let mut eval = redis::cmd("EVAL");
        eval.arg(PATTERN_DELETE_SCRIPT).arg(0).arg(pattern);
        self.run_enumeration("EVAL", eval.query_async(&mut conn)).await
    }

    async fn delete_by_scan(
        &self,
        manager: &ConnectionManager,
        pattern: &str,
    ) -> CacheResult<u64> {
        let mut conn = manager.clone();
        let mut removed = 0u64;
        let mut cursor: u64 = 0;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(self.scan_batch_size);
            let (next, keys): (u64, Vec<String>) =
                self.run_enumeration("SCAN", scan.query_async(&mut conn)).await?;

            if !keys.is_empty() {
                let batch: u64 = self.run("DEL", conn.del(&keys)).await?;
                removed += batch;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }
}

fn is_privilege_error(error: &redis::RedisError) -> bool {
    if error.kind() == redis::ErrorKind::NoScriptError {
        return true;
    }
    let text = error.to_string();
    text.contains("NOPERM") || text.contains("unknown command")
}

#[async_trait]
impl CacheTier for RedisCacheTier {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let Some(manager) = &self.manager else { return Ok(None) };
        let mut conn = manager.clone();

        let value: Option<Vec<u8>> = self.run("GET", conn.get(key)).await?;
        match value {
            Some(payload) => {
                self.stats.record_hit();
                if let Some(window) = self.sliding_expiration {
                    // A read pushes the deadline out again. Best effort: a
                    // failed EXPIRE must not turn a hit into an error.
                    let seconds = window.as_secs() as i64;
                    if let Err(e) =
                        self.run("EXPIRE", conn.expire::<_, bool>(key, seconds)).await
                    {
                        debug!(key = %key, error = %e, "sliding expiration refresh failed");
                    }
                }
                Ok(Some(payload))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let Some(manager) = &self.manager else { return Ok(()) };
        let mut conn = manager.clone();

        // SETEX rejects a zero TTL.
        let seconds = ttl.as_secs().max(1);
        self.run("SETEX", conn.set_ex::<_, _, ()>(key, value, seconds)).await?;
        self.stats.touch();
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let Some(manager) = &self.manager else { return Ok(false) };
        let mut conn = manager.clone();

        let removed: u64 = self.run("DEL", conn.del(key)).await?;
        if removed > 0 {
            self.stats.touch();
        }
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let Some(manager) = &self.manager else { return Ok(false) };
        let mut conn = manager.clone();

        let found: bool = self.run("EXISTS", conn.exists(key)).await?;
        Ok(found)
    }

    async fn ttl_remaining(&self, key: &str) -> CacheResult<Option<Duration>> {
        let Some(manager) = &self.manager else { return Ok(None) };
        let mut conn = manager.clone();

        // TTL returns -1 for no expiry and -2 for a missing key.
        let ttl: i64 = self.run("TTL", conn.ttl(key)).await?;
        Ok((ttl > 0).then(|| Duration::from_secs(ttl as u64)))
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let Some(manager) = &self.manager else { return Ok(false) };
        let mut conn = manager.clone();

        let applied: bool =
            self.run("EXPIRE", conn.expire(key, ttl.as_secs() as i64)).await?;
        Ok(applied)
    }

    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let Some(manager) = &self.manager else { return Ok(0) };

        if self.script_blocked.read().is_none() {
            match self.delete_by_script(manager, pattern).await {
                Ok(removed) => {
                    self.stats.touch();
                    debug!(pattern = %pattern, removed, "pattern removal via EVAL");
                    return Ok(removed);
                }
                Err(CacheError::PatternUnsupported(reason)) => {
                    warn!(reason = %reason, "EVAL removal blocked, remembering restriction");
                    *self.script_blocked.write() = Some(reason);
                }
                Err(e) => return Err(e),
            }
        }

        if self.scan_blocked.read().is_none() {
            match self.delete_by_scan(manager, pattern).await {
                Ok(removed) => {
                    self.stats.touch();
                    debug!(pattern = %pattern, removed, "pattern removal via SCAN");
                    return Ok(removed);
                }
                Err(CacheError::PatternUnsupported(reason)) => {
                    warn!(reason = %reason, "SCAN removal blocked, remembering restriction");
                    *self.scan_blocked.write() = Some(reason);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(pattern = %pattern, "no permitted pattern removal path, nothing removed");
        Ok(0)
    }

    async fn clear(&self) -> CacheResult<()> {
        let Some(manager) = &self.manager else { return Ok(()) };
        let mut conn = manager.clone();

        self.run("FLUSHDB", redis::cmd("FLUSHDB").query_async::<()>(&mut conn)).await?;
        self.stats.reset();
        self.observed_keys.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn statistics(&self) -> CacheStatistics {
        // Item count is the most recent DBSIZE observation, not live data.
        self.stats.snapshot(self.observed_keys.load(Ordering::Relaxed))
    }

    async fn backend_info(&self) -> CacheResult<BTreeMap<String, String>> {
        let mut info = BTreeMap::new();
        info.insert("enabled".to_owned(), self.is_enabled().to_string());
        if let Some(reason) = self.script_blocked.read().as_deref() {
            info.insert("script_restriction".to_owned(), reason.to_owned());
        }
        if let Some(reason) = self.scan_blocked.read().as_deref() {
            info.insert("scan_restriction".to_owned(), reason.to_owned());
        }
        let Some(manager) = &self.manager else { return Ok(info) };

        let mut conn = manager.clone();
        let raw: String =
            self.run("INFO", redis::cmd("INFO").query_async(&mut conn)).await?;
        for line in raw.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if INFO_FIELDS.contains(&name) {
                    info.insert(name.to_owned(), value.trim().to_owned());
                }
            }
        }

        let keys: u64 = self.run("DBSIZE", redis::cmd("DBSIZE").query_async(&mut conn)).await?;
        self.observed_keys.store(keys, Ordering::Relaxed);
        info.insert("keys".to_owned(), keys.to_string());

        Ok(info)
    }
}
