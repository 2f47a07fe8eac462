//! Distributed per-resource locks.
//!
//! Redis-backed mutual exclusion with TTL and fencing: the lock value is a
//! UUID and release/extend only act when the stored value still matches.
//! A process-local variant provides identical semantics when Redis is
//! disabled, and in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LockError;

const KEY_PREFIX: &str = "lock:";
pub const DEFAULT_RETRY_TIMES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("expire", KEYS[1], ARGV[2])
else
    return 0
end
"#;

type LocalTable = Arc<Mutex<HashMap<String, (String, Instant)>>>;

#[derive(Clone)]
enum Backend {
    Redis(redis::aio::ConnectionManager),
    Local(LocalTable),
}

/// Creates and administers per-resource locks.
#[derive(Clone)]
pub struct LockManager {
    backend: Backend,
}

impl LockManager {
    pub fn redis(conn: redis::aio::ConnectionManager) -> Self {
        Self {
            backend: Backend::Redis(conn),
        }
    }

    /// In-process lock table. Used when Redis is disabled.
    pub fn local() -> Self {
        Self {
            backend: Backend::Local(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// Acquire with the default retry policy (3 attempts, 200 ms apart).
    pub async fn acquire(&self, resource: &str, ttl: Duration) -> Result<LockGuard, LockError> {
        self.acquire_with(resource, ttl, DEFAULT_RETRY_TIMES, DEFAULT_RETRY_DELAY)
            .await
    }

    pub async fn acquire_with(
        &self,
        resource: &str,
        ttl: Duration,
        retry_times: u32,
        retry_delay: Duration,
    ) -> Result<LockGuard, LockError> {
        let lock_id = Uuid::new_v4().to_string();

        for attempt in 1..=retry_times.max(1) {
            if self.try_acquire(resource, &lock_id, ttl).await? {
                debug!(resource = %resource, lock_id = %&lock_id[..8], "lock acquired");
                return Ok(LockGuard {
                    manager: self.clone(),
                    resource: resource.to_string(),
                    lock_id,
                    ttl,
                    released: false,
                });
            }

            if attempt < retry_times {
                debug!(resource = %resource, attempt, "lock busy, retrying");
                tokio::time::sleep(retry_delay).await;
            }
        }

        warn!(resource = %resource, retry_times, "failed to acquire lock");
        Err(LockError::Unavailable(resource.to_string()))
    }

    pub async fn is_locked(&self, resource: &str) -> bool {
        let key = format!("{KEY_PREFIX}{resource}");
        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                redis::cmd("EXISTS")
                    .arg(&key)
                    .query_async::<_, i64>(&mut conn)
                    .await
                    .map(|n| n == 1)
                    .unwrap_or(false)
            }
            Backend::Local(table) => {
                let mut table = table.lock().await;
                match table.get(&key) {
                    Some((_, expires)) if *expires > Instant::now() => true,
                    Some(_) => {
                        table.remove(&key);
                        false
                    }
                    None => false,
                }
            }
        }
    }

    /// Delete a lock regardless of owner. Admin escape hatch for deadlocks.
    pub async fn force_release(&self, resource: &str) -> bool {
        let key = format!("{KEY_PREFIX}{resource}");
        warn!(resource = %resource, "forcing lock release");

        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                redis::cmd("DEL")
                    .arg(&key)
                    .query_async::<_, i64>(&mut conn)
                    .await
                    .map(|n| n == 1)
                    .unwrap_or(false)
            }
            Backend::Local(table) => table.lock().await.remove(&key).is_some(),
        }
    }

    async fn try_acquire(
        &self,
        resource: &str,
        lock_id: &str,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let key = format!("{KEY_PREFIX}{resource}");

        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let acquired: Option<String> = redis::cmd("SET")
                    .arg(&key)
                    .arg(lock_id)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| LockError::Backend(e.to_string()))?;
                Ok(acquired.is_some())
            }
            Backend::Local(table) => {
                let mut table = table.lock().await;
                let now = Instant::now();
                match table.get(&key) {
                    Some((_, expires)) if *expires > now => Ok(false),
                    _ => {
                        table.insert(key, (lock_id.to_string(), now + ttl));
                        Ok(true)
                    }
                }
            }
        }
    }

    async fn release(&self, resource: &str, lock_id: &str) {
        let key = format!("{KEY_PREFIX}{resource}");

        let released = match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                redis::Script::new(RELEASE_SCRIPT)
                    .key(&key)
                    .arg(lock_id)
                    .invoke_async::<_, i64>(&mut conn)
                    .await
                    .map(|n| n == 1)
                    .unwrap_or_else(|e| {
                        warn!(resource = %resource, error = %e, "lock release failed");
                        false
                    })
            }
            Backend::Local(table) => {
                let mut table = table.lock().await;
                match table.get(&key) {
                    Some((owner, _)) if owner == lock_id => {
                        table.remove(&key);
                        true
                    }
                    _ => false,
                }
            }
        };

        if released {
            debug!(resource = %resource, "lock released");
        } else {
            warn!(resource = %resource, "lock already expired or taken by another owner");
        }
    }

    async fn extend(&self, resource: &str, lock_id: &str, new_ttl: Duration) -> bool {
        let key = format!("{KEY_PREFIX}{resource}");

        match &self.backend {
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                redis::Script::new(EXTEND_SCRIPT)
                    .key(&key)
                    .arg(lock_id)
                    .arg(new_ttl.as_secs().max(1))
                    .invoke_async::<_, i64>(&mut conn)
                    .await
                    .map(|n| n == 1)
                    .unwrap_or_else(|e| {
                        warn!(resource = %resource, error = %e, "lock extend failed");
                        false
                    })
            }
            Backend::Local(table) => {
                let mut table = table.lock().await;
                match table.get_mut(&key) {
                    Some((owner, expires)) if owner == lock_id => {
                        *expires = Instant::now() + new_ttl;
                        true
                    }
                    _ => false,
                }
            }
        }
    }
}

/// An owned lock. Must be released on every termination path; a crashed
/// holder is covered by the TTL.
pub struct LockGuard {
    manager: LockManager,
    resource: String,
    lock_id: String,
    ttl: Duration,
    released: bool,
}

impl LockGuard {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Push the expiry out to `ttl + additional` from now.
    pub async fn extend(&mut self, additional: Duration) -> bool {
        if self.released {
            return false;
        }
        let new_ttl = self.ttl + additional;
        let extended = self
            .manager
            .extend(&self.resource, &self.lock_id, new_ttl)
            .await;
        if extended {
            self.ttl = new_ttl;
            debug!(resource = %self.resource, ttl_secs = new_ttl.as_secs(), "lock extended");
        }
        extended
    }

    /// Release if still owned. Idempotent.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.manager.release(&self.resource, &self.lock_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mutual_exclusion_and_release() {
        let manager = LockManager::local();
        let ttl = Duration::from_secs(5);

        let mut guard = manager.acquire("fixture:1", ttl).await.unwrap();
        assert!(manager.is_locked("fixture:1").await);

        // Second holder fails fast.
        let err = manager
            .acquire_with("fixture:1", ttl, 2, Duration::from_millis(1))
            .await;
        assert!(matches!(err, Err(LockError::Unavailable(_))));

        guard.release().await;
        assert!(!manager.is_locked("fixture:1").await);

        let mut again = manager.acquire("fixture:1", ttl).await.unwrap();
        again.release().await;
    }

    #[tokio::test]
    async fn expired_lock_can_be_reacquired() {
        let manager = LockManager::local();
        let _abandoned = manager
            .acquire("fixture:2", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let mut guard = manager
            .acquire_with("fixture:2", Duration::from_secs(5), 1, Duration::ZERO)
            .await
            .unwrap();
        guard.release().await;
    }

    #[tokio::test]
    async fn release_is_fenced_by_owner_id() {
        let manager = LockManager::local();
        let mut first = manager
            .acquire("fixture:3", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        let mut second = manager
            .acquire_with("fixture:3", Duration::from_secs(5), 1, Duration::ZERO)
            .await
            .unwrap();

        // The stale holder's release must not free the new owner's lock.
        first.release().await;
        assert!(manager.is_locked("fixture:3").await);
        second.release().await;
    }

    #[tokio::test]
    async fn force_release_ignores_ownership() {
        let manager = LockManager::local();
        let _guard = manager
            .acquire("fixture:4", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(manager.force_release("fixture:4").await);
        assert!(!manager.is_locked("fixture:4").await);
    }

    #[tokio::test]
    async fn extend_pushes_expiry_forward() {
        let manager = LockManager::local();
        let mut guard = manager
            .acquire("fixture:5", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(guard.extend(Duration::from_secs(5)).await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(manager.is_locked("fixture:5").await);
        guard.release().await;
    }
}
