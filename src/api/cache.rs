//! Redis-backed response cache for upstream endpoints.
//!
//! Keys are derived from the endpoint path and query; TTLs are chosen per
//! endpoint family. Cache failures degrade to a miss, never to an error.

use std::time::Duration;

use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "matchctx:api:";

/// Per-endpoint response cache. `None` connection means caching is disabled.
#[derive(Clone)]
pub struct ApiCache {
    conn: Option<redis::aio::ConnectionManager>,
}

impl ApiCache {
    pub fn new(conn: Option<redis::aio::ConnectionManager>) -> Self {
        Self { conn }
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// TTL for one endpoint family. Fixture data is volatile; leader boards
    /// and season statistics move slowly.
    pub fn ttl_for(path: &str) -> Duration {
        if path.starts_with("/players/top") {
            Duration::from_secs(6 * 3600)
        } else if path.starts_with("/standings") || path.starts_with("/teams/statistics") {
            Duration::from_secs(3600)
        } else if path.starts_with("/injuries") || path.starts_with("/sidelined") {
            Duration::from_secs(1800)
        } else {
            Duration::from_secs(300)
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.conn.clone()?;
        let full_key = format!("{KEY_PREFIX}{key}");

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key = %key, "api cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "corrupt api cache entry, ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "api cache read failed");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let full_key = format!("{KEY_PREFIX}{key}");

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "api cache serialize failed");
                return;
            }
        };

        if let Err(e) = conn
            .set_ex::<_, _, ()>(&full_key, raw, ttl.as_secs())
            .await
        {
            warn!(key = %key, error = %e, "api cache write failed");
        }
    }
}
