//! Entity resolution cache: name → id mappings for teams, leagues, players.
//!
//! Entries are immutable facts with a long TTL, so write-last-wins is safe.
//! Redis holds the durable copy when enabled; an in-process map fronts it
//! either way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "matchctx:entity:";
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Team,
    League,
    Player,
}

impl EntityKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::League => "league",
            Self::Player => "player",
        }
    }
}

/// A resolved entity: provider id plus the canonical name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct EntityCache {
    local: Arc<RwLock<HashMap<String, EntityRecord>>>,
    redis: Option<redis::aio::ConnectionManager>,
    ttl: Duration,
}

impl EntityCache {
    pub fn new(redis: Option<redis::aio::ConnectionManager>) -> Self {
        Self {
            local: Arc::new(RwLock::new(HashMap::new())),
            redis,
            ttl: DEFAULT_TTL,
        }
    }

    pub async fn get(&self, kind: EntityKind, name: &str) -> Option<EntityRecord> {
        let key = Self::cache_key(kind, name);

        // Fast path: in-process map.
        {
            let local = self.local.read().await;
            if let Some(record) = local.get(&key) {
                debug!(key = %key, "entity cache hit (local)");
                return Some(record.clone());
            }
        }

        let record = self.get_from_redis(&key).await?;
        self.local.write().await.insert(key, record.clone());
        Some(record)
    }

    pub async fn set(&self, kind: EntityKind, name: &str, record: EntityRecord) {
        let key = Self::cache_key(kind, name);
        self.local.write().await.insert(key.clone(), record.clone());

        let Some(mut conn) = self.redis.clone() else {
            return;
        };
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "entity serialize failed");
                return;
            }
        };
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, raw, self.ttl.as_secs())
            .await
        {
            warn!(key = %key, error = %e, "entity cache write failed");
        }
    }

    async fn get_from_redis(&self, key: &str) -> Option<EntityRecord> {
        let mut conn = self.redis.clone()?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "entity cache read failed");
                None
            }
        }
    }

    fn cache_key(kind: EntityKind, name: &str) -> String {
        format!("{KEY_PREFIX}{}:{}", kind.as_str(), normalize_name(name))
    }
}

/// Normalize an entity name: lowercase, fold common accents, keep only
/// alphanumerics and single spaces.
pub fn normalize_name(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        match fold_accent(c) {
            Some(base) => folded.push_str(base),
            None => folded.push(c),
        }
    }

    let cleaned: String = folded
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> Option<&'static str> {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => Some("a"),
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => Some("e"),
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => Some("i"),
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => Some("o"),
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => Some("u"),
        'ç' | 'Ç' => Some("c"),
        'ñ' | 'Ñ' => Some("n"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_name("Paris Saint-Germain"), "paris saint germain");
        assert_eq!(normalize_name("  PSG  "), "psg");
        assert_eq!(normalize_name("Kylian Mbappé"), "kylian mbappe");
    }

    #[tokio::test]
    async fn local_roundtrip_without_redis() {
        let cache = EntityCache::new(None);
        assert!(cache.get(EntityKind::Team, "PSG").await.is_none());

        cache
            .set(
                EntityKind::Team,
                "PSG",
                EntityRecord {
                    id: 85,
                    name: "Paris Saint Germain".to_string(),
                },
            )
            .await;

        let record = cache.get(EntityKind::Team, "psg").await.unwrap();
        assert_eq!(record.id, 85);

        // Kinds are namespaced.
        assert!(cache.get(EntityKind::League, "PSG").await.is_none());
    }
}
