//! Service configuration, read once from the environment.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Immutable configuration threaded through constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream provider credentials/endpoint.
    pub football_api_key: String,
    pub football_api_base_url: String,
    /// Redis back-end for caching and distributed locks.
    pub redis_url: String,
    pub enable_redis_cache: bool,
    /// Collector fan-out cap.
    pub max_parallel_tool_calls: usize,
    /// Store back-end selector: true = PostgreSQL, false = JSON files.
    pub use_db_match_store: bool,
    /// Refresh the status snapshot for not-started fixtures on cache reads.
    pub match_status_check_for_ns: bool,
    pub database_url: Option<String>,
    pub match_store_path: PathBuf,
    pub health_port: u16,
    /// Upstream quota, requests per minute.
    pub api_rate_limit_per_minute: u32,
    /// Wall-clock budget for one full collection.
    pub collection_budget_secs: u64,
    /// Per-fixture lock TTL; holders extend while collection runs.
    pub lock_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let football_api_key = env::var("FOOTBALL_API_KEY").unwrap_or_default();
        if football_api_key.trim().is_empty() {
            return Err(anyhow!("FOOTBALL_API_KEY is not set or empty"));
        }

        let key_lower = football_api_key.trim().to_lowercase();
        if key_lower.contains("change_me") || key_lower.contains("your_") {
            return Err(anyhow!(
                "FOOTBALL_API_KEY appears to be a placeholder value; replace with your real key"
            ));
        }

        Ok(Self {
            football_api_key,
            football_api_base_url: env::var("FOOTBALL_API_BASE_URL")
                .unwrap_or_else(|_| "https://v3.football.api-sports.io".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            enable_redis_cache: env_bool("ENABLE_REDIS_CACHE", true),
            max_parallel_tool_calls: env::var("MAX_PARALLEL_TOOL_CALLS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            use_db_match_store: env_bool("USE_DB_MATCH_STORE", false),
            match_status_check_for_ns: env_bool("MATCH_STATUS_CHECK_FOR_NS", true),
            database_url: env::var("DATABASE_URL").ok(),
            match_store_path: env::var("MATCH_STORE_PATH")
                .unwrap_or_else(|_| "./data/match_contexts".to_string())
                .into(),
            health_port: env::var("HEALTH_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            api_rate_limit_per_minute: env::var("API_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .unwrap_or(250),
            collection_budget_secs: env::var("COLLECTION_BUDGET_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()
                .unwrap_or(180),
            lock_ttl_secs: env::var("LOCK_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_bool_parses_common_forms() {
        env::set_var("CFG_TEST_FLAG", "TRUE");
        assert!(env_bool("CFG_TEST_FLAG", false));
        env::set_var("CFG_TEST_FLAG", "0");
        assert!(!env_bool("CFG_TEST_FLAG", true));
        env::remove_var("CFG_TEST_FLAG");
        assert!(env_bool("CFG_TEST_FLAG", true));
    }
}
