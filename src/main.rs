//! Football Match Analysis Context Service
//!
//! Serves bet-type analyses per fixture with a compute-once policy: one data
//! collection per fixture, idempotent refresh, everything else from the store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use match_context::agent::ContextAgent;
use match_context::api::{ApiCache, HttpFootballApi};
use match_context::collector::DataCollector;
use match_context::config::Config;
use match_context::http;
use match_context::lock::LockManager;
use match_context::store::{DbStore, FileStore, MatchContextStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("match_context=info".parse().unwrap()),
        )
        .init();

    info!("Match Context Service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    // Redis backs the response cache and the distributed locks. Without it
    // the service still runs, with process-local locks and no response cache.
    let redis = if config.enable_redis_cache {
        match connect_redis_with_retry(&config.redis_url, 5).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "redis unavailable, falling back to local locks");
                None
            }
        }
    } else {
        None
    };

    let locks = match redis.clone() {
        Some(conn) => LockManager::redis(conn),
        None => LockManager::local(),
    };

    let api = Arc::new(HttpFootballApi::new(
        &config.football_api_base_url,
        &config.football_api_key,
        config.api_rate_limit_per_minute,
        ApiCache::new(redis),
    )?);

    let store = if config.use_db_match_store {
        let database_url = config
            .database_url
            .as_deref()
            .context("USE_DB_MATCH_STORE=true requires DATABASE_URL")?;
        MatchContextStore::Db(DbStore::connect(database_url).await?)
    } else {
        MatchContextStore::File(FileStore::new(&config.match_store_path).await?)
    };

    let collector = DataCollector::new(api.clone(), config.max_parallel_tool_calls)
        .with_budget(std::time::Duration::from_secs(config.collection_budget_secs));

    let agent = Arc::new(
        ContextAgent::new(api, collector, store, locks)
            .with_lock_ttl(std::time::Duration::from_secs(config.lock_ttl_secs))
            .with_status_refresh_for_ns(config.match_status_check_for_ns),
    );

    let app = http::router(agent);
    let addr = format!("0.0.0.0:{}", config.health_port);
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down cleanly");
    Ok(())
}

async fn connect_redis_with_retry(
    url: &str,
    max_retries: u32,
) -> Result<redis::aio::ConnectionManager> {
    let mut attempt = 0;
    loop {
        let result = match redis::Client::open(url) {
            Ok(client) => redis::aio::ConnectionManager::new(client)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };

        match result {
            Ok(conn) => {
                info!("connected to Redis");
                return Ok(conn);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(e.context(format!(
                        "failed to connect to Redis after {max_retries} attempts"
                    )));
                }
                warn!(attempt, error = %e, "redis connection failed, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(2u64.pow(attempt))).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler");
    }
    info!("shutting down...");
}
