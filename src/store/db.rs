//! Relational context store: one row per fixture, analyses in a JSON column.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::{ContextSummary, MatchContext, MatchMetadata};
use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS match_analyses (
    fixture_id      BIGINT PRIMARY KEY,
    home_team       TEXT NOT NULL,
    away_team       TEXT NOT NULL,
    league          TEXT NOT NULL,
    season          INTEGER NOT NULL,
    match_date      TIMESTAMPTZ NOT NULL,
    match_status    TEXT NOT NULL,
    analyses_data   JSONB NOT NULL,
    api_calls_count INTEGER NOT NULL DEFAULT 0,
    version         TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    last_accessed   TIMESTAMPTZ,
    access_count    INTEGER NOT NULL DEFAULT 0,
    causal_data     JSONB
)
"#;

const ALL_COLUMNS: &str = "fixture_id, home_team, away_team, league, season, match_date, \
     match_status, analyses_data, api_calls_count, version, created_at, last_accessed, \
     access_count, causal_data";

pub struct DbStore {
    pool: PgPool,
}

impl DbStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = Self::connect_with_retry(database_url, 5).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connect_with_retry(url: &str, max_retries: u32) -> Result<PgPool, StoreError> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("connected to PostgreSQL");
                    return Ok(pool);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e.into());
                    }
                    warn!(attempt, error = %e, "database connection failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn has(&self, fixture_id: i64) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM match_analyses WHERE fixture_id = $1)",
        )
        .bind(fixture_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or(false)
    }

    /// Read-and-touch in a single statement, so concurrent readers never lose
    /// an increment.
    pub async fn get(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE match_analyses \
             SET access_count = access_count + 1, last_accessed = NOW() \
             WHERE fixture_id = $1 \
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(fixture_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let context = row_to_context(&row)?;
                debug!(
                    fixture_id,
                    access_count = context.metadata.access_count,
                    "context loaded"
                );
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }

    pub async fn peek(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ALL_COLUMNS} FROM match_analyses WHERE fixture_id = $1"
        ))
        .bind(fixture_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_context(&row)).transpose()
    }

    pub async fn save(&self, context: &MatchContext) -> Result<(), StoreError> {
        let analyses_data = serde_json::to_value(&context.analyses)?;
        let causal_data = causal_to_value(context)?;

        sqlx::query(
            r#"
            INSERT INTO match_analyses (
                fixture_id, home_team, away_team, league, season, match_date,
                match_status, analyses_data, api_calls_count, version,
                created_at, last_accessed, access_count, causal_data
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (fixture_id) DO UPDATE SET
                home_team = EXCLUDED.home_team,
                away_team = EXCLUDED.away_team,
                league = EXCLUDED.league,
                season = EXCLUDED.season,
                match_date = EXCLUDED.match_date,
                match_status = EXCLUDED.match_status,
                analyses_data = EXCLUDED.analyses_data,
                api_calls_count = EXCLUDED.api_calls_count,
                version = EXCLUDED.version,
                created_at = EXCLUDED.created_at,
                last_accessed = EXCLUDED.last_accessed,
                access_count = EXCLUDED.access_count,
                causal_data = EXCLUDED.causal_data
            "#,
        )
        .bind(context.fixture_id)
        .bind(&context.home_team)
        .bind(&context.away_team)
        .bind(&context.league)
        .bind(context.season)
        .bind(context.date)
        .bind(&context.status)
        .bind(analyses_data)
        .bind(context.metadata.api_calls_count as i32)
        .bind(&context.metadata.version)
        .bind(context.metadata.created_at)
        .bind(context.metadata.last_accessed)
        .bind(context.metadata.access_count as i32)
        .bind(causal_data)
        .execute(&self.pool)
        .await?;

        info!(fixture_id = context.fixture_id, "context saved");
        Ok(())
    }

    pub async fn delete(&self, fixture_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM match_analyses WHERE fixture_id = $1")
            .bind(fixture_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(&self) -> Result<Vec<i64>, StoreError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT fixture_id FROM match_analyses ORDER BY fixture_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<i64>, StoreError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT fixture_id FROM match_analyses \
             WHERE UPPER(match_status) = UPPER($1) ORDER BY fixture_id",
        )
        .bind(status.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn summarize(&self) -> Result<Vec<ContextSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT fixture_id, home_team, away_team, league, match_date, match_status, \
             access_count, created_at FROM match_analyses ORDER BY match_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ContextSummary {
                    fixture_id: row.try_get("fixture_id")?,
                    home_team: row.try_get("home_team")?,
                    away_team: row.try_get("away_team")?,
                    league: row.try_get("league")?,
                    date: row.try_get("match_date")?,
                    status: row.try_get("match_status")?,
                    access_count: row.try_get::<i32, _>("access_count")? as u32,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn cleanup_older_than(&self, days: i64) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let result = sqlx::query("DELETE FROM match_analyses WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!(deleted, days, "context cleanup complete");
        Ok(deleted)
    }

    pub async fn update_causal_cache(
        &self,
        fixture_id: i64,
        payload: &Value,
    ) -> Result<bool, StoreError> {
        let Some(mut context) = self.peek(fixture_id).await? else {
            return Ok(false);
        };

        context.attach_causal(payload);
        let causal_data = causal_to_value(&context)?;

        sqlx::query("UPDATE match_analyses SET causal_data = $2 WHERE fixture_id = $1")
            .bind(fixture_id)
            .bind(causal_data)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }
}

fn causal_to_value(context: &MatchContext) -> Result<Value, StoreError> {
    Ok(serde_json::json!({
        "metrics": context.causal_metrics,
        "findings": context.causal_findings,
        "confidence": context.causal_confidence,
        "version": context.causal_version,
    }))
}

fn row_to_context(row: &PgRow) -> Result<MatchContext, StoreError> {
    let analyses_data: Value = row.try_get("analyses_data")?;
    let analyses = serde_json::from_value(analyses_data)?;

    let causal: Option<Value> = row.try_get("causal_data")?;
    let causal = causal.unwrap_or(Value::Null);

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let last_accessed: Option<DateTime<Utc>> = row.try_get("last_accessed")?;

    Ok(MatchContext {
        fixture_id: row.try_get("fixture_id")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        league: row.try_get("league")?,
        season: row.try_get("season")?,
        date: row.try_get("match_date")?,
        status: row.try_get("match_status")?,
        analyses,
        metadata: MatchMetadata {
            version: row.try_get("version")?,
            created_at,
            last_accessed,
            access_count: row.try_get::<i32, _>("access_count")? as u32,
            api_calls_count: row.try_get::<i32, _>("api_calls_count")? as u32,
        },
        causal_metrics: causal
            .get("metrics")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default(),
        causal_findings: causal
            .get("findings")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        causal_confidence: causal
            .get("confidence")
            .and_then(|v| v.as_str())
            .map(String::from),
        causal_version: causal
            .get("version")
            .and_then(|v| v.as_str())
            .map(String::from),
    })
}
