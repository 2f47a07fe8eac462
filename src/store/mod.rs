//! Durable persistence for match contexts.
//!
//! Two interchangeable back-ends behind one value: a file-per-fixture JSON
//! directory and a Postgres table with a JSON column for the analyses. The
//! API and semantics are identical; the raw bundle is never persisted.

mod db;
mod file;

pub use db::DbStore;
pub use file::FileStore;

use serde_json::Value;

use crate::context::{ContextSummary, MatchContext};
use crate::error::StoreError;

pub enum MatchContextStore {
    File(FileStore),
    Db(DbStore),
}

impl MatchContextStore {
    pub async fn has(&self, fixture_id: i64) -> bool {
        match self {
            Self::File(s) => s.has(fixture_id).await,
            Self::Db(s) => s.has(fixture_id).await,
        }
    }

    /// Read-and-touch: a hit increments `access_count` and moves
    /// `last_accessed` forward before the context is returned.
    pub async fn get(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        match self {
            Self::File(s) => s.get(fixture_id).await,
            Self::Db(s) => s.get(fixture_id).await,
        }
    }

    /// Read without touching access metadata.
    pub async fn peek(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        match self {
            Self::File(s) => s.peek(fixture_id).await,
            Self::Db(s) => s.peek(fixture_id).await,
        }
    }

    /// Full-replace upsert. Never leaves a half-written record behind.
    pub async fn save(&self, context: &MatchContext) -> Result<(), StoreError> {
        match self {
            Self::File(s) => s.save(context).await,
            Self::Db(s) => s.save(context).await,
        }
    }

    pub async fn delete(&self, fixture_id: i64) -> Result<bool, StoreError> {
        match self {
            Self::File(s) => s.delete(fixture_id).await,
            Self::Db(s) => s.delete(fixture_id).await,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<i64>, StoreError> {
        match self {
            Self::File(s) => s.list_all().await,
            Self::Db(s) => s.list_all().await,
        }
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<i64>, StoreError> {
        match self {
            Self::File(s) => s.list_by_status(status).await,
            Self::Db(s) => s.list_by_status(status).await,
        }
    }

    pub async fn summarize(&self) -> Result<Vec<ContextSummary>, StoreError> {
        match self {
            Self::File(s) => s.summarize().await,
            Self::Db(s) => s.summarize().await,
        }
    }

    /// Delete contexts created more than `days` days ago. Returns the count.
    pub async fn cleanup_older_than(&self, days: i64) -> Result<usize, StoreError> {
        match self {
            Self::File(s) => s.cleanup_older_than(days).await,
            Self::Db(s) => s.cleanup_older_than(days).await,
        }
    }

    /// Attach a causal-analysis payload to an existing context.
    /// Returns false when no context exists for the fixture.
    pub async fn update_causal_cache(
        &self,
        fixture_id: i64,
        payload: &Value,
    ) -> Result<bool, StoreError> {
        match self {
            Self::File(s) => s.update_causal_cache(fixture_id, payload).await,
            Self::Db(s) => s.update_causal_cache(fixture_id, payload).await,
        }
    }
}
