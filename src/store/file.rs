//! File-per-fixture JSON store.
//!
//! One pretty-printed UTF-8 file per fixture, `match_{fixture_id}.json`.
//! Writes go to a temp file in the same directory followed by a rename, so a
//! crash never leaves a half-valid file.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::context::{ContextSummary, MatchContext};
use crate::error::StoreError;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(path = %root.display(), "file context store initialized");
        Ok(Self { root })
    }

    fn context_path(&self, fixture_id: i64) -> PathBuf {
        self.root.join(format!("match_{fixture_id}.json"))
    }

    pub async fn has(&self, fixture_id: i64) -> bool {
        tokio::fs::try_exists(self.context_path(fixture_id))
            .await
            .unwrap_or(false)
    }

    pub async fn get(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        let Some(mut context) = self.peek(fixture_id).await? else {
            return Ok(None);
        };

        context.metadata.access_count += 1;
        context.metadata.last_accessed = Some(Utc::now());
        self.write_atomic(&context).await?;

        debug!(
            fixture_id,
            access_count = context.metadata.access_count,
            "context loaded"
        );
        Ok(Some(context))
    }

    pub async fn peek(&self, fixture_id: i64) -> Result<Option<MatchContext>, StoreError> {
        let path = self.context_path(fixture_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(context) => Ok(Some(context)),
            Err(e) => {
                // A corrupt file reads as absent; the next analysis rewrites it.
                error!(fixture_id, error = %e, "corrupt context file");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, context: &MatchContext) -> Result<(), StoreError> {
        self.write_atomic(context).await?;
        info!(
            fixture_id = context.fixture_id,
            home = %context.home_team,
            away = %context.away_team,
            "context saved"
        );
        Ok(())
    }

    pub async fn delete(&self, fixture_id: i64) -> Result<bool, StoreError> {
        let path = self.context_path(fixture_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(fixture_id, "context deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(fixture_id, "cannot delete: context not found");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<i64>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = parse_context_filename(&entry.path()) {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<i64>, StoreError> {
        let wanted = status.trim().to_uppercase();
        let mut ids = Vec::new();

        for fixture_id in self.list_all().await? {
            if let Some(context) = self.peek(fixture_id).await? {
                if context.status.to_uppercase() == wanted {
                    ids.push(fixture_id);
                }
            }
        }

        Ok(ids)
    }

    pub async fn summarize(&self) -> Result<Vec<ContextSummary>, StoreError> {
        let mut summaries = Vec::new();

        for fixture_id in self.list_all().await? {
            if let Some(context) = self.peek(fixture_id).await? {
                summaries.push(ContextSummary::from(&context));
            }
        }

        Ok(summaries)
    }

    pub async fn cleanup_older_than(&self, days: i64) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut deleted = 0;

        for fixture_id in self.list_all().await? {
            let Some(context) = self.peek(fixture_id).await? else {
                continue;
            };
            if context.metadata.created_at < cutoff && self.delete(fixture_id).await? {
                deleted += 1;
            }
        }

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
        self.write_atomic(&context).await?;
        Ok(true)
    }

    async fn write_atomic(&self, context: &MatchContext) -> Result<(), StoreError> {
        let path = self.context_path(context.fixture_id);
        let tmp = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(context)?;
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn parse_context_filename(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("match_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}
