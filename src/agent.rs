//! Context Agent: cache-first orchestration of the match-context pipeline.
//!
//! A match is never analyzed twice. First access collects data (~25 provider
//! calls), runs the eight analyzers and saves the context; every later access
//! loads it from the store. Concurrent first accesses are serialized by a
//! per-fixture distributed lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analyzers::Analyzer;
use crate::api::FootballApi;
use crate::bundle::RawBundle;
use crate::collector::{CollectError, DataCollector};
use crate::context::{BetAnalysisData, ContextSummary, MatchContext, MatchMetadata};
use crate::error::{AgentError, LockError};
use crate::jsonutil;
use crate::lock::LockManager;
use crate::status;
use crate::store::MatchContextStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Cache,
    Fresh,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Fresh => "fresh",
        }
    }
}

#[derive(Debug)]
pub struct ContextResult {
    pub context: MatchContext,
    pub source: ContextSource,
    pub api_calls: u32,
}

/// Per-bet read: one analysis plus its coverage gap.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BetAnalysisView {
    pub bet_type: String,
    pub indicators: serde_json::Map<String, Value>,
    pub data_sources: Vec<String>,
    pub coverage_complete: bool,
    pub missing_sources: Vec<String>,
}

pub struct ContextAgent {
    api: Arc<dyn FootballApi>,
    collector: DataCollector,
    store: MatchContextStore,
    locks: LockManager,
    lock_ttl: Duration,
    /// Refresh the stored status snapshot for not-started fixtures on reads.
    status_refresh_for_ns: bool,
}

impl ContextAgent {
    pub fn new(
        api: Arc<dyn FootballApi>,
        collector: DataCollector,
        store: MatchContextStore,
        locks: LockManager,
    ) -> Self {
        Self {
            api,
            collector,
            store,
            locks,
            lock_ttl: Duration::from_secs(30),
            status_refresh_for_ns: false,
        }
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_status_refresh_for_ns(mut self, enabled: bool) -> Self {
        self.status_refresh_for_ns = enabled;
        self
    }

    /// Get the match context, from the store or by collecting fresh data.
    ///
    /// `force_refresh` bypasses the cache and re-collects. Access counts are
    /// not reset by a refresh; they accumulate over the context's lifetime.
    pub async fn get_match_context(
        &self,
        fixture_id: i64,
        force_refresh: bool,
    ) -> Result<ContextResult, AgentError> {
        if !force_refresh {
            if let Some(context) = self.store.get(fixture_id).await? {
                info!(fixture_id, "match already analyzed (cache hit)");
                return self.cache_hit(context).await;
            }
        }

        let resource = format!("fixture:{fixture_id}");
        let mut lock = match self.locks.acquire(&resource, self.lock_ttl).await {
            Ok(lock) => lock,
            Err(e) => {
                if let LockError::Backend(detail) = &e {
                    warn!(fixture_id, error = %detail, "lock backend error");
                }
                // The holder may have finished while we retried.
                if !force_refresh {
                    if let Some(context) = self.store.get(fixture_id).await? {
                        return self.cache_hit(context).await;
                    }
                }
                return Err(AgentError::Busy(fixture_id));
            }
        };

        // Another worker may have written while we waited on the lock.
        if !force_refresh {
            match self.store.get(fixture_id).await {
                Ok(Some(context)) => {
                    lock.release().await;
                    info!(fixture_id, "context written by a concurrent worker");
                    return self.cache_hit(context).await;
                }
                Ok(None) => {}
                Err(e) => {
                    lock.release().await;
                    return Err(e.into());
                }
            }
        }

        let result = {
            let work = self.collect_and_save(fixture_id);
            tokio::pin!(work);

            let mut heartbeat = tokio::time::interval(half_of(self.lock_ttl));
            heartbeat.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    result = &mut work => break result,
                    _ = heartbeat.tick() => {
                        // Collection is outliving half the TTL; push it out.
                        if !lock.extend(self.lock_ttl).await {
                            warn!(fixture_id, "lock extension refused");
                        }
                    }
                }
            }
        };

        lock.release().await;
        result
    }

    async fn collect_and_save(&self, fixture_id: i64) -> Result<ContextResult, AgentError> {
        info!(fixture_id, "collecting fresh data");

        let bundle = self
            .collector
            .collect_match_data(fixture_id)
            .await
            .map_err(|e| match e {
                CollectError::FixtureNotFound(id) => AgentError::FixtureNotFound(id),
                CollectError::Timeout(budget) => AgentError::Timeout(budget),
                CollectError::UpstreamUnavailable(endpoint) => {
                    AgentError::UpstreamUnavailable(endpoint)
                }
            })?;

        let mut analyses = BTreeMap::new();
        for analyzer in Analyzer::all() {
            let analysis = analyzer.analyze(&bundle);
            debug!(
                bet_type = analyzer.bet_type(),
                coverage_complete = analysis.coverage_complete,
                sources = analysis.data_sources.len(),
                "analysis done"
            );
            analyses.insert(analyzer.bet_type().to_string(), analysis);
        }

        let mut context = build_context(fixture_id, &bundle, analyses);

        // A refresh replaces the analysis but not the access history: the
        // counter accumulates over the context's lifetime.
        if let Some(previous) = self.store.peek(fixture_id).await? {
            context.metadata.access_count = previous.metadata.access_count;
            context.metadata.last_accessed = previous.metadata.last_accessed;
        }

        self.store.save(&context).await?;

        info!(
            fixture_id,
            home = %context.home_team,
            away = %context.away_team,
            api_calls = bundle.api_calls_count,
            "context saved"
        );

        Ok(ContextResult {
            context,
            source: ContextSource::Fresh,
            api_calls: bundle.api_calls_count,
        })
    }

    /// A hit already had its access metadata touched by the store. When the
    /// stored status is still "not started", optionally re-check it upstream
    /// so downstream consumers see kickoffs and postponements.
    async fn cache_hit(&self, mut context: MatchContext) -> Result<ContextResult, AgentError> {
        let mut api_calls = 0;

        if self.status_refresh_for_ns && status::is_scheduled(&context.status) {
            api_calls += 1;
            match self.api.get_fixture(context.fixture_id).await {
                Ok(list) => {
                    let fresh = list
                        .first()
                        .and_then(|f| jsonutil::get_str(f, &["fixture", "status", "short"]))
                        .map(|s| s.to_uppercase());

                    if let Some(fresh) = fresh {
                        if fresh != context.status.to_uppercase() {
                            info!(
                                fixture_id = context.fixture_id,
                                old = %context.status,
                                new = %fresh,
                                "status snapshot refreshed"
                            );
                            context.status = fresh;
                            self.store.save(&context).await?;
                        }
                    }
                }
                Err(e) => {
                    warn!(fixture_id = context.fixture_id, error = %e, "status refresh failed");
                }
            }
        }

        Ok(ContextResult {
            context,
            source: ContextSource::Cache,
            api_calls,
        })
    }

    /// Analysis for one bet type, or `None` when the context or the analysis
    /// is absent.
    pub async fn get_bet_analysis(
        &self,
        fixture_id: i64,
        bet_type: &str,
    ) -> Result<Option<BetAnalysisView>, AgentError> {
        let Some(context) = self.store.get(fixture_id).await? else {
            return Ok(None);
        };
        let Some(analysis) = context.analyses.get(bet_type) else {
            warn!(fixture_id, bet_type, "no analysis for bet type");
            return Ok(None);
        };

        let missing_sources = Analyzer::by_bet_type(bet_type)
            .map(|a| a.missing_sources(&analysis.data_sources))
            .unwrap_or_default();

        Ok(Some(BetAnalysisView {
            bet_type: bet_type.to_string(),
            indicators: analysis.indicators.clone(),
            data_sources: analysis.data_sources.clone(),
            coverage_complete: analysis.coverage_complete,
            missing_sources,
        }))
    }

    /// Attach a causal-analysis payload to an existing context.
    pub async fn update_causal_cache(
        &self,
        fixture_id: i64,
        payload: &Value,
    ) -> Result<bool, AgentError> {
        Ok(self.store.update_causal_cache(fixture_id, payload).await?)
    }

    pub async fn cached_contexts(&self) -> Result<Vec<i64>, AgentError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn contexts_summary(&self) -> Result<Vec<ContextSummary>, AgentError> {
        Ok(self.store.summarize().await?)
    }

    pub async fn delete_context(&self, fixture_id: i64) -> Result<bool, AgentError> {
        Ok(self.store.delete(fixture_id).await?)
    }

    pub async fn cleanup_older_than(&self, days: i64) -> Result<usize, AgentError> {
        Ok(self.store.cleanup_older_than(days).await?)
    }

    pub async fn force_release_lock(&self, fixture_id: i64) -> bool {
        self.locks
            .force_release(&format!("fixture:{fixture_id}"))
            .await
    }
}

fn half_of(ttl: Duration) -> Duration {
    (ttl / 2).max(Duration::from_millis(100))
}

fn build_context(
    fixture_id: i64,
    bundle: &RawBundle,
    analyses: BTreeMap<String, BetAnalysisData>,
) -> MatchContext {
    let fixture = &bundle.fixture;

    let date = jsonutil::get_str(fixture, &["fixture", "date"])
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    MatchContext {
        fixture_id,
        home_team: jsonutil::get_str(fixture, &["teams", "home", "name"])
            .unwrap_or("Unknown")
            .to_string(),
        away_team: jsonutil::get_str(fixture, &["teams", "away", "name"])
            .unwrap_or("Unknown")
            .to_string(),
        league: jsonutil::get_str(fixture, &["league", "name"])
            .unwrap_or("Unknown")
            .to_string(),
        season: jsonutil::get_i64(fixture, &["league", "season"]).unwrap_or(0) as i32,
        date,
        status: jsonutil::get_str(fixture, &["fixture", "status", "short"])
            .unwrap_or("NS")
            .to_uppercase(),
        analyses,
        metadata: MatchMetadata::new(bundle.api_calls_count),
        causal_metrics: serde_json::Map::new(),
        causal_findings: Vec::new(),
        causal_confidence: None,
        causal_version: None,
    }
}
