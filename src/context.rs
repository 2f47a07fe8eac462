//! Persisted schema: the match context and its parts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CONTEXT_VERSION: &str = "2.0";

/// The eight bet types every persisted context carries.
pub const BET_TYPES: [&str; 8] = [
    "1x2",
    "goals",
    "shots",
    "corners",
    "cards_team",
    "card_player",
    "scorer",
    "assister",
];

/// Analysis output for one bet type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BetAnalysisData {
    #[serde(default)]
    pub indicators: Map<String, Value>,
    /// Bundle sections that were available when the analysis ran.
    #[serde(default)]
    pub data_sources: Vec<String>,
    /// True iff every section the analyzer requires was present.
    #[serde(default)]
    pub coverage_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u32,
    /// Upstream calls attempted during the collection that produced this
    /// context, failures included.
    #[serde(default)]
    pub api_calls_count: u32,
}

fn default_version() -> String {
    CONTEXT_VERSION.to_string()
}

impl MatchMetadata {
    pub fn new(api_calls_count: u32) -> Self {
        Self {
            version: CONTEXT_VERSION.to_string(),
            created_at: Utc::now(),
            last_accessed: None,
            access_count: 0,
            api_calls_count,
        }
    }
}

/// The persisted, analyzed, access-tracked record for one fixture.
/// The raw bundle is discarded once the analyzers have run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchContext {
    pub fixture_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub season: i32,
    pub date: DateTime<Utc>,
    /// Status short code, a snapshot taken at analysis time.
    pub status: String,
    pub analyses: BTreeMap<String, BetAnalysisData>,
    pub metadata: MatchMetadata,

    // Causal-analysis attachment, consumed as an opaque payload.
    #[serde(default)]
    pub causal_metrics: Map<String, Value>,
    #[serde(default)]
    pub causal_findings: Vec<Value>,
    #[serde(default)]
    pub causal_confidence: Option<String>,
    #[serde(default)]
    pub causal_version: Option<String>,
}

impl MatchContext {
    /// Attach a causal-analysis payload. Accepts both the long and the short
    /// field spellings used by the producer.
    pub fn attach_causal(&mut self, payload: &Value) {
        self.causal_metrics = payload
            .get("calculated_metrics")
            .or_else(|| payload.get("metrics"))
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        self.causal_findings = payload
            .get("rule_findings")
            .or_else(|| payload.get("findings"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        self.causal_confidence = payload
            .get("confidence_overall")
            .or_else(|| payload.get("confidence"))
            .and_then(|v| v.as_str())
            .map(String::from);
        self.causal_version = payload
            .get("version")
            .and_then(|v| v.as_str())
            .map(String::from);
    }
}

/// Compact per-context row for the admin listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub fixture_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub date: DateTime<Utc>,
    pub status: String,
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&MatchContext> for ContextSummary {
    fn from(ctx: &MatchContext) -> Self {
        Self {
            fixture_id: ctx.fixture_id,
            home_team: ctx.home_team.clone(),
            away_team: ctx.away_team.clone(),
            league: ctx.league.clone(),
            date: ctx.date,
            status: ctx.status.clone(),
            access_count: ctx.metadata.access_count,
            created_at: ctx.metadata.created_at,
        }
    }
}
