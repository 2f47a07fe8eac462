//! End-to-end agent scenarios against the counting stub provider.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use common::{test_agent, StubApi};
use match_context::agent::ContextSource;
use match_context::context::BET_TYPES;
use match_context::error::AgentError;

/// One full collection: fixture + predictions + h2h + 3x4 details + 11
/// complementary calls.
const FULL_COLLECTION_CALLS: u32 = 26;

#[tokio::test]
async fn cold_miss_collects_and_analyzes_everything() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    let result = agent.get_match_context(1347240, false).await.unwrap();

    assert_eq!(result.source, ContextSource::Fresh);
    assert_eq!(result.api_calls, FULL_COLLECTION_CALLS);

    let context = &result.context;
    assert_eq!(context.home_team, "Mali");
    assert_eq!(context.away_team, "Zambia");
    assert_eq!(context.league, "Africa Cup of Nations");
    assert_eq!(context.season, 2025);
    assert_eq!(context.status, "NS");

    // All eight bet types, all complete.
    let keys: Vec<&str> = context.analyses.keys().map(String::as_str).collect();
    let mut expected = BET_TYPES.to_vec();
    expected.sort_unstable();
    assert_eq!(keys, expected);
    for (bet_type, analysis) in &context.analyses {
        assert!(
            analysis.coverage_complete,
            "expected complete coverage for {bet_type}"
        );
    }

    // Cost attribution: the persisted count equals the attempts the stub saw.
    assert_eq!(
        context.metadata.api_calls_count,
        stub.calls.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn cache_hit_touches_access_metadata_and_makes_no_calls() {
    let stub = Arc::new(StubApi::with_status("FT"));
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    agent.get_match_context(1347274, false).await.unwrap();
    let calls_after_collection = stub.calls.load(Ordering::SeqCst);

    let first = agent.get_match_context(1347274, false).await.unwrap();
    assert_eq!(first.source, ContextSource::Cache);
    assert_eq!(first.api_calls, 0);
    assert_eq!(first.context.metadata.access_count, 1);
    assert!(first.context.metadata.last_accessed.is_some());

    let second = agent.get_match_context(1347274, false).await.unwrap();
    assert_eq!(second.context.metadata.access_count, 2);

    // Monotonic access, and no further upstream traffic.
    assert!(second.context.metadata.access_count > first.context.metadata.access_count);
    assert_eq!(stub.calls.load(Ordering::SeqCst), calls_after_collection);
}

#[tokio::test]
async fn missing_h2h_details_degrade_coverage_but_still_persist() {
    let stub = Arc::new(StubApi::without_h2h_details());
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    let result = agent.get_match_context(1347241, false).await.unwrap();
    assert_eq!(result.source, ContextSource::Fresh);
    // Failed calls still count toward the attempt total.
    assert_eq!(result.api_calls, FULL_COLLECTION_CALLS);

    let analyses = &result.context.analyses;
    for bet_type in ["shots", "corners", "cards_team", "card_player", "scorer", "assister"] {
        assert!(
            !analyses[bet_type].coverage_complete,
            "{bet_type} should be incomplete without h2h details"
        );
    }
    for bet_type in ["1x2", "goals"] {
        assert!(
            analyses[bet_type].coverage_complete,
            "{bet_type} should not depend on h2h details"
        );
    }

    // The per-bet read exposes the gap.
    let view = agent
        .get_bet_analysis(1347241, "shots")
        .await
        .unwrap()
        .unwrap();
    assert!(!view.coverage_complete);
    assert_eq!(view.missing_sources, vec!["h2h_details".to_string()]);
}

#[tokio::test]
async fn concurrent_first_access_collects_once() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    let callers = (0..10).map(|_| {
        let agent = agent.clone();
        async move { agent.get_match_context(9999, false).await }
    });
    let results: Vec<_> = join_all(callers).await;

    // Exactly one collection hit the provider.
    assert_eq!(stub.fixture_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.calls.load(Ordering::SeqCst), FULL_COLLECTION_CALLS);

    let mut fresh = 0;
    let mut reference: Option<match_context::MatchContext> = None;
    for result in results {
        let result = result.expect("all callers succeed");
        if result.source == ContextSource::Fresh {
            fresh += 1;
        }
        // Persisted fields are identical across callers.
        if let Some(reference) = &reference {
            assert_eq!(result.context.analyses, reference.analyses);
            assert_eq!(result.context.fixture_id, reference.fixture_id);
            assert_eq!(result.context.home_team, reference.home_team);
            assert_eq!(
                result.context.metadata.api_calls_count,
                reference.metadata.api_calls_count
            );
        } else {
            reference = Some(result.context);
        }
    }
    assert_eq!(fresh, 1);
}

#[tokio::test]
async fn force_refresh_recollects_and_keeps_access_history() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    agent.get_match_context(5555, false).await.unwrap();

    let refreshed = agent.get_match_context(5555, true).await.unwrap();
    assert_eq!(refreshed.source, ContextSource::Fresh);
    assert_eq!(stub.fixture_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        stub.calls.load(Ordering::SeqCst),
        2 * FULL_COLLECTION_CALLS
    );

    // Access history survives the refresh; the next read is access 1.
    let after = agent.get_match_context(5555, false).await.unwrap();
    assert_eq!(after.source, ContextSource::Cache);
    assert_eq!(after.context.metadata.access_count, 1);
}

#[tokio::test]
async fn force_refresh_accumulates_prior_access_counts() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    agent.get_match_context(5556, false).await.unwrap();
    agent.get_match_context(5556, false).await.unwrap(); // access 1
    agent.get_match_context(5556, false).await.unwrap(); // access 2

    agent.get_match_context(5556, true).await.unwrap();

    let after = agent.get_match_context(5556, false).await.unwrap();
    assert_eq!(after.context.metadata.access_count, 3);
}

#[tokio::test]
async fn empty_fixture_response_is_not_found() {
    let stub = Arc::new(StubApi {
        empty_fixture: true,
        ..StubApi::default()
    });
    let (agent, _locks, _dir) = test_agent(stub.clone()).await;

    let err = agent.get_match_context(424242, false).await.unwrap_err();
    assert!(matches!(err, AgentError::FixtureNotFound(424242)));

    // Nothing was persisted.
    assert!(agent.cached_contexts().await.unwrap().is_empty());
}

#[tokio::test]
async fn held_lock_surfaces_busy() {
    let stub = Arc::new(StubApi::full());
    let (agent, locks, _dir) = test_agent(stub.clone()).await;

    let mut guard = locks
        .acquire("fixture:7777", Duration::from_secs(30))
        .await
        .unwrap();

    let err = agent.get_match_context(7777, false).await.unwrap_err();
    assert!(matches!(err, AgentError::Busy(7777)));
    assert_eq!(stub.fixture_calls.load(Ordering::SeqCst), 0);

    guard.release().await;
}

#[tokio::test]
async fn expired_lock_of_a_crashed_worker_does_not_block() {
    let stub = Arc::new(StubApi::full());
    let (agent, locks, _dir) = test_agent(stub.clone()).await;

    // A "crashed" worker: lock acquired, never released, short TTL.
    let _abandoned = locks
        .acquire("fixture:8888", Duration::from_millis(300))
        .await
        .unwrap();

    // The acquire retries outlive the TTL, so the request proceeds cleanly.
    let result = agent.get_match_context(8888, false).await.unwrap();
    assert_eq!(result.source, ContextSource::Fresh);
}

#[tokio::test]
async fn ns_status_refresh_on_cache_hit() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = common::test_agent_with(stub.clone(), true).await;

    agent.get_match_context(3333, false).await.unwrap();
    assert_eq!(stub.fixture_calls.load(Ordering::SeqCst), 1);

    // Cached status is NS; a hit issues exactly one status lookup.
    let hit = agent.get_match_context(3333, false).await.unwrap();
    assert_eq!(hit.source, ContextSource::Cache);
    assert_eq!(hit.api_calls, 1);
    assert_eq!(stub.fixture_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn bet_analysis_for_unknown_fixture_is_none() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub).await;

    assert!(agent.get_bet_analysis(1, "goals").await.unwrap().is_none());
}

#[tokio::test]
async fn analyses_are_deterministic_across_refreshes() {
    let stub = Arc::new(StubApi::full());
    let (agent, _locks, _dir) = test_agent(stub).await;

    let first = agent.get_match_context(2222, false).await.unwrap();
    let second = agent.get_match_context(2222, true).await.unwrap();

    // Same upstream data, equal analyses (purity of the analyzer set).
    assert_eq!(first.context.analyses, second.context.analyses);
    assert_eq!(first.context.home_team, second.context.home_team);
    assert_eq!(first.context.status, second.context.status);
}
