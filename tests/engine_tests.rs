mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use cinerank::{
    cache::{CacheBackend, RecommendationCache},
    error::{AppError, AppResult},
    models::{MovieId, UserId},
    services::{
        engine::MAX_CONSUMED_MOVIES, publishers::MemoryPublisher, EventNotifier,
        RecommendationEngine,
    },
};
use common::{fixture_store, test_settings, Harness, TOPIC};
use tokio::task::JoinSet;

fn ids(raw: &[&str]) -> Vec<MovieId> {
    raw.iter().map(|id| MovieId::from(*id)).collect()
}

#[tokio::test]
async fn test_recommend_excludes_rated_movies() {
    let harness = Harness::new();

    let response = harness.engine.recommend(UserId::from("101")).await.unwrap();

    assert_eq!(response.user_id, UserId::from("101"));
    assert!(!response.recommendations.is_empty());
    for seen in ids(&["movie1", "movie2", "movie4"]) {
        assert!(!response.recommendations.contains(&seen));
    }
}

#[tokio::test]
async fn test_recommend_is_deterministic_across_engines() {
    let first = Harness::new();
    let second = Harness::new();

    for user in ["101", "102", "103", "104"] {
        let a = first.engine.recommend(UserId::from(user)).await.unwrap();
        let b = second.engine.recommend(UserId::from(user)).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_cache_hit_skips_computation() {
    let harness = Harness::new();

    let first = harness.engine.recommend(UserId::from("102")).await.unwrap();
    let second = harness.engine.recommend(UserId::from("102")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.recommend_calls(), 1);
    assert_eq!(harness.backend.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_requests_compute_once() {
    let harness = Harness::with(test_settings(), Duration::from_millis(150));

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let engine = harness.engine.clone();
        tasks.spawn(async move { engine.recommend(UserId::from("103")).await });
    }

    let mut responses = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        responses.push(joined.unwrap().unwrap());
    }

    assert_eq!(harness.recommend_calls(), 1);
    assert!(responses.windows(2).all(|pair| pair[0] == pair[1]));

    // Every caller still gets its own event
    assert_eq!(harness.published().await.len(), 8);
}

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let mut settings = test_settings();
    settings.cache_ttl = Duration::from_millis(100);
    let harness = Harness::with(settings, Duration::ZERO);

    harness.engine.recommend(UserId::from("104")).await.unwrap();
    harness.engine.recommend(UserId::from("104")).await.unwrap();
    assert_eq!(harness.recommend_calls(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    harness.engine.recommend(UserId::from("104")).await.unwrap();
    assert_eq!(harness.recommend_calls(), 2);
}

#[tokio::test]
async fn test_slow_computation_times_out() {
    let mut settings = test_settings();
    settings.compute_timeout = Duration::from_millis(50);
    let harness = Harness::with(settings, Duration::from_millis(300));

    let result = harness.engine.recommend(UserId::from("101")).await;

    assert!(matches!(result, Err(AppError::ComputeTimeout(_))));
    assert!(harness.published().await.is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_rejected_everywhere() {
    let harness = Harness::new();
    let ghost = UserId::from("999");

    let expected = AppError::InvalidUser(ghost.clone());
    assert_eq!(harness.engine.recommend(ghost.clone()).await.unwrap_err(), expected);
    assert_eq!(
        harness.engine.popular(ghost.clone(), None).await.unwrap_err(),
        expected
    );
    assert_eq!(
        harness
            .engine
            .up_next(ghost, ids(&["movie1"]))
            .await
            .unwrap_err(),
        expected
    );

    assert_eq!(harness.recommend_calls(), 0);
    assert!(harness.published().await.is_empty());
}

#[tokio::test]
async fn test_popular_orders_by_count_times_mean() {
    let harness = Harness::new();

    let response = harness.engine.popular(UserId::from("101"), None).await.unwrap();

    assert_eq!(
        response.popular_movies,
        ids(&["movie1", "movie3", "movie6", "movie2", "movie4", "movie5"])
    );
}

#[tokio::test]
async fn test_blank_genre_means_global_popularity() {
    let harness = Harness::new();

    let global = harness.engine.popular(UserId::from("101"), None).await.unwrap();
    let blank = harness
        .engine
        .popular(UserId::from("101"), Some("  "))
        .await
        .unwrap();

    assert_eq!(global.popular_movies, blank.popular_movies);
}

#[tokio::test]
async fn test_popular_by_genre_stays_in_genre() {
    let harness = Harness::new();
    let comedies: BTreeSet<MovieId> = ids(&["movie1", "movie4", "movie5", "movie6"])
        .into_iter()
        .collect();

    let response = harness
        .engine
        .popular(UserId::from("102"), Some("comedy"))
        .await
        .unwrap();

    assert!(!response.popular_movies.is_empty());
    assert!(response.popular_movies.iter().all(|id| comedies.contains(id)));
}

#[tokio::test]
async fn test_popular_unknown_genre() {
    let harness = Harness::new();

    let err = harness
        .engine
        .popular(UserId::from("101"), Some("Western"))
        .await
        .unwrap_err();

    assert_eq!(err, AppError::UnknownGenre("Western".to_string()));
}

#[tokio::test]
async fn test_top_movies_by_genre() {
    let harness = Harness::new();

    let response = harness.engine.top_movies_by_genre("Comedy").await.unwrap();
    let top = response.top_movies_by_genre;

    assert_eq!(
        top.keys().cloned().collect::<Vec<_>>(),
        ids(&["movie1", "movie4", "movie5", "movie6"])
    );
    assert_eq!(top[&MovieId::from("movie1")], "Toy Story");
}

#[tokio::test]
async fn test_top_movies_by_genre_without_ratings_is_empty() {
    let harness = Harness::new();

    let response = harness
        .engine
        .top_movies_by_genre("Documentary")
        .await
        .unwrap();

    assert!(response.top_movies_by_genre.is_empty());
}

#[tokio::test]
async fn test_top_movies_by_unknown_genre() {
    let harness = Harness::new();

    let err = harness
        .engine
        .top_movies_by_genre("Nonexistent")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnknownGenre(_)));
    assert!(harness.published().await.is_empty());
}

#[tokio::test]
async fn test_up_next_excludes_consumed_movies() {
    let harness = Harness::new();
    let consumed = ids(&["movie1", "movie2", "unknown"]);

    let response = harness
        .engine
        .up_next(UserId::from("101"), consumed.clone())
        .await
        .unwrap();

    assert!(!response.up_next_movies.is_empty());
    assert!(response.up_next_movies.len() <= test_settings().top_n);
    for id in &consumed {
        assert!(!response.up_next_movies.contains(id));
    }
}

#[tokio::test]
async fn test_one_event_per_successful_call() {
    let harness = Harness::new();

    harness.engine.recommend(UserId::from("101")).await.unwrap();
    harness.engine.popular(UserId::from("101"), None).await.unwrap();
    harness.engine.top_movies_by_genre("Crime").await.unwrap();
    harness
        .engine
        .up_next(UserId::from("101"), ids(&["movie3"]))
        .await
        .unwrap();
    let _ = harness.engine.recommend(UserId::from("nobody")).await;

    let events = harness.published().await;
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|(topic, _)| topic == TOPIC));

    let payloads: Vec<serde_json::Value> = events
        .iter()
        .map(|(_, payload)| serde_json::from_str(payload).unwrap())
        .collect();
    assert_eq!(payloads[0]["user_id"], "101");
    assert!(payloads[0]["recommendations"].is_array());
    assert!(payloads[1]["popular_movies"].is_array());
    assert!(payloads[2]["user_id"].is_null());
    assert!(payloads[2]["top_movies_by_genre"].is_object());
    assert!(payloads[3]["up_next_movies"].is_array());
}

/// Cache backend whose calls never complete
struct StalledBackend;

#[async_trait::async_trait]
impl CacheBackend for StalledBackend {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> AppResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn test_stalled_cache_backend_serves_directly() {
    let mut settings = test_settings();
    settings.compute_timeout = Duration::from_secs(2);
    let cache = RecommendationCache::new(Arc::new(StalledBackend))
        .with_backend_timeout(Duration::from_millis(50));
    let (notifier, _handle) = EventNotifier::new(Arc::new(MemoryPublisher::new()), TOPIC, 8);
    let engine = RecommendationEngine::new(Arc::new(fixture_store()), cache, notifier, settings);

    let response = engine.popular(UserId::from("101"), None).await.unwrap();

    assert_eq!(response.popular_movies[0], MovieId::from("movie1"));
}

#[tokio::test]
async fn test_different_top_n_does_not_share_entries() {
    let harness = Harness::new();
    let mut narrow = test_settings();
    narrow.top_n = 2;
    let (notifier, _handle) = EventNotifier::new(Arc::new(MemoryPublisher::new()), TOPIC, 8);
    let narrow_engine = RecommendationEngine::new(
        Arc::new(fixture_store()),
        RecommendationCache::new(harness.backend.clone()),
        notifier,
        narrow,
    );

    let wide = harness.engine.popular(UserId::from("101"), None).await.unwrap();
    let short = narrow_engine.popular(UserId::from("101"), None).await.unwrap();

    assert_eq!(wide.popular_movies.len(), 6);
    assert_eq!(short.popular_movies, ids(&["movie1", "movie3"]));
}

#[tokio::test]
async fn test_up_next_rejects_oversized_history() {
    let harness = Harness::new();
    let consumed: Vec<MovieId> = (0..=MAX_CONSUMED_MOVIES)
        .map(|i| MovieId::from(format!("m{}", i)))
        .collect();

    let err = harness
        .engine
        .up_next(UserId::from("101"), consumed)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(harness.backend.len().await, 0);
}
