#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cinerank::{
    cache::{MemoryCacheBackend, RecommendationCache},
    models::{Movie, Rating, UserId},
    services::{
        algorithms::{ItemCosineRecommender, Recommender, ScoredMovie},
        publishers::MemoryPublisher,
        EngineSettings, EventNotifier, NotifierHandle, RecommendationEngine,
    },
    store::{InMemoryRatingStore, RatingStore},
};

pub const TOPIC: &str = "fastapi_responses";

fn genres(raw: &str) -> Vec<String> {
    Movie::parse_genres(raw)
}

/// Seven movies, four users; "Documentary" exists but has no ratings
pub fn fixture_store() -> InMemoryRatingStore {
    let movies = vec![
        Movie::new("movie1", "Toy Story", genres("Animation|Comedy")),
        Movie::new("movie2", "Heat", genres("Action|Crime")),
        Movie::new("movie3", "Casino", genres("Crime|Drama")),
        Movie::new("movie4", "Jumanji", genres("Adventure|Comedy")),
        Movie::new("movie5", "Grumpier Old Men", genres("Comedy|Romance")),
        Movie::new("movie6", "Sabrina", genres("Comedy|Romance")),
        Movie::new("movie7", "Hoop Dreams", genres("Documentary")),
    ];

    let ratings = [
        ("101", "movie1", 5, 1),
        ("101", "movie2", 3, 2),
        ("101", "movie4", 4, 3),
        ("102", "movie1", 4, 1),
        ("102", "movie3", 5, 2),
        ("102", "movie5", 2, 3),
        ("103", "movie2", 4, 1),
        ("103", "movie3", 4, 2),
        ("103", "movie6", 5, 3),
        ("103", "movie4", 3, 4),
        ("104", "movie5", 5, 1),
        ("104", "movie6", 4, 2),
        ("104", "movie1", 3, 3),
    ]
    .into_iter()
    .map(|(user, movie, score, ts)| Rating::from_unix(user, movie, score, ts).unwrap())
    .collect();

    InMemoryRatingStore::new(movies, ratings)
}

pub fn test_settings() -> EngineSettings {
    EngineSettings {
        top_n: 10,
        top_rated_min_ratings: 2,
        cache_ttl: Duration::from_secs(3600),
        compute_timeout: Duration::from_secs(5),
    }
}

/// Item-cosine recommender that counts invocations and can be slowed down
pub struct CountingRecommender {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingRecommender {
    pub fn new(calls: Arc<AtomicUsize>, delay: Duration) -> Self {
        Self { calls, delay }
    }
}

impl Recommender for CountingRecommender {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn recommend(
        &self,
        store: &dyn RatingStore,
        user_id: &UserId,
        limit: usize,
    ) -> Vec<ScoredMovie> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Runs on the blocking pool
        std::thread::sleep(self.delay);
        ItemCosineRecommender.recommend(store, user_id, limit)
    }
}

pub struct Harness {
    pub engine: RecommendationEngine,
    pub backend: Arc<MemoryCacheBackend>,
    pub publisher: MemoryPublisher,
    pub recommend_calls: Arc<AtomicUsize>,
    notifier_handle: NotifierHandle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(test_settings(), Duration::ZERO)
    }

    /// Must be called inside a tokio runtime
    pub fn with(settings: EngineSettings, recommend_delay: Duration) -> Self {
        let backend = Arc::new(MemoryCacheBackend::new());
        let publisher = MemoryPublisher::new();
        let recommend_calls = Arc::new(AtomicUsize::new(0));

        let (notifier, notifier_handle) =
            EventNotifier::new(Arc::new(publisher.clone()), TOPIC, 64);

        let engine = RecommendationEngine::new(
            Arc::new(fixture_store()),
            RecommendationCache::new(backend.clone()),
            notifier,
            settings,
        )
        .with_recommender(Arc::new(CountingRecommender::new(
            Arc::clone(&recommend_calls),
            recommend_delay,
        )));

        Self {
            engine,
            backend,
            publisher,
            recommend_calls,
            notifier_handle,
        }
    }

    pub fn recommend_calls(&self) -> usize {
        self.recommend_calls.load(Ordering::SeqCst)
    }

    /// Flushes the notifier and returns every published event
    pub async fn published(self) -> Vec<(String, String)> {
        self.notifier_handle.shutdown().await.unwrap();
        self.publisher.events().await
    }
}
