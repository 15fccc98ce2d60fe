use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::{CacheKey, RecommendationCache},
    error::{AppError, AppResult},
    models::{
        MovieId, PopularMoviesResponse, RecommendationResponse, TopMoviesByGenreResponse,
        UpNextMoviesResponse, UserId,
    },
    services::{
        algorithms::{self, ItemCosineRecommender, Recommender},
        notifier::EventNotifier,
    },
    store::RatingStore,
};

/// Longest consumed sequence `up_next` ranks from
pub const MAX_CONSUMED_MOVIES: usize = 100;

/// Tunables of the serving path
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Length bound of every ranking
    pub top_n: usize,
    /// Minimum rating count for genre top-rated lists
    pub top_rated_min_ratings: u32,
    pub cache_ttl: Duration,
    /// Bound on waiting for a computation, shared or not
    pub compute_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            top_n: 10,
            top_rated_min_ratings: 5,
            cache_ttl: Duration::from_secs(3600),
            compute_timeout: Duration::from_secs(5),
        }
    }
}

/// Orchestrates validation, caching, ranking and event emission
///
/// Every successful operation runs `validate -> cache lookup -> (compute ->
/// store) -> notify`. Rankings run on the blocking pool; the notifier never
/// delays or fails a response.
#[derive(Clone)]
pub struct RecommendationEngine {
    store: Arc<dyn RatingStore>,
    cache: RecommendationCache,
    notifier: EventNotifier,
    recommender: Arc<dyn Recommender>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn RatingStore>,
        cache: RecommendationCache,
        notifier: EventNotifier,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            recommender: Arc::new(ItemCosineRecommender),
            settings,
        }
    }

    /// Replaces the personalized recommendation strategy
    pub fn with_recommender(mut self, recommender: Arc<dyn Recommender>) -> Self {
        self.recommender = recommender;
        self
    }

    /// Personalized recommendations for a user with rating history
    pub async fn recommend(&self, user_id: UserId) -> AppResult<RecommendationResponse> {
        self.validate_user(&user_id)?;

        let limit = self.settings.top_n;
        let key = CacheKey::recommend(&user_id, limit);
        let recommender = Arc::clone(&self.recommender);
        tracing::debug!(
            user_id = %user_id,
            recommender = recommender.name(),
            "Serving personalized recommendations"
        );
        let target = user_id.clone();
        let recommendations: Vec<MovieId> = self
            .cached(&key, move |store| {
                Ok(algorithms::movie_ids(recommender.recommend(store, &target, limit)))
            })
            .await?;

        let response = RecommendationResponse {
            user_id,
            recommendations,
        };
        self.notify(Some(&response.user_id), &response);
        Ok(response)
    }

    /// Popular movies, global or restricted to a genre
    ///
    /// A blank genre means global popularity.
    pub async fn popular(
        &self,
        user_id: UserId,
        genre: Option<&str>,
    ) -> AppResult<PopularMoviesResponse> {
        self.validate_user(&user_id)?;

        let genre = genre
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);
        if let Some(genre) = &genre {
            self.validate_genre(genre)?;
        }

        let limit = self.settings.top_n;
        let key = CacheKey::popular(genre.as_deref(), limit);
        let popular_movies: Vec<MovieId> = self
            .cached(&key, move |store| {
                let ranked = match &genre {
                    Some(genre) => algorithms::popular_movies_by_genre(store, genre, limit)?,
                    None => algorithms::popular_movies(store, limit),
                };
                Ok(algorithms::movie_ids(ranked))
            })
            .await?;

        let response = PopularMoviesResponse {
            user_id,
            popular_movies,
        };
        self.notify(Some(&response.user_id), &response);
        Ok(response)
    }

    /// Best average-rated movies of a genre as `movie_id -> title`
    pub async fn top_movies_by_genre(&self, genre: &str) -> AppResult<TopMoviesByGenreResponse> {
        let genre = genre.trim().to_string();
        self.validate_genre(&genre)?;

        let min_ratings = self.settings.top_rated_min_ratings;
        let limit = self.settings.top_n;
        let key = CacheKey::top_rated(&genre, min_ratings, limit);
        let top_movies_by_genre = self
            .cached(&key, move |store| {
                algorithms::top_rated_titles(store, &genre, min_ratings, limit)
            })
            .await?;

        let response = TopMoviesByGenreResponse {
            top_movies_by_genre,
        };
        self.notify(None, &response);
        Ok(response)
    }

    /// Continuation of an already consumed sequence of movies
    ///
    /// At most [`MAX_CONSUMED_MOVIES`] consumed movies are accepted.
    pub async fn up_next(
        &self,
        user_id: UserId,
        movies: Vec<MovieId>,
    ) -> AppResult<UpNextMoviesResponse> {
        self.validate_user(&user_id)?;
        if movies.len() > MAX_CONSUMED_MOVIES {
            return Err(AppError::InvalidInput(format!(
                "at most {} consumed movies are accepted, got {}",
                MAX_CONSUMED_MOVIES,
                movies.len()
            )));
        }

        let limit = self.settings.top_n;
        let key = CacheKey::up_next(&movies, limit);
        let up_next_movies: Vec<MovieId> = self
            .cached(&key, move |store| {
                Ok(algorithms::movie_ids(algorithms::up_next_movies(
                    store, &movies, limit,
                )))
            })
            .await?;

        let response = UpNextMoviesResponse {
            user_id,
            up_next_movies,
        };
        self.notify(Some(&response.user_id), &response);
        Ok(response)
    }

    fn validate_user(&self, user_id: &UserId) -> AppResult<()> {
        if self.store.user_exists(user_id) {
            Ok(())
        } else {
            tracing::debug!(user_id = %user_id, "Rejected user without rating history");
            Err(AppError::InvalidUser(user_id.clone()))
        }
    }

    fn validate_genre(&self, genre: &str) -> AppResult<()> {
        if !genre.trim().is_empty() && self.store.has_genre(genre) {
            Ok(())
        } else {
            Err(AppError::UnknownGenre(genre.trim().to_string()))
        }
    }

    /// Runs `compute` through the cache on the blocking pool
    async fn cached<T, F>(&self, key: &CacheKey, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(&dyn RatingStore) -> AppResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_compute_within(
                key,
                self.settings.cache_ttl,
                self.settings.compute_timeout,
                || async move {
                    tokio::task::spawn_blocking(move || compute(store.as_ref()))
                        .await
                        .map_err(|e| AppError::Internal(format!("ranking task failed: {}", e)))?
                },
            )
            .await
    }

    fn notify<T: Serialize>(&self, user_id: Option<&UserId>, body: &T) {
        if let Err(e) = self.notifier.notify(user_id, body) {
            tracing::warn!(error = %e, topic = self.notifier.topic(), "Response event not queued");
        }
    }
}
