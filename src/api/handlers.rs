use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{
        HealthResponse, MovieId, PopularMoviesResponse, RecommendationResponse,
        TopMoviesByGenreResponse, UpNextMoviesResponse, UserId,
    },
};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub user_id: UserId,
    pub genre_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenreQuery {
    pub genre_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpNextQuery {
    pub user_id: UserId,
    /// Comma separated movie ids, oldest first
    #[serde(default)]
    pub movies: String,
}

impl UpNextQuery {
    pub fn movie_ids(&self) -> Vec<MovieId> {
        self.movies
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(MovieId::from)
            .collect()
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Personalized recommendations for a user
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(request_id = %request_id, user_id = %user_id, "Processing recommendation request");

    let response = state.engine.recommend(user_id).await?;

    tracing::info!(
        request_id = %request_id,
        count = response.recommendations.len(),
        "Recommendations served"
    );

    Ok(Json(response))
}

/// Popular movies, optionally restricted to a genre
pub async fn popular(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<PopularQuery>,
) -> AppResult<Json<PopularMoviesResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %params.user_id,
        genre = params.genre_name.as_deref().unwrap_or("general"),
        "Processing popular movies request"
    );

    let response = state
        .engine
        .popular(params.user_id, params.genre_name.as_deref())
        .await?;

    Ok(Json(response))
}

/// Best average-rated movies of a genre
pub async fn top_movies_by_genre(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<GenreQuery>,
) -> AppResult<Json<TopMoviesByGenreResponse>> {
    tracing::info!(
        request_id = %request_id,
        genre = %params.genre_name,
        "Processing top movies by genre request"
    );

    let response = state.engine.top_movies_by_genre(&params.genre_name).await?;
    Ok(Json(response))
}

/// What to watch after an already watched sequence
pub async fn up_next(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<UpNextQuery>,
) -> AppResult<Json<UpNextMoviesResponse>> {
    let movies = params.movie_ids();
    tracing::info!(
        request_id = %request_id,
        user_id = %params.user_id,
        consumed = movies.len(),
        "Processing up next request"
    );

    let response = state.engine.up_next(params.user_id, movies).await?;
    Ok(Json(response))
}
