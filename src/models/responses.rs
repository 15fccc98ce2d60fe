use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MovieId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<MovieId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopularMoviesResponse {
    pub user_id: UserId,
    pub popular_movies: Vec<MovieId>,
}

/// Top rated movies of a genre as `movie_id -> title`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopMoviesByGenreResponse {
    pub top_movies_by_genre: BTreeMap<MovieId, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpNextMoviesResponse {
    pub user_id: UserId,
    pub up_next_movies: Vec<MovieId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
