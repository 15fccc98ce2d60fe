use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod movie;
pub mod rating;
pub mod responses;

pub use movie::Movie;
pub use rating::{Rating, MAX_SCORE, MIN_SCORE};
pub use responses::{
    HealthResponse, PopularMoviesResponse, RecommendationResponse, TopMoviesByGenreResponse,
    UpNextMoviesResponse,
};

/// Opaque user identifier (anonymized by the ETL job)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque movie identifier
///
/// Ordering is lexicographic and is the tie-break order of every ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(UserId);
string_id!(MovieId);

/// Canonical form of a genre name used for matching and cache keys
pub fn normalize_genre(genre: &str) -> String {
    genre.trim().to_lowercase()
}
