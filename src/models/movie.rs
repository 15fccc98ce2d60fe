use serde::{Deserialize, Serialize};

use super::{normalize_genre, MovieId};

/// A movie in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre tags in their stored order
    pub genres: Vec<String>,
}

impl Movie {
    pub fn new(id: impl Into<MovieId>, title: impl Into<String>, genres: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genres,
        }
    }

    /// Parses the MovieLens `Action|Adventure|Sci-Fi` genre column
    pub fn parse_genres(raw: &str) -> Vec<String> {
        raw.split('|')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Case-insensitive genre membership; `genre` must already be normalized
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| normalize_genre(g) == genre)
    }
}
