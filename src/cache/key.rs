use std::fmt::{Display, Write};

use crate::models::{normalize_genre, MovieId, UserId};

/// Canonical fingerprint of a cacheable query
///
/// Every parameter that shapes the result is part of the key, including the
/// result length and the top-rated threshold, so replicas with different
/// settings never share entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommend {
        user_id: UserId,
        limit: usize,
    },
    /// Global popularity when `genre` is `None`
    Popular {
        genre: Option<String>,
        limit: usize,
    },
    TopRated {
        genre: String,
        min_ratings: u32,
        limit: usize,
    },
    UpNext {
        movies: Vec<MovieId>,
        limit: usize,
    },
}

impl CacheKey {
    pub fn recommend(user_id: &UserId, limit: usize) -> Self {
        CacheKey::Recommend {
            user_id: user_id.clone(),
            limit,
        }
    }

    /// Popularity key; a blank genre means global popularity
    pub fn popular(genre: Option<&str>, limit: usize) -> Self {
        let genre = genre.map(normalize_genre).filter(|g| !g.is_empty());
        CacheKey::Popular { genre, limit }
    }

    pub fn top_rated(genre: &str, min_ratings: u32, limit: usize) -> Self {
        CacheKey::TopRated {
            genre: normalize_genre(genre),
            min_ratings,
            limit,
        }
    }

    pub fn up_next(movies: &[MovieId], limit: usize) -> Self {
        CacheKey::UpNext {
            movies: movies.to_vec(),
            limit,
        }
    }
}

/// Percent-encodes the key separators so distinct parameters never collide
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' | ',' | ':' => {
                let _ = write!(escaped, "%{:02X}", c as u32);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommend { user_id, limit } => {
                write!(f, "recommend:{}:n{}", escape(user_id.as_str()), limit)
            }
            CacheKey::Popular { genre: None, limit } => write!(f, "popular:n{}", limit),
            CacheKey::Popular {
                genre: Some(genre),
                limit,
            } => write!(f, "popular:{}:n{}", escape(&normalize_genre(genre)), limit),
            CacheKey::TopRated {
                genre,
                min_ratings,
                limit,
            } => write!(
                f,
                "top_rated:{}:min{}:n{}",
                escape(&normalize_genre(genre)),
                min_ratings,
                limit
            ),
            CacheKey::UpNext { movies, limit } => {
                let ids: Vec<String> = movies.iter().map(|id| escape(id.as_str())).collect();
                write!(f, "upnext:n{}:{}", limit, ids.join(","))
            }
        }
    }
}
