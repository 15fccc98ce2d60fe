use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MovieId, UserId};
use crate::error::{AppError, AppResult};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// A single (user, movie, score, timestamp) fact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: u8,
    pub timestamp: DateTime<Utc>,
}

impl Rating {
    pub fn new(
        user_id: impl Into<UserId>,
        movie_id: impl Into<MovieId>,
        score: u8,
        timestamp: DateTime<Utc>,
    ) -> AppResult<Self> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(AppError::InvalidInput(format!(
                "rating score {} outside {}..={}",
                score, MIN_SCORE, MAX_SCORE
            )));
        }

        Ok(Self {
            user_id: user_id.into(),
            movie_id: movie_id.into(),
            score,
            timestamp,
        })
    }

    /// Builds a rating from a unix timestamp in seconds
    pub fn from_unix(
        user_id: impl Into<UserId>,
        movie_id: impl Into<MovieId>,
        score: u8,
        unix_secs: i64,
    ) -> AppResult<Self> {
        let timestamp = DateTime::from_timestamp(unix_secs, 0).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid rating timestamp {}", unix_secs))
        })?;
        Self::new(user_id, movie_id, score, timestamp)
    }
}
