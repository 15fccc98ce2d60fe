use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{MovieId, Rating};

/// A candidate movie with its ranking score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMovie {
    pub movie_id: MovieId,
    pub score: f64,
}

impl ScoredMovie {
    pub fn new(movie_id: MovieId, score: f64) -> Self {
        Self { movie_id, score }
    }
}

/// Total order of every ranking: score descending, movie id ascending
pub fn compare(a: &ScoredMovie, b: &ScoredMovie) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

/// Sorts candidates into ranking order and keeps the first `limit`
///
/// Non-finite scores are dropped so one bad value cannot poison the order.
pub fn rank_top_n(
    candidates: impl IntoIterator<Item = ScoredMovie>,
    limit: usize,
) -> Vec<ScoredMovie> {
    let mut ranked: Vec<ScoredMovie> = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .collect();
    ranked.sort_by(compare);
    ranked.truncate(limit);
    ranked
}

pub fn movie_ids(ranked: Vec<ScoredMovie>) -> Vec<MovieId> {
    ranked.into_iter().map(|c| c.movie_id).collect()
}

/// Count and score sum of a movie's ratings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingStats {
    pub count: u32,
    pub total: u32,
}

impl RatingStats {
    pub fn add(&mut self, score: u8) {
        self.count += 1;
        self.total += u32::from(score);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            f64::from(self.total) / f64::from(self.count)
        }
    }

    /// Rating count × average score
    pub fn popularity(&self) -> f64 {
        f64::from(self.count) * self.mean()
    }
}

/// Aggregates per-movie statistics
pub fn rating_stats<'a>(
    ratings: impl IntoIterator<Item = &'a Rating>,
) -> HashMap<MovieId, RatingStats> {
    let mut stats: HashMap<MovieId, RatingStats> = HashMap::new();
    for rating in ratings {
        stats
            .entry(rating.movie_id.clone())
            .or_default()
            .add(rating.score);
    }
    stats
}
