use std::collections::{BTreeSet, HashMap, HashSet};

use super::ranking::{rank_top_n, ScoredMovie};
use crate::{
    models::{MovieId, UserId},
    store::RatingStore,
};

/// Strategy producing personalized recommendations
///
/// Implementations must be deterministic for a given rating snapshot and must
/// never return a movie the user has already rated.
pub trait Recommender: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ranks unseen movies for `user_id`; a user without history gets an empty list
    fn recommend(
        &self,
        store: &dyn RatingStore,
        user_id: &UserId,
        limit: usize,
    ) -> Vec<ScoredMovie>;
}

/// Item-item collaborative filtering with cosine similarity
///
/// Each movie is a vector of the scores users gave it. A candidate `c` the
/// user has not rated scores `sum(sim(i, c) * r(u, i))` over the user's rated
/// movies `i`. Candidates are limited to movies rated by users who share at
/// least one rated movie with the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemCosineRecommender;

struct ItemVector<'a> {
    scores: HashMap<&'a UserId, f64>,
    norm: f64,
}

impl<'a> ItemVector<'a> {
    fn load(store: &'a dyn RatingStore, movie_id: &MovieId) -> Self {
        let scores: HashMap<&'a UserId, f64> = store
            .ratings_for_movie(movie_id)
            .into_iter()
            .map(|r| (&r.user_id, f64::from(r.score)))
            .collect();
        let norm = scores.values().map(|s| s * s).sum::<f64>().sqrt();
        Self { scores, norm }
    }

    fn cosine(&self, other: &ItemVector<'_>) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.scores.len() <= other.scores.len() {
            (&self.scores, &other.scores)
        } else {
            (&other.scores, &self.scores)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(user, score)| large.get(*user).map(|other| score * other))
            .sum();
        dot / (self.norm * other.norm)
    }
}

impl Recommender for ItemCosineRecommender {
    fn name(&self) -> &'static str {
        "item_cosine"
    }

    fn recommend(
        &self,
        store: &dyn RatingStore,
        user_id: &UserId,
        limit: usize,
    ) -> Vec<ScoredMovie> {
        let history = store.ratings_for_user(user_id);
        if history.is_empty() {
            return Vec::new();
        }

        let seen: HashSet<&MovieId> = history.iter().map(|r| &r.movie_id).collect();

        let neighbours: BTreeSet<&UserId> = history
            .iter()
            .flat_map(|r| store.ratings_for_movie(&r.movie_id))
            .map(|r| &r.user_id)
            .filter(|other| *other != user_id)
            .collect();

        let candidates: BTreeSet<&MovieId> = neighbours
            .iter()
            .flat_map(|neighbour| store.ratings_for_user(neighbour))
            .map(|r| &r.movie_id)
            .filter(|movie_id| !seen.contains(movie_id) && store.movie(movie_id).is_some())
            .collect();

        if candidates.is_empty() {
            return Vec::new();
        }

        let rated: Vec<(ItemVector<'_>, f64)> = history
            .iter()
            .map(|r| (ItemVector::load(store, &r.movie_id), f64::from(r.score)))
            .collect();

        let scored = candidates.into_iter().filter_map(|candidate| {
            let vector = ItemVector::load(store, candidate);
            let score: f64 = rated
                .iter()
                .map(|(item, user_score)| item.cosine(&vector) * user_score)
                .sum();
            (score > 0.0).then(|| ScoredMovie::new(candidate.clone(), score))
        });

        rank_top_n(scored, limit)
    }
}
