use std::collections::{BTreeSet, HashMap, HashSet};

use super::ranking::{rank_top_n, rating_stats, ScoredMovie};
use crate::{
    models::{normalize_genre, MovieId, UserId, MAX_SCORE},
    store::RatingStore,
};

/// How many positions after a consumed movie count as a follow-up
const TRANSITION_WINDOW: usize = 3;
/// Weight of the normalized average rating
const QUALITY_WEIGHT: f64 = 0.5;

/// Ranks what to watch after the `consumed` sequence
///
/// A candidate scores the sum of
/// - genre affinity: recency-weighted genre profile of the consumed movies
///   (the k-th of n weighs `(k + 1) / n`), summed over the candidate's genres
///   and divided by the square root of its genre count,
/// - follow-up strength: `1 / d` for every user timeline in which the
///   candidate was rated `d <= 3` positions after a consumed movie,
/// - quality: `0.5 * mean / MAX_SCORE`.
///
/// Consumed movies are never returned, known to the catalog or not.
pub fn up_next_movies(
    store: &dyn RatingStore,
    consumed: &[MovieId],
    limit: usize,
) -> Vec<ScoredMovie> {
    let consumed_set: HashSet<&MovieId> = consumed.iter().collect();
    let profile = genre_profile(store, consumed);
    let transitions = follow_ups(store, &consumed_set);
    let stats = rating_stats(store.all_ratings());

    let scored = store
        .movies()
        .iter()
        .filter(|movie| !consumed_set.contains(&movie.id))
        .map(|movie| {
            let affinity = if movie.genres.is_empty() {
                0.0
            } else {
                let overlap: f64 = movie
                    .genres
                    .iter()
                    .filter_map(|g| profile.get(&normalize_genre(g)))
                    .sum();
                overlap / (movie.genres.len() as f64).sqrt()
            };
            let transition = transitions.get(&movie.id).copied().unwrap_or(0.0);
            let quality = stats
                .get(&movie.id)
                .map(|s| QUALITY_WEIGHT * s.mean() / f64::from(MAX_SCORE))
                .unwrap_or(0.0);
            ScoredMovie::new(movie.id.clone(), affinity + transition + quality)
        })
        .filter(|scored| scored.score > 0.0);

    rank_top_n(scored, limit)
}

fn genre_profile(store: &dyn RatingStore, consumed: &[MovieId]) -> HashMap<String, f64> {
    let n = consumed.len() as f64;
    let mut profile: HashMap<String, f64> = HashMap::new();
    for (position, movie_id) in consumed.iter().enumerate() {
        let Some(movie) = store.movie(movie_id) else {
            continue;
        };
        let weight = (position + 1) as f64 / n;
        for genre in &movie.genres {
            *profile.entry(normalize_genre(genre)).or_default() += weight;
        }
    }
    profile
}

fn follow_ups<'a>(
    store: &'a dyn RatingStore,
    consumed: &HashSet<&MovieId>,
) -> HashMap<&'a MovieId, f64> {
    // Ordered so floating point sums are accumulated identically on every call
    let viewers: BTreeSet<&UserId> = consumed
        .iter()
        .flat_map(|movie_id| store.ratings_for_movie(movie_id))
        .map(|r| &r.user_id)
        .collect();

    let mut transitions: HashMap<&'a MovieId, f64> = HashMap::new();
    for viewer in viewers {
        let timeline = store.ratings_for_user(viewer);
        for (position, rating) in timeline.iter().enumerate() {
            if !consumed.contains(&rating.movie_id) {
                continue;
            }
            for distance in 1..=TRANSITION_WINDOW {
                let Some(next) = timeline.get(position + distance) else {
                    break;
                };
                if !consumed.contains(&next.movie_id) {
                    *transitions.entry(&next.movie_id).or_default() += 1.0 / distance as f64;
                }
            }
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, Rating};
    use crate::store::InMemoryRatingStore;

    fn ids(ranked: &[ScoredMovie]) -> Vec<&str> {
        ranked.iter().map(|c| c.movie_id.as_str()).collect()
    }

    fn movie(id: &str, genres: &[&str]) -> Movie {
        Movie::new(
            id,
            format!("Movie {}", id),
            genres.iter().map(|g| g.to_string()).collect(),
        )
    }

    fn store() -> InMemoryRatingStore {
        let movies = vec![
            movie("movie1", &["Action"]),
            movie("movie2", &["Action", "Sci-Fi"]),
            movie("movie3", &["Sci-Fi"]),
            movie("movie4", &["Romance"]),
            movie("movie5", &["Action"]),
            movie("movie6", &["Documentary"]),
        ];
        let rating = |user: &str, movie: &str, score: u8, at: i64| {
            Rating::from_unix(user, movie, score, at).unwrap()
        };
        let ratings = vec![
            // u1 watches movie1 -> movie2 -> movie4
            rating("u1", "movie1", 4, 10),
            rating("u1", "movie2", 5, 20),
            rating("u1", "movie4", 3, 30),
            // u2 watches movie2 -> movie4
            rating("u2", "movie2", 4, 10),
            rating("u2", "movie4", 4, 20),
            rating("u3", "movie5", 5, 10),
            rating("u3", "movie6", 5, 20),
        ];
        InMemoryRatingStore::new(movies, ratings)
    }

    #[test]
    fn test_never_returns_consumed_movies() {
        let store = store();
        let consumed = vec![MovieId::from("movie1"), MovieId::from("movie2")];
        let ranked = up_next_movies(&store, &consumed, 10);
        assert!(!ranked.is_empty());
        assert!(ranked
            .iter()
            .all(|c| c.movie_id.as_str() != "movie1" && c.movie_id.as_str() != "movie2"));
    }

    #[test]
    fn test_follow_ups_and_genres_rank_first() {
        let store = store();
        let consumed = vec![MovieId::from("movie1"), MovieId::from("movie2")];
        let ranked = up_next_movies(&store, &consumed, 10);
        // movie4 follows the sequence in two timelines, movie3/movie5 share genres
        assert_eq!(ids(&ranked)[0], "movie4");
        assert!(ids(&ranked).contains(&"movie3"));
        assert!(ids(&ranked).contains(&"movie5"));
        // movie6 is unrelated but well rated, so it trails
        assert_eq!(ids(&ranked).last(), Some(&"movie6"));
    }

    #[test]
    fn test_recent_genres_weigh_more() {
        let movies = vec![
            movie("a", &["Action"]),
            movie("b", &["Comedy"]),
            movie("x", &["Action"]),
            movie("y", &["Comedy"]),
        ];
        let store = InMemoryRatingStore::new(movies, Vec::new());

        let ranked = up_next_movies(&store, &[MovieId::from("a"), MovieId::from("b")], 10);
        assert_eq!(ids(&ranked), vec!["y", "x"]);

        let ranked = up_next_movies(&store, &[MovieId::from("b"), MovieId::from("a")], 10);
        assert_eq!(ids(&ranked), vec!["x", "y"]);
    }

    #[test]
    fn test_unknown_sequence_falls_back_to_quality() {
        let store = store();
        let consumed = vec![MovieId::from("not-in-catalog")];
        let ranked = up_next_movies(&store, &consumed, 2);
        // movie5 and movie6 both average 5.0; ties break by id
        assert_eq!(ids(&ranked), vec!["movie5", "movie6"]);
    }

    #[test]
    fn test_limit_and_determinism() {
        let store = store();
        let consumed = vec![MovieId::from("movie1")];
        let first = up_next_movies(&store, &consumed, 3);
        assert_eq!(first.len(), 3);
        for _ in 0..5 {
            assert_eq!(up_next_movies(&store, &consumed, 3), first);
        }
    }
}
