use std::collections::BTreeMap;

use super::ranking::{rank_top_n, rating_stats, ScoredMovie};
use crate::{error::AppResult, models::MovieId, store::RatingStore};

/// Ranks the movies of `genre` by average rating
///
/// Movies with fewer than `min_ratings` ratings are ignored so a single
/// enthusiastic rating cannot top the list.
pub fn top_rated_movies(
    store: &dyn RatingStore,
    genre: &str,
    min_ratings: u32,
    limit: usize,
) -> AppResult<Vec<ScoredMovie>> {
    let stats = rating_stats(store.ratings_for_genre(genre)?);
    Ok(rank_top_n(
        stats
            .into_iter()
            .filter(|(_, stats)| stats.count >= min_ratings.max(1))
            .map(|(movie_id, stats)| ScoredMovie::new(movie_id, stats.mean())),
        limit,
    ))
}

/// Top rated movies of `genre` as `movie_id -> title`
pub fn top_rated_titles(
    store: &dyn RatingStore,
    genre: &str,
    min_ratings: u32,
    limit: usize,
) -> AppResult<BTreeMap<MovieId, String>> {
    let ranked = top_rated_movies(store, genre, min_ratings, limit)?;
    Ok(ranked
        .into_iter()
        .filter_map(|scored| {
            store
                .movie(&scored.movie_id)
                .map(|movie| (scored.movie_id, movie.title.clone()))
        })
        .collect())
}
