use super::ranking::{rank_top_n, rating_stats, ScoredMovie};
use crate::{error::AppResult, store::RatingStore};

/// Ranks every rated catalog movie by rating count × average score
///
/// Ratings of movies missing from the catalog are ignored.
pub fn popular_movies(store: &dyn RatingStore, limit: usize) -> Vec<ScoredMovie> {
    let stats = rating_stats(store.all_ratings());
    rank_top_n(
        stats
            .into_iter()
            .filter(|(movie_id, _)| store.movie(movie_id).is_some())
            .map(|(movie_id, stats)| ScoredMovie::new(movie_id, stats.popularity())),
        limit,
    )
}

/// Same metric restricted to movies tagged with `genre`
///
/// Fails with `UnknownGenre` if no movie carries the tag.
pub fn popular_movies_by_genre(
    store: &dyn RatingStore,
    genre: &str,
    limit: usize,
) -> AppResult<Vec<ScoredMovie>> {
    let stats = rating_stats(store.ratings_for_genre(genre)?);
    Ok(rank_top_n(
        stats
            .into_iter()
            .map(|(movie_id, stats)| ScoredMovie::new(movie_id, stats.popularity())),
        limit,
    ))
}
