use std::collections::HashMap;
use std::ops::Range;

use super::RatingStore;
use crate::{
    error::{AppError, AppResult},
    models::{normalize_genre, Movie, MovieId, Rating, UserId},
};

/// Indexed in-memory rating snapshot
///
/// Built once per serving session; ratings are grouped by user and ordered by
/// timestamp so per-user timelines are plain slices.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    movies: Vec<Movie>,
    ratings: Vec<Rating>,
    movie_index: HashMap<MovieId, usize>,
    user_index: HashMap<UserId, Range<usize>>,
    ratings_by_movie: HashMap<MovieId, Vec<usize>>,
    /// normalized genre -> indexes into `movies`
    genre_index: HashMap<String, Vec<usize>>,
}

impl InMemoryRatingStore {
    pub fn new(mut movies: Vec<Movie>, mut ratings: Vec<Rating>) -> Self {
        movies.sort_by(|a, b| a.id.cmp(&b.id));
        movies.dedup_by(|a, b| a.id == b.id);

        ratings.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.movie_id.cmp(&b.movie_id))
        });

        let movie_index: HashMap<MovieId, usize> = movies
            .iter()
            .enumerate()
            .map(|(idx, movie)| (movie.id.clone(), idx))
            .collect();

        let mut genre_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, movie) in movies.iter().enumerate() {
            for genre in &movie.genres {
                let entry = genre_index.entry(normalize_genre(genre)).or_default();
                if entry.last() != Some(&idx) {
                    entry.push(idx);
                }
            }
        }
        genre_index.retain(|genre, _| !genre.is_empty());

        let mut user_index: HashMap<UserId, Range<usize>> = HashMap::new();
        let mut ratings_by_movie: HashMap<MovieId, Vec<usize>> = HashMap::new();
        let mut start = 0;
        for (idx, rating) in ratings.iter().enumerate() {
            ratings_by_movie
                .entry(rating.movie_id.clone())
                .or_default()
                .push(idx);

            let is_last = ratings
                .get(idx + 1)
                .map_or(true, |next| next.user_id != rating.user_id);
            if is_last {
                user_index.insert(rating.user_id.clone(), start..idx + 1);
                start = idx + 1;
            }
        }

        tracing::debug!(
            movies = movies.len(),
            ratings = ratings.len(),
            users = user_index.len(),
            genres = genre_index.len(),
            "Built rating snapshot"
        );

        Self {
            movies,
            ratings,
            movie_index,
            user_index,
            ratings_by_movie,
            genre_index,
        }
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn ratings_for_user(&self, user_id: &UserId) -> &[Rating] {
        self.user_index
            .get(user_id)
            .map(|range| &self.ratings[range.clone()])
            .unwrap_or(&[])
    }

    fn ratings_for_genre(&self, genre: &str) -> AppResult<Vec<&Rating>> {
        let movies = self.movies_in_genre(genre)?;
        Ok(movies
            .into_iter()
            .flat_map(|movie| self.ratings_for_movie(&movie.id))
            .collect())
    }

    fn ratings_for_movie(&self, movie_id: &MovieId) -> Vec<&Rating> {
        self.ratings_by_movie
            .get(movie_id)
            .map(|idxs| idxs.iter().map(|&idx| &self.ratings[idx]).collect())
            .unwrap_or_default()
    }

    fn all_ratings(&self) -> &[Rating] {
        &self.ratings
    }

    fn movies(&self) -> &[Movie] {
        &self.movies
    }

    fn movie(&self, movie_id: &MovieId) -> Option<&Movie> {
        self.movie_index
            .get(movie_id)
            .map(|&idx| &self.movies[idx])
    }

    fn movies_in_genre(&self, genre: &str) -> AppResult<Vec<&Movie>> {
        let key = normalize_genre(genre);
        match self.genre_index.get(&key) {
            Some(idxs) if !idxs.is_empty() => {
                Ok(idxs.iter().map(|&idx| &self.movies[idx]).collect())
            }
            _ => Err(AppError::UnknownGenre(genre.trim().to_string())),
        }
    }
}
