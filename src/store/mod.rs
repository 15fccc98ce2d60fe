//! Read-only access to the (user, movie, rating, genre) facts.
//!
//! Every ranking algorithm reads through [`RatingStore`], so algorithms can be
//! exercised against fixture data without a live database.

use crate::{
    error::AppResult,
    models::{Movie, MovieId, Rating, UserId},
};

pub mod memory;

pub use memory::InMemoryRatingStore;

/// Accessor over an immutable rating snapshot
pub trait RatingStore: Send + Sync {
    /// Ratings of one user ordered by timestamp, then movie id
    fn ratings_for_user(&self, user_id: &UserId) -> &[Rating];

    /// Ratings of every movie tagged with `genre`
    ///
    /// Fails with `UnknownGenre` when no movie carries the tag; an existing but
    /// unrated genre yields an empty vector.
    fn ratings_for_genre(&self, genre: &str) -> AppResult<Vec<&Rating>>;

    /// Ratings of one movie
    fn ratings_for_movie(&self, movie_id: &MovieId) -> Vec<&Rating>;

    fn all_ratings(&self) -> &[Rating];

    /// Every movie, ordered by id
    fn movies(&self) -> &[Movie];

    fn movie(&self, movie_id: &MovieId) -> Option<&Movie>;

    /// Movies tagged with `genre`, ordered by id; `UnknownGenre` when there are none
    fn movies_in_genre(&self, genre: &str) -> AppResult<Vec<&Movie>>;

    fn has_genre(&self, genre: &str) -> bool {
        self.movies_in_genre(genre).is_ok()
    }

    /// A user exists iff it has at least one rating
    fn user_exists(&self, user_id: &UserId) -> bool {
        !self.ratings_for_user(user_id).is_empty()
    }
}
