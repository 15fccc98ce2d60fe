//! Ranking algorithms over a [`RatingStore`](crate::store::RatingStore).
//!
//! Every algorithm is a pure function of the store and its parameters, and
//! every result is ordered by [`ranking::compare`], so identical queries over
//! the same snapshot produce identical output.

pub mod personalized;
pub mod popularity;
pub mod ranking;
pub mod top_rated;
pub mod up_next;

pub use personalized::{ItemCosineRecommender, Recommender};
pub use popularity::{popular_movies, popular_movies_by_genre};
pub use ranking::{movie_ids, rank_top_n, ScoredMovie};
pub use top_rated::{top_rated_movies, top_rated_titles};
pub use up_next::up_next_movies;
