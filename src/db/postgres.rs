use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    error::AppResult,
    models::{Movie, Rating},
    store::InMemoryRatingStore,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct MovieRow {
    movie_id: String,
    title: String,
    genres: String,
}

#[derive(Debug, FromRow)]
struct RatingRow {
    user_id: String,
    movie_id: String,
    rating: i32,
    timestamp: i64,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie::new(row.movie_id, row.title, Movie::parse_genres(&row.genres))
    }
}

impl RatingRow {
    fn into_rating(self) -> AppResult<Rating> {
        let score = u8::try_from(self.rating).unwrap_or(0);
        Rating::from_unix(self.user_id, self.movie_id, score, self.timestamp)
    }
}

/// Loads the rating snapshot produced by the ETL job
///
/// Reads the `movies` and `ratings` tables once; rows with an out-of-range
/// score or timestamp are skipped and counted.
pub async fn load_snapshot(pool: &PgPool) -> AppResult<InMemoryRatingStore> {
    let movies: Vec<Movie> = sqlx::query_as::<_, MovieRow>(
        r#"
        SELECT movie_id, title, genres
        FROM movies
        "#,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Movie::from)
    .collect();

    let rows = sqlx::query_as::<_, RatingRow>(
        r#"
        SELECT user_id, movie_id, rating, timestamp
        FROM ratings
        "#,
    )
    .fetch_all(pool)
    .await?;

    let total = rows.len();
    let mut ratings = Vec::with_capacity(total);
    for row in rows {
        match row.into_rating() {
            Ok(rating) => ratings.push(rating),
            Err(e) => tracing::debug!(error = %e, "Skipping invalid rating row"),
        }
    }

    let skipped = total - ratings.len();
    if skipped > 0 {
        tracing::warn!(skipped, total, "Skipped invalid rating rows");
    }

    tracing::info!(
        movies = movies.len(),
        ratings = ratings.len(),
        "Loaded rating snapshot from database"
    );

    Ok(InMemoryRatingStore::new(movies, ratings))
}
