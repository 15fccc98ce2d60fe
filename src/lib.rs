//! Movie recommendation service: ranking algorithms over a rating snapshot,
//! served through a read-through cache with single-flight computation.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use error::{AppError, AppResult};
