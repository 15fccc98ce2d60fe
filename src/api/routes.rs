use axum::{http::Method, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", v1_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
        .with_state(state)
}

/// Ranking routes under /v1
fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/recommend/:user_id", get(handlers::recommend))
        .route("/popular", get(handlers::popular))
        .route("/top_movies_by_genre", get(handlers::top_movies_by_genre))
        .route("/upnext", get(handlers::up_next))
}
