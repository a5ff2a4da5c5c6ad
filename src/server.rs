//! HTTP server and routes.

pub(crate) mod handlers;
mod state;

pub use state::AppState;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let opds_routes = Router::new()
        .route("/", get(handlers::opds_root))
        .route("/books", get(handlers::opds_books))
        .route("/book/{id}", get(handlers::opds_book))
        .route("/authors", get(handlers::opds_authors))
        .route("/series", get(handlers::opds_series))
        .route("/tags", get(handlers::opds_tags))
        .route("/cover/{id}", get(handlers::opds_cover));

    let api_routes = Router::new()
        .route("/books", get(handlers::api_books))
        .route("/book/{id}", get(handlers::api_book))
        .route("/stats", get(handlers::api_stats))
        .route("/health", get(handlers::api_health));

    Router::new()
        .nest("/opds", opds_routes)
        .route("/download/{id}/{format}", get(handlers::download_book))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
