use crate::{AppState, handlers};
use axum::{
    Router,
    http::{HeaderValue, header},
    routing::get,
};
use tower_http::set_header::SetResponseHeaderLayer;

/// Public Router Module
///
/// Unauthenticated, read-only catalog endpoints. Handlers only ever ask the repository
/// for active plans, so inactive ones cannot leak through here.
///
/// Every response is marked `Cache-Control: no-store`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/planes
        .route("/api/planes", get(handlers::list_public_plans))
        // GET /api/planes/{id}
        .route("/api/planes/{id}", get(handlers::get_public_plan))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
}
