use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// `POST /api/admin/login` is the only admin endpoint reachable without a token.
pub fn login_routes() -> Router<AppState> {
    Router::new().route("/api/admin/login", post(handlers::admin_login))
}

/// Catalog management and uploads.
///
/// Access Control:
/// Every route here must be wrapped by the admin gate middleware (see `create_router`),
/// which resolves an `AdminUser` from the bearer token before the handler runs.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/admin/planes
        .route(
            "/api/admin/planes",
            get(handlers::list_admin_plans).post(handlers::create_plan),
        )
        // PUT/DELETE /api/admin/planes/{id}
        .route(
            "/api/admin/planes/{id}",
            put(handlers::update_plan).delete(handlers::delete_plan),
        )
        // POST /api/upload (multipart, field `file`)
        .route("/api/upload", post(handlers::upload_file))
}
