use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue, Method, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod file_repository;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod storage;

// Routing segregated by access level (public, admin).
pub mod routes;
use auth::{ADMIN_TOKEN_HEADER, AdminUser};
use config::CorsConfig;
use errors::ErrorResponse;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use file_repository::FileRepository;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageState};

/// Upper bound for request bodies, uploads included.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` wire types. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::list_public_plans, handlers::get_public_plan,
        handlers::admin_login, handlers::list_admin_plans, handlers::create_plan,
        handlers::update_plan, handlers::delete_plan, handlers::upload_file
    ),
    components(
        schemas(
            models::Plan, models::PlanDraft, models::Foto, models::LoginRequest,
            models::LoginResponse, models::DeleteResponse, models::UploadResponse,
            models::HealthResponse, errors::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "planes-catalog", description = "Funeral plan catalog API")
    )
)]
struct ApiDoc;

/// Registers the bearer scheme referenced by the admin paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single, immutable container shared by every request: the persistence adapter,
/// the upload storage and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: flat-file or Postgres, chosen at startup.
    pub repo: RepositoryState,
    /// Storage Layer: where uploads are written.
    pub storage: StorageState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// admin_gate
///
/// Middleware guarding the protected admin routes. Extracting `AdminUser` verifies the
/// token; a failed extraction rejects the request before the handler runs.
async fn admin_gate(admin: AdminUser, request: Request, next: Next) -> Response {
    tracing::debug!(admin = %admin.username, "admin request authorized");
    next.run(request).await
}

/// Fallback for unmatched routes, keeping the `{message}` error shape.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "Not found".to_string(),
        }),
    )
}

/// cors_layer
///
/// Origins outside the allow-list simply get no CORS headers; the request itself is
/// still served.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_list = cors.clone();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| allow_list.allows(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
        ])
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(handlers::health))
        .merge(public::public_routes())
        .merge(admin::login_routes())
        .merge(
            admin::protected_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate)),
        )
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, correlated through the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
