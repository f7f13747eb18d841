use crate::{
    AppState, auth,
    errors::{AppError, ErrorResponse},
    models::{
        DeleteResponse, HealthResponse, LoginRequest, LoginResponse, Plan, PlanDraft,
        UploadResponse, new_plan_id,
    },
    normalize::{self, coerce_text},
};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State, multipart::MultipartRejection},
    http::StatusCode,
};
use serde_json::{Map, Value};

// --- Extractors ---

/// JsonPayload
///
/// Request body as untyped JSON. An empty body reads as `{}`; anything that is not JSON
/// is rejected with a `{message}` 400 instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct JsonPayload(pub Value);

impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonPayload(Value::Object(Map::new())));
        }

        serde_json::from_slice(&bytes)
            .map(JsonPayload)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
    }
}

// --- Public Handlers ---

/// health
///
/// Liveness probe for load balancers and uptime checks.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// list_public_plans
///
/// [Public Route] Active plans only, newest first.
#[utoipa::path(
    get,
    path = "/api/planes",
    responses(
        (status = 200, description = "Active plans", body = [Plan]),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn list_public_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(state.repo.list_active_plans().await?))
}

/// get_public_plan
///
/// [Public Route] One active plan. Inactive plans are reported as missing.
#[utoipa::path(
    get,
    path = "/api/planes/{id}",
    params(("id" = String, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Found", body = Plan),
        (status = 404, description = "Unknown or inactive plan", body = ErrorResponse)
    )
)]
pub async fn get_public_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, AppError> {
    state
        .repo
        .get_plan(&id, true)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
}

// --- Admin Handlers ---

/// admin_login
///
/// [Admin Route, unauthenticated] Exchanges the admin credentials for an 8-hour token.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Credentials or secret not configured", body = ErrorResponse)
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    JsonPayload(body): JsonPayload,
) -> Result<Json<LoginResponse>, AppError> {
    let field = |key: &str| body.get(key).map(coerce_text).unwrap_or_default();
    let token = auth::login(&state.config, &field("user"), &field("pass"))?;

    tracing::info!(user = %field("user").trim(), "admin logged in");
    Ok(Json(LoginResponse { ok: true, token }))
}

/// list_admin_plans
///
/// [Admin Route] Every plan, active or not.
#[utoipa::path(
    get,
    path = "/api/admin/planes",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All plans", body = [Plan]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_admin_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(state.repo.list_plans().await?))
}

/// create_plan
///
/// [Admin Route] Normalizes the body and stores it under a freshly generated id.
#[utoipa::path(
    post,
    path = "/api/admin/planes",
    security(("bearer" = [])),
    request_body = PlanDraft,
    responses(
        (status = 201, description = "Created", body = Plan),
        (status = 400, description = "Missing nombre", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn create_plan(
    State(state): State<AppState>,
    JsonPayload(body): JsonPayload,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    let draft = normalize::normalize_new(&body)?;
    let plan = state.repo.insert_plan(&new_plan_id(), &draft).await?;

    tracing::info!(plan_id = %plan.id, "plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

/// update_plan
///
/// [Admin Route] Partial update: fields missing from the body keep their stored value.
#[utoipa::path(
    put,
    path = "/api/admin/planes/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Plan id")),
    request_body = PlanDraft,
    responses(
        (status = 200, description = "Updated", body = Plan),
        (status = 400, description = "nombre left empty", body = ErrorResponse),
        (status = 404, description = "Unknown plan", body = ErrorResponse)
    )
)]
pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonPayload(body): JsonPayload,
) -> Result<Json<Plan>, AppError> {
    let not_found = || AppError::NotFound("Plan not found".to_string());

    let current = state.repo.get_plan(&id, false).await?.ok_or_else(not_found)?;
    let draft = normalize::normalize_update(&body, &current)?;
    // The plan may have been deleted between the read and the write.
    let plan = state.repo.update_plan(&id, &draft).await?.ok_or_else(not_found)?;

    tracing::info!(plan_id = %plan.id, "plan updated");
    Ok(Json(plan))
}

/// delete_plan
///
/// [Admin Route] Removes a plan and echoes it back.
#[utoipa::path(
    delete,
    path = "/api/admin/planes/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 404, description = "Unknown plan", body = ErrorResponse)
    )
)]
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let removed = state
        .repo
        .delete_plan(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;

    tracing::info!(plan_id = %removed.id, "plan deleted");
    Ok(Json(DeleteResponse { ok: true, removed }))
}

/// upload_file
///
/// [Admin Route] Accepts a multipart form with a `file` field and stores it in the
/// uploads directory. The returned `url` is servable as-is under `/uploads`.
#[utoipa::path(
    post,
    path = "/api/upload",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "No file field", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let filename = state.storage.save_upload(&original_name, bytes).await?;
        return Ok(Json(UploadResponse {
            ok: true,
            url: format!("/uploads/{filename}"),
            filename,
        }));
    }

    Err(AppError::Validation("Field 'file' is required".to_string()))
}
