use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use planes_catalog::{
    AppConfig, AppState, FileRepository, MockStorageService, auth, create_router,
    models::UploadResponse, repository::RepositoryState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "X-PLANES-BOUNDARY";

fn app(mock_storage: MockStorageService) -> Router {
    let config = AppConfig::default();
    let repo = Arc::new(FileRepository::new(
        std::env::temp_dir().join("planes-upload-tests-unused.json"),
    )) as RepositoryState;

    let state = AppState {
        repo,
        storage: Arc::new(mock_storage),
        config,
    };
    create_router(state)
}

fn admin_token() -> String {
    let config = AppConfig::default();
    auth::issue_token(&config.admin_user, config.jwt_secret.as_deref().unwrap()).unwrap()
}

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Body {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn upload_request(token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_upload_success() {
    let storage = MockStorageService::new();
    let token = admin_token();

    let response = app(storage.clone())
        .oneshot(upload_request(
            Some(&token),
            multipart_body("file", "sala velatoria.JPG", b"fake image bytes"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = serde_json::from_value(json_body(response).await).unwrap();

    assert!(body.ok);
    assert!(body.filename.ends_with(".jpg"));
    assert_eq!(body.url, format!("/uploads/{}", body.filename));
    assert_eq!(storage.saved(), vec![(body.filename, 16)]);
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let storage = MockStorageService::new();
    let token = admin_token();

    let response = app(storage.clone())
        .oneshot(upload_request(
            Some(&token),
            multipart_body("imagen", "a.jpg", b"bytes"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Field 'file' is required");
    assert!(storage.saved().is_empty());
}

#[tokio::test]
async fn test_upload_requires_admin_token() {
    let storage = MockStorageService::new();

    let response = app(storage.clone())
        .oneshot(upload_request(None, multipart_body("file", "a.jpg", b"bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(storage.saved().is_empty());
}

#[tokio::test]
async fn test_upload_storage_failure_is_server_error() {
    let token = admin_token();

    let response = app(MockStorageService::new_failing())
        .oneshot(upload_request(
            Some(&token),
            multipart_body("file", "a.jpg", b"bytes"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["message"], "Internal server error");
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let token = admin_token();
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{}"))
        .unwrap();

    let response = app(MockStorageService::new()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
