//! End-to-end checks of the request pipeline with stub resource routers

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

use parkgate_server::http::body::Payload;
use parkgate_server::http::{ApiError, ApiResult, BearerToken, ErrorBody, NotFoundBody};
use parkgate_server::{build_router, CorsPolicy, Environment, GatewayConfig, ResourceRoutes};

const CLIENT: &str = "http://localhost:5173";

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
}

async fn login(Payload(req): Payload<LoginRequest>) -> Json<Value> {
    Json(json!({ "email": req.email }))
}

async fn me(BearerToken(token): BearerToken) -> Json<Value> {
    Json(json!({ "token": token }))
}

async fn invalid_token() -> ApiResult<()> {
    Err(ApiError::InvalidToken)
}

async fn expired_token() -> ApiResult<()> {
    Err(ApiError::TokenExpired)
}

async fn bare_failure() -> ApiResult<()> {
    Err(ApiError::App {
        status: None,
        code: None,
        message: None,
    })
}

async fn slot_taken() -> ApiResult<()> {
    Err(ApiError::new("Slot already booked")
        .with_status(StatusCode::CONFLICT)
        .with_code("SLOT_TAKEN"))
}

async fn exploding() -> &'static str {
    panic!("booking ledger corrupted")
}

fn routes() -> ResourceRoutes {
    ResourceRoutes::new()
        .auth(
            Router::new()
                .route("/login", post(login))
                .route("/me", get(me))
                .route("/echo", post(|Json(value): Json<Value>| async move { Json(value) })),
        )
        .slot(
            Router::new()
                .route("/", get(|| async { "slots" }))
                .route("/invalid", get(invalid_token))
                .route("/expired", get(expired_token)),
        )
        .vehicle(Router::new().route("/fail", get(bare_failure)))
        .booking(
            Router::new()
                .route("/conflict", post(slot_taken))
                .route("/panic", get(exploding)),
        )
}

fn app(environment: Environment) -> Router {
    let config = GatewayConfig::new(CorsPolicy::new(CLIENT).unwrap())
        .with_environment(environment)
        .with_body_limit(1024);
    build_router(config, routes())
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn error_body(response: Response) -> ErrorBody {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn unknown_path_is_404_with_literal_body() {
    let response = send(app(Environment::Production), get_request("/api/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(
        body,
        json!({ "message": "Endpoint not found", "code": "ENDPOINT_NOT_FOUND" })
    );
}

#[tokio::test]
async fn unhandled_path_under_mount_falls_through_to_404() {
    let response = send(app(Environment::Production), get_request("/api/vehicle/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: NotFoundBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.code, "ENDPOINT_NOT_FOUND");
}

#[tokio::test]
async fn prefix_must_match_whole_segment() {
    let response = send(app(Environment::Production), get_request("/api/slotx")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mounted_route_dispatches() {
    let response = send(app(Environment::Production), get_request("/api/slot")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"slots");
}

#[tokio::test]
async fn wrong_method_on_mounted_route_is_404_with_literal_body() {
    for method in [Method::POST, Method::DELETE] {
        let request = Request::builder()
            .method(method)
            .uri("/api/slot")
            .body(Body::empty())
            .unwrap();
        let response = send(app(Environment::Production), request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            json!({ "message": "Endpoint not found", "code": "ENDPOINT_NOT_FOUND" })
        );
    }
}

#[tokio::test]
async fn trailing_slash_reaches_mount_root() {
    let response = send(app(Environment::Production), get_request("/api/slot/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"slots");
}

#[tokio::test]
async fn extractor_rejection_is_normalized() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/echo")
        .body(Body::from(r#"{"plate":"AB-123"}"#))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = error_body(response).await;
    assert_eq!(body.code, "SERVER_ERROR");
    assert!(body.message.contains("Content-Type"), "{}", body.message);
    assert!(body.stack.is_none());
}

#[tokio::test]
async fn allowed_origin_gets_cors_headers() {
    let request = Request::builder()
        .uri("/api/slot")
        .header(header::ORIGIN, CLIENT)
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], CLIENT);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn preflight_short_circuits_with_empty_body() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/booking")
        .header(header::ORIGIN, CLIENT)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,authorization")
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert!(response.status().is_success());
    let headers = response.headers().clone();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], CLIENT);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    for method in ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"] {
        assert!(methods.contains(method), "missing {method} in {methods}");
    }
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    for name in ["authorization", "content-type", "x-client-key", "x-client-secret"] {
        assert!(allowed.contains(name), "missing {name} in {allowed}");
    }

    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn disallowed_origin_gets_no_allow_origin() {
    let request = Request::builder()
        .uri("/api/slot")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    // Header-setting only; the request still goes through
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn json_body_reaches_handler() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"driver@example.com"}"#))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["email"], "driver@example.com");
}

#[tokio::test]
async fn form_body_reaches_handler() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=driver%40example.com"))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["email"], "driver@example.com");
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "#))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert!(response.status().is_client_error());
    let body = error_body(response).await;
    assert_eq!(body.code, "PARSE_ERROR");
    assert!(body.stack.is_none());
}

#[tokio::test]
async fn malformed_json_fails_even_on_unknown_path() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/unknown")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{nope"))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.code, "PARSE_ERROR");
}

#[tokio::test]
async fn missing_field_is_parse_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"password":"x"}"#))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.code, "PARSE_ERROR");
}

#[tokio::test]
async fn oversized_body_is_413() {
    let payload = format!(r#"{{"email":"{}"}}"#, "a".repeat(4096));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_body(response).await.code, "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn invalid_token_is_401() {
    let response = send(app(Environment::Development), get_request("/api/slot/invalid")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = error_body(response).await;
    assert_eq!(body.code, "INVALID_TOKEN");
    assert_eq!(body.message, "Invalid token");
    assert!(body.stack.is_none());
}

#[tokio::test]
async fn expired_token_is_401() {
    let response = send(app(Environment::Production), get_request("/api/slot/expired")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = error_body(response).await;
    assert_eq!(body.code, "TOKEN_EXPIRED");
    assert_eq!(body.message, "Token expired");
}

#[tokio::test]
async fn missing_bearer_is_invalid_token() {
    let response = send(app(Environment::Production), get_request("/api/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_body(response).await.code, "INVALID_TOKEN");
}

#[tokio::test]
async fn bearer_token_is_extracted() {
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["token"], "abc.def.ghi");
}

#[tokio::test]
async fn generic_error_defaults_to_500() {
    let response = send(app(Environment::Production), get_request("/api/vehicle/fail")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = error_body(response).await;
    assert_eq!(body.code, "SERVER_ERROR");
    assert_eq!(body.message, "Internal Server Error");
    assert!(body.stack.is_none());
}

#[tokio::test]
async fn declared_status_and_code_are_kept() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/booking/conflict")
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = error_body(response).await;
    assert_eq!(body.code, "SLOT_TAKEN");
    assert_eq!(body.message, "Slot already booked");
}

#[tokio::test]
async fn stack_present_only_in_development() {
    let response = send(app(Environment::Development), get_request("/api/vehicle/fail")).await;
    let body = error_body(response).await;
    assert!(body.stack.is_some());

    let response = send(app(Environment::Test), get_request("/api/vehicle/fail")).await;
    let body = error_body(response).await;
    assert!(body.stack.is_none());
}

#[tokio::test]
async fn panic_is_normalized_to_500() {
    let response = send(app(Environment::Development), get_request("/api/booking/panic")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = error_body(response).await;
    assert_eq!(body.code, "SERVER_ERROR");
    assert_eq!(body.message, "Internal Server Error");
    assert!(body.stack.unwrap().contains("booking ledger corrupted"));
}

#[tokio::test]
async fn error_responses_keep_cors_headers() {
    let request = Request::builder()
        .uri("/api/slot/expired")
        .header(header::ORIGIN, CLIENT)
        .body(Body::empty())
        .unwrap();
    let response = send(app(Environment::Production), request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], CLIENT);
}
