//! Body-parsing stage
//!
//! JSON and URL-encoded bodies are parsed before dispatch, for every route.
//! The parsed value rides along as a [`RequestBody`] extension and the raw
//! bytes are put back, so sub-routers can use either.

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::ApiError;

/// Parsed request body. `{}` when the request had none.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody(pub Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Option<Self> {
        let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let mime = content_type.split(';').next().unwrap_or_default().trim();

        if mime.eq_ignore_ascii_case("application/json") {
            Some(Self::Json)
        } else if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Some(Self::Form)
        } else {
            None
        }
    }
}

/// Middleware: parse the body according to its content type.
pub async fn parse_body(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(kind) = BodyKind::of(request.headers()) else {
        return Ok(next.run(request).await);
    };

    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge { limit });
    }

    let (mut parts, body) = request.into_parts();
    // Chunked bodies only reveal their size while streaming
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::PayloadTooLarge { limit })?;

    let value = match kind {
        BodyKind::Json => parse_json(&bytes)?,
        BodyKind::Form => parse_form(&bytes),
    };
    tracing::trace!(?kind, len = bytes.len(), "request body parsed");

    parts.extensions.insert(RequestBody(value));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Strict JSON: the top level must be an object or an array.
fn parse_json(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::parse(format!("Malformed JSON body: {e}")))?;

    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(ApiError::parse("JSON body must be an object or an array")),
    }
}

/// Flat form decoding; a repeated key collects its values into an array.
fn parse_form(bytes: &[u8]) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            None => {
                fields.insert(key.into_owned(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Value::Object(fields)
}

/// Typed view of the parsed body.
///
/// ```ignore
/// async fn login(Payload(req): Payload<LoginRequest>) -> ApiResult<Json<Session>> { .. }
/// ```
pub struct Payload<T>(pub T);

impl<S, T> FromRequestParts<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .extensions
            .get::<RequestBody>()
            .map(|body| body.0.clone())
            .unwrap_or_else(|| Value::Object(Map::new()));

        serde_json::from_value(value)
            .map(Payload)
            .map_err(|e| ApiError::parse(format!("Invalid request body: {e}")))
    }
}
