//! Error-normalization stage
//!
//! Terminal handler for every [`ApiError`] raised inside the pipeline, by a
//! stage or by a sub-router. Logs the diagnostic trace, then renders the
//! body for the configured environment.
//!
//! Error responses that did not come from an [`ApiError`] (axum extractor
//! rejections such as a `Json<T>` content-type mismatch) are rebuilt from
//! their status and text.

use std::any::Any;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::error::{ApiError, ErrorBody, ErrorReport, INTERNAL_SERVER_ERROR_MESSAGE};
use crate::config::GatewayConfig;

/// Most text kept from an unshaped error body
const REJECTION_TEXT_LIMIT: usize = 4 * 1024;

pub async fn normalize_errors(
    State(config): State<Arc<GatewayConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;
    let err = match response.extensions_mut().remove::<ErrorReport>() {
        Some(ErrorReport(err)) => err,
        None if is_unshaped_error(&response) => Arc::new(unshaped_error(response).await),
        None => return response,
    };

    let status = err.status();
    tracing::error!(
        %method,
        %uri,
        status = status.as_u16(),
        code = err.code(),
        "{}",
        err.diagnostic()
    );

    let body = ErrorBody::from_error(&err, config.environment.is_development());
    (status, Json(body)).into_response()
}

/// An error status whose body is not already JSON
fn is_unshaped_error(response: &Response) -> bool {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return false;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
    !is_json
}

async fn unshaped_error(response: Response) -> ApiError {
    let status = response.status();
    let text = to_bytes(response.into_body(), REJECTION_TEXT_LIMIT)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    let message = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or(INTERNAL_SERVER_ERROR_MESSAGE)
            .to_string()
    } else {
        text
    };
    ApiError::new(message).with_status(status)
}

/// Turn a handler panic into a generic server error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
