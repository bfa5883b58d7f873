//! API error taxonomy and its JSON shape
//!
//! Handlers and pipeline stages return [`ApiError`]. Converting one into a
//! response attaches an [`ErrorReport`] extension; the normalization stage
//! picks that up, logs the diagnostic trace and renders the final body.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";

pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
pub const SERVER_ERROR: &str = "SERVER_ERROR";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bearer token missing, malformed or failing verification (401)
    #[error("invalid authentication token")]
    InvalidToken,

    /// Bearer token past its expiry (401)
    #[error("authentication token expired")]
    TokenExpired,

    /// Request body could not be interpreted (400)
    #[error("{message}")]
    Parse { message: String },

    /// Request body over the configured limit (413)
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Generic application error; every part is optional
    #[error("{}", .message.as_deref().unwrap_or(INTERNAL_SERVER_ERROR_MESSAGE))]
    App {
        status: Option<StatusCode>,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Application error with a message and no declared status or code.
    pub fn new(message: impl Into<String>) -> Self {
        Self::App {
            status: None,
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Declare the status of an application error. Other variants keep
    /// their fixed status.
    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            Self::App { code, message, .. } => Self::App {
                status: Some(status),
                code,
                message,
            },
            other => other,
        }
    }

    /// Declare the code of an application error. Other variants keep their
    /// fixed code.
    pub fn with_code(self, code: impl Into<String>) -> Self {
        match self {
            Self::App {
                status, message, ..
            } => Self::App {
                status,
                code: Some(code.into()),
                message,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::Parse { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::App { status, .. } => status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::InvalidToken => INVALID_TOKEN,
            Self::TokenExpired => TOKEN_EXPIRED,
            Self::Parse { .. } => PARSE_ERROR,
            Self::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE,
            Self::App { code, .. } => code.as_deref().unwrap_or(SERVER_ERROR),
            Self::Database(_) | Self::Internal(_) => SERVER_ERROR,
        }
    }

    /// Message safe to show to callers.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidToken => "Invalid token".to_string(),
            Self::TokenExpired => "Token expired".to_string(),
            Self::Parse { .. } | Self::PayloadTooLarge { .. } | Self::App { .. } => {
                self.to_string()
            }
            // Driver and internal messages stay in the log
            Self::Database(_) | Self::Internal(_) => INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
        }
    }

    fn is_token_error(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::TokenExpired)
    }

    /// Diagnostic trace: the error followed by its source chain.
    pub fn diagnostic(&self) -> String {
        if let Self::Internal(err) = self {
            // anyhow renders the chain and any captured backtrace itself
            return format!("{err:?}");
        }

        let mut trace = format!("{self:?}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            trace.push_str("\n    caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        trace
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    /// Shape an error for the wire. Token errors never carry a stack.
    pub fn from_error(err: &ApiError, include_stack: bool) -> Self {
        let stack = (include_stack && !err.is_token_error()).then(|| err.diagnostic());
        Self {
            message: err.public_message(),
            code: err.code().to_string(),
            stack,
        }
    }
}

/// Response extension carrying the error to the normalization stage.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(ErrorBody::from_error(&self, false))).into_response();
        response.extensions_mut().insert(ErrorReport(Arc::new(self)));
        response
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!(error = %err, "token verification failed");
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}
