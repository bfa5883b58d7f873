//! Bearer token plumbing for resource routers
//!
//! Verification itself belongs to the auth routes; this module only gets the
//! token off the wire and turns JWT failures into the two token error kinds.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{DecodingKey, Validation};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// `Authorization: Bearer <token>`, rejected with `INVALID_TOKEN`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers).map(|token| Self(token.to_string()))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::InvalidToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    Ok(token)
}

/// Verify a token and return its claims.
pub fn decode_claims<C: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<C, ApiError> {
    Ok(jsonwebtoken::decode::<C>(token, key, validation)?.claims)
}
