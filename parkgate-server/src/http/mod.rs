//! HTTP layer
//!
//! Axum request pipeline with:
//! - CORS for the configured client origin
//! - JSON / URL-encoded body parsing ahead of dispatch
//! - four resource mounts and a 404 fallback
//! - one terminal stage that normalizes every error into JSON

pub mod auth;
pub mod body;
pub mod error;
pub mod normalize;
pub mod routes;
pub mod server;

pub use auth::BearerToken;
pub use body::{Payload, RequestBody};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use routes::{NotFoundBody, ResourceRoutes};
pub use server::{build_router, run_server, AppState, ServerError};
