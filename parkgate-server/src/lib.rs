//! parkgate-server: HTTP gateway for the parking booking API
//!
//! Wires CORS, body parsing, the four resource mounts (auth, slot, vehicle,
//! booking), centralized error normalization and the not-found fallback.
//! Resource handlers are supplied by the embedding application through
//! [`ResourceRoutes`].

pub mod config;
pub mod db;
pub mod http;

pub use config::{ConfigError, CorsPolicy, DatabaseConfig, Environment, GatewayConfig, ServerConfig};
pub use http::{build_router, run_server, ApiError, AppState, ResourceRoutes, ServerError};
