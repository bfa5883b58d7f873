//! Gateway configuration
//!
//! Everything here is built once at startup and read-only afterwards. The
//! pipeline receives it by value; nothing is stored in a global.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::{header, HeaderName, HeaderValue, Method};

/// Default request body limit (100 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

/// Default maximum connections for the database pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Methods advertised to allowed origins.
pub const ALLOWED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Request headers advertised to allowed origins.
pub const ALLOWED_HEADERS: [HeaderName; 8] = [
    header::CONTENT_TYPE,
    header::ORIGIN,
    HeaderName::from_static("x-requested-with"),
    header::ACCEPT,
    HeaderName::from_static("x-client-key"),
    HeaderName::from_static("x-client-token"),
    HeaderName::from_static("x-client-secret"),
    header::AUTHORIZATION,
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid CORS origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// Cross-origin policy: one allowed origin, fixed methods and headers.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allowed_origin: HeaderValue,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
}

impl CorsPolicy {
    /// Build the policy for a single client origin such as
    /// `https://app.example.com`.
    ///
    /// The origin is normalized the way browsers send it in the `Origin`
    /// header: no path, no trailing slash, default ports dropped.
    pub fn new(client_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidOrigin {
            origin: client_url.to_string(),
            reason,
        };

        let url = url::Url::parse(client_url.trim()).map_err(|e| invalid(e.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(invalid("origin must have a scheme and host".to_string()));
        }

        let allowed_origin = HeaderValue::from_str(&origin.ascii_serialization())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            allowed_origin,
            allowed_methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS.to_vec(),
            allow_credentials: true,
        })
    }
}

/// Deployment environment, read from `NODE_ENV`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
    Test,
    Other(String),
}

impl Environment {
    /// Development mode exposes diagnostic stacks in error bodies.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "development" => Self::Development,
            "production" => Self::Production,
            "test" => Self::Test,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
            Self::Test => f.write_str("test"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Request pipeline configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub cors: CorsPolicy,
    pub environment: Environment,
    /// Maximum buffered request body, in bytes
    pub body_limit: usize,
}

impl GatewayConfig {
    pub fn new(cors: CorsPolicy) -> Self {
        Self {
            cors,
            environment: Environment::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Database connection and schema sync settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Directory of `<version>_<description>.sql` migrations applied on boot
    pub migrations_dir: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            migrations_dir: None,
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
}
