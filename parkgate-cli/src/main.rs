//! parkgate - HTTP gateway for the parking booking API
//!
//! Loads `.env`, reads settings from flags or the environment, syncs the
//! database schema and serves the `/api/{auth,slot,vehicle,booking}` mounts
//! until Ctrl+C or SIGTERM.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use parkgate_server::config::{DEFAULT_BODY_LIMIT, DEFAULT_MAX_CONNECTIONS};
use parkgate_server::{
    run_server, CorsPolicy, DatabaseConfig, Environment, GatewayConfig, ResourceRoutes, ServerConfig,
};
use tracing::info;

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "parkgate",
    author,
    version,
    about = "HTTP gateway for the parking booking API",
    long_about = "Serves the auth, slot, vehicle and booking mounts behind CORS, body parsing \
                  and JSON error normalization. Settings come from flags, the environment \
                  or a .env file in the working directory."
)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "APP_PORT", default_value_t = 3000)]
    port: u16,

    /// Address to bind to
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// The single origin allowed by CORS (e.g. https://app.example.com)
    #[arg(long, env = "CLIENT_URL")]
    client_url: String,

    /// Deployment environment; "development" adds stacks to error bodies
    #[arg(long, env = "NODE_ENV", default_value = "production")]
    node_env: Environment,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    /// Directory of SQL migrations applied on boot
    #[arg(long, env = "DATABASE_MIGRATIONS")]
    migrations: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, env = "BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    body_limit: usize,

    /// Debug logging (unless RUST_LOG is set)
    #[arg(long)]
    debug: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long)]
    otel: bool,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let cors = CorsPolicy::new(&self.client_url)
            .with_context(|| format!("CLIENT_URL {:?} is not a valid origin", self.client_url))?;

        let gateway = GatewayConfig::new(cors)
            .with_environment(self.node_env.clone())
            .with_body_limit(self.body_limit);

        let database = DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            migrations_dir: self.migrations.clone(),
        };

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            gateway,
            database,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables win
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })?;

    let result = run(cli).await;
    tracing_setup::shutdown();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.server_config()?;
    info!(
        environment = %config.gateway.environment,
        origin = ?config.gateway.cors.allowed_origin,
        "starting parkgate"
    );

    // Resource handlers are not part of this binary; the mounts stay empty
    run_server(config, |_state| ResourceRoutes::default())
        .await
        .context("server error")
}
