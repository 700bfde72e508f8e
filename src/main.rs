use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use http::Method;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use rev_gateway::{AppState, ServerConfig, routes};

/// Rev Gateway - real-time voice relay to the Gemini Live API
#[derive(Parser, Debug)]
#[command(name = "rev-gateway")]
#[command(version, about, long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for the TLS connection to the upstream
    // Live endpoint
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let _cli = Cli::parse();

    let config = ServerConfig::from_env()?;
    let address = config.address();
    let static_dir = config.static_dir.clone();
    let cors_origins = config.cors_allowed_origins.clone();

    let app_state = Arc::new(AppState::new(config));

    // Configure CORS; the default is wide open, matching the relay's role
    // as a same-host development server for the client bundle.
    let cors_layer = if cors_origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    } else {
        let origins: Vec<http::HeaderValue> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    };

    // Relay WebSocket endpoint plus the static client bundle.
    let app = routes::relay::create_relay_router()
        .with_state(app_state)
        .fallback_service(ServeDir::new(&static_dir))
        .layer(cors_layer);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
