use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use voxnote_backend::config::Config;
use voxnote_backend::credentials::{default_providers, require_api_key};
use voxnote_backend::dispatcher::GeminiClient;
use voxnote_backend::routes;
use voxnote_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("voxnote_backend=debug,tower_http=debug")
        .init();

    // Load configuration - try multiple paths
    let config_paths = Config::candidate_paths();
    let mut config = None;
    let mut loaded_path = String::new();

    for path in config_paths {
        match Config::load(&path) {
            Ok(cfg) => {
                config = Some(cfg);
                loaded_path = path;
                break;
            }
            Err(e) => {
                tracing::debug!("Failed to load config from {}: {}", path, e);
                continue;
            }
        }
    }

    let config = match config {
        Some(config) => {
            info!("Loaded configuration from: {}", loaded_path);
            config
        }
        None => {
            warn!("No config file found; using built-in defaults");
            Config::default()
        }
    };

    // Resolve the API credential before anything else so a missing key fails
    // here instead of on the first analysis.
    let api_key = require_api_key(&default_providers(&config))?;

    let client = Arc::new(GeminiClient::new(&config.analysis_config, api_key)?);
    let app_state = AppState::new(config.clone(), client);

    // Build application
    let app = Router::new()
        .merge(routes::create_routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let addr = config.system_config.bind_addr()?;
    info!(
        "Starting server on {} (model: {})",
        addr, config.analysis_config.model
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
