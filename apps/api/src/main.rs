mod auth;
mod config;
mod db;
mod errors;
mod intelligence;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod plans;
mod resumes;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::token::TokenIssuer;
use crate::config::{Config, DEFAULT_SECRET_KEY};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recruitment API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let intelligence = intelligence::from_config(&config)?;
    info!("Document intelligence provider: {}", intelligence.kind().as_str());

    let files = storage::from_config(&config).await?;

    if config.secret_key == DEFAULT_SECRET_KEY {
        warn!("SECRET_KEY is not set, signing tokens with the development default");
    }
    let tokens = Arc::new(TokenIssuer::new(&config.secret_key, config.token_ttl_minutes));

    let state = AppState {
        db,
        intelligence,
        files,
        tokens,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
