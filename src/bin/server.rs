//! HTTP server for the brand intelligence API

use anyhow::{Context, Result};
use brand_intel::api;
use brand_intel::config::AppConfig;
use brand_intel::logging;
use brand_intel::pipeline::QueryPipeline;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    logging::init();

    let config = AppConfig::from_env()?;
    let pipeline = QueryPipeline::from_config(&config)
        .await
        .context("Failed to initialize the intelligence pipeline")?;

    let app = api::router(Arc::new(pipeline));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Brand intelligence API listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
