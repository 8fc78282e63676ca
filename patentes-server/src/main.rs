//! HTTP server answering whether a plate belongs to a registered public-transport vehicle.

mod config;
mod routes;

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use patentes_core::VerificationService;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment, RUST_LOG included.
    let dotenv_loaded = dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info")),
        )
        .init();
    debug!(dotenv_loaded, "environment loaded");

    let config = Config::parse();

    // HTTP + service setup
    let client = Client::builder()
        .user_agent("patentes/0.1")
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    let strategy = config
        .build_strategy(client)
        .with_context(|| format!("cannot start the {} strategy", config.strategy))?;
    let service =
        Arc::new(VerificationService::new(strategy).with_deadline(config.lookup_timeout()));

    let app = routes::router(Arc::clone(&service));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    info!(%addr, source = %service.source(), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("cannot listen for ctrl-c, running until killed: {err}");
        future::pending::<()>().await;
    }
    info!("shutting down");
}
