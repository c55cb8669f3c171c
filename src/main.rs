use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use config::Config;
use dal::{SessionStore, StopRegistry, load_route_layers};
use services::directions::DirectionsClient;
use web::AppState;

mod config;
mod dal;
mod model;
mod services;
mod telemetry;
mod utils;
mod web;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    _ = dotenv();
    let config = Config::parse();

    let telemetry = telemetry::init(&config.log_dir, config.otlp_endpoint.as_deref())?;
    info!("starting with {:?}", config.bind);

    let res = run(config).await;
    if let Err(e) = &res {
        error!("{e:?}");
    }

    telemetry.shutdown();
    res
}

async fn run(config: Config) -> Result<()> {
    let stops = StopRegistry::load(&config.stops, &config.name_property)
        .with_context(|| format!("error loading stops from {}", config.stops.display()))?;

    let layers = load_route_layers(&config.data_dir);

    let directions = config
        .directions()
        .map(DirectionsClient::new)
        .transpose()
        .context("error building the directions client")?;
    if directions.is_none() {
        warn!("DIRECTIONS_ACCESS_TOKEN not set, route planning is disabled");
    }

    let state = Arc::new(AppState {
        stops,
        layers,
        sessions: SessionStore::with_idle_timeout(config.session_idle_timeout()),
        directions,
    });

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("error binding {}", config.bind))?;
    info!("listening on http://{}", config.bind);

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("error listening for ctrl-c: {e}");
    }
    info!("Ctrl-C received; shutting down...");
}
