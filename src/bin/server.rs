//! ScoreHub web server
//!
//! HTTP backend for football match data, simulated betting, and score
//! predictions.

use anyhow::Result;
use scorehub::api::{create_app, AppState};
use scorehub::Config;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging. Override with RUST_LOG, e.g. RUST_LOG=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let port = config.port;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       SCOREHUB - FOOTBALL BETTING BACKEND                     ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Database: {:<50} ║", config.database_path);
    println!("║  Scrape interval: {:<42}s ║", config.scrape_interval_seconds);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    // Create application state
    info!("Initializing application state...");
    let state = AppState::new(config).await?;

    // Spawn the background scrape loop
    let scraper_state = state.clone();
    tokio::spawn(async move {
        info!("Starting background match scraper...");
        run_scraper(scraper_state).await;
    });

    // Create the Axum app
    let app = create_app(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    println!("  API:    http://localhost:{}", port);
    println!("  Health: http://localhost:{}/health", port);
    println!();

    // Run the server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Background loop that periodically refreshes the match collection
async fn run_scraper(state: AppState) {
    let interval = state.config.scrape_interval_seconds;

    loop {
        let cycle_start = Instant::now();

        match state.scraper.run_cycle(&state.db).await {
            Ok(summary) => {
                info!(
                    "Scrape complete: {} matches, {} events",
                    summary.matches, summary.events
                );
            }
            Err(e) => {
                tracing::error!("Scrape cycle failed: {}", e);
            }
        }

        // Adaptive sleep: account for cycle duration
        let elapsed = cycle_start.elapsed();
        let target = Duration::from_secs(interval);
        if let Some(remaining) = target.checked_sub(elapsed) {
            tokio::time::sleep(remaining).await;
        }
    }
}
