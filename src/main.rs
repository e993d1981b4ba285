use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod engine;

use api::AppState;
use config::Config;
use db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // Bonus rows are looked up by name at scoring time; flag gaps early.
    let rules = db.rule_table()?;
    if rules.is_empty() {
        warn!("Rule table is empty, every decided fixture will fail to score");
    } else {
        info!("Loaded {} scoring rule(s)", rules.len());
    }
    for kind in rules.missing_bonus_rows() {
        warn!(
            "Missing bonus rule '{}', season predictions cannot be scored",
            kind.stage_name()
        );
    }

    info!(
        "Fixtures open {} day(s) ahead of kickoff",
        config.lookahead_days
    );

    let state = AppState {
        db,
        lookahead: config.lookahead(),
    };
    let app = api::router(state);
    let addr: SocketAddr = config.api_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
