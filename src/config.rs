use chrono::Duration;
use clap::Parser;

use crate::engine::availability::DEFAULT_LOOKAHEAD_DAYS;

/// Prediction-pool scoring service
#[derive(Parser, Debug, Clone)]
#[command(name = "betpool", version, about)]
pub struct Config {
    /// API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "betpool.db")]
    pub database_path: String,

    /// How many days ahead a fixture opens for predictions
    #[arg(long, env = "LOOKAHEAD_DAYS", default_value_t = DEFAULT_LOOKAHEAD_DAYS)]
    pub lookahead_days: i64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=30).contains(&self.lookahead_days) {
            anyhow::bail!("lookahead_days must be between 1 and 30");
        }
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        Ok(())
    }

    pub fn lookahead(&self) -> Duration {
        Duration::days(self.lookahead_days)
    }
}
