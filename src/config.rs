//! Command line and environment configuration

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "horae")]
#[command(about = "Focus and break time keeper bot")]
#[command(version)]
pub struct Config {
    /// Database file; defaults to $HOME/.horae/horae.db
    #[arg(long, env = "HORAE_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// HTTP port
    #[arg(long, env = "HORAE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Timer tick in milliseconds
    #[arg(long, env = "HORAE_TICK_MS", default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Endpoint receiving every outbound message as JSON
    #[arg(long, env = "HORAE_OUTBOUND_URL")]
    pub outbound_url: Option<String>,

    /// Delivery attempts per outbound message when rate limited
    #[arg(long, env = "HORAE_NOTIFY_ATTEMPTS", default_value_t = 5)]
    pub notify_attempts: u32,

    /// Wipe this bucket before starting
    #[arg(long, value_name = "NAME")]
    pub wipe_bucket: Option<String>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".horae").join("horae.db")
        })
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
