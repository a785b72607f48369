use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use crate::error::Result;

#[derive(Parser, Debug, Clone)]
#[command(name = "trowel")]
#[command(about = "trowel - regex routing and a fluent query builder over SQLite", long_about = None)]
pub struct Config {
    #[arg(short, long, default_value = "127.0.0.1:3000", env = "TROWEL_BIND")]
    pub bind: SocketAddr,

    #[arg(short, long, default_value = "trowel.db", env = "TROWEL_DATABASE")]
    pub database: String,

    #[arg(long, env = "TROWEL_IN_MEMORY", help = "Use an in-memory SQLite database (data is lost on exit)")]
    pub in_memory: bool,

    #[arg(long, default_value = "info", env = "TROWEL_LOG_LEVEL", help = "Default tracing filter when RUST_LOG is unset")]
    pub log_level: String,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn open_database(&self) -> Result<rusqlite::Connection> {
        let conn = if self.in_memory {
            info!("using in-memory database");
            rusqlite::Connection::open_in_memory()?
        } else {
            info!(path = %self.database, "opening database");
            rusqlite::Connection::open(&self.database)?
        };
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["trowel"]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from(["trowel", "--bind", "0.0.0.0:8080", "--in-memory"]).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert!(config.in_memory);
        assert!(config.open_database().is_ok());
    }
}
