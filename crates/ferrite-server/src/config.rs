//! Server configuration.
//!
//! Every flag has a `FERRITE_*` environment override. Durations are plain
//! seconds, matching the integer-seconds TTL model of the wire protocol.
//! `--max-memory` takes a human-readable size; it is parsed and validated
//! but not yet enforced. The persistence and keep-alive flags are accepted
//! as reserved hooks and perform no I/O.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// ferrite, an in-memory cache server speaking a length-prefixed binary
/// protocol over TCP.
#[derive(Parser, Debug, Clone)]
#[command(name = "ferrite-server", version, about)]
pub struct Config {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "localhost", env = "FERRITE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = 6379, env = "FERRITE_PORT")]
    pub port: u16,

    /// Maximum number of simultaneous client connections
    #[arg(long, default_value_t = 10_000, env = "FERRITE_MAX_CLIENTS")]
    pub max_clients: usize,

    /// Idle connection timeout in seconds
    #[arg(long, default_value_t = 30, env = "FERRITE_TIMEOUT")]
    pub timeout: u64,

    /// Maximum memory to use, e.g. 512MB or 2GB (parsed, not yet enforced)
    #[arg(long, default_value = "1GB", env = "FERRITE_MAX_MEMORY")]
    pub max_memory: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FERRITE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, default_value = "text", env = "FERRITE_LOG_FORMAT")]
    pub log_format: String,

    /// Enable persistence to disk (reserved, performs no I/O yet)
    #[arg(long, env = "FERRITE_ENABLE_PERSIST")]
    pub enable_persist: bool,

    /// Data directory for persistence (reserved)
    #[arg(long, default_value = "./data", env = "FERRITE_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Persistence snapshot interval in seconds (reserved)
    #[arg(long, default_value_t = 300, env = "FERRITE_SAVE_INTERVAL")]
    pub save_interval: u64,

    /// Enable TCP keep-alive (reserved)
    #[arg(
        long,
        action = clap::ArgAction::Set,
        default_value_t = true,
        env = "FERRITE_TCP_KEEPALIVE"
    )]
    pub tcp_keepalive: bool,
}

impl Config {
    /// Address string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validates cross-field constraints clap can't express.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be in 1-65535".into());
        }
        if self.max_clients == 0 {
            return Err("max-clients must be at least 1".into());
        }
        if self.timeout == 0 {
            return Err("timeout must be at least 1 second".into());
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!(
                "invalid log level '{}' (expected one of: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.log_format != "text" && self.log_format != "json" {
            return Err(format!(
                "invalid log format '{}' (expected text or json)",
                self.log_format
            ));
        }
        parse_byte_size(&self.max_memory).map_err(|e| format!("invalid max-memory: {e}"))?;
        Ok(())
    }
}

/// Parses a human-readable byte size string into a number of bytes.
///
/// Supports suffixes K/KB, M/MB, G/GB (binary multiples); plain numbers are
/// bytes. Case insensitive.
pub fn parse_byte_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty byte size string".into());
    }

    let upper = input.to_ascii_uppercase();
    let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix('K') {
        (n, 1024)
    } else {
        (upper.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid byte size: '{input}'"))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("byte size overflow: '{input}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        Config::parse_from(["ferrite-server"])
    }

    #[test]
    fn default_config_is_valid() {
        let config = defaults();
        assert_eq!(config.listen_addr(), "localhost:6379");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "ferrite-server",
            "--host",
            "0.0.0.0",
            "--port",
            "7000",
            "--timeout",
            "5",
        ]);
        assert_eq!(config.listen_addr(), "0.0.0.0:7000");
        assert_eq!(config.idle_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = defaults();
        config.log_level = "verbose".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_log_format() {
        let mut config = defaults();
        config.log_format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_clients() {
        let mut config = defaults();
        config.max_clients = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unparseable_max_memory() {
        let mut config = defaults();
        config.max_memory = "lots".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_plain_bytes() {
        assert_eq!(parse_byte_size("1024").unwrap(), 1024);
    }

    #[test]
    fn parse_suffixes() {
        assert_eq!(parse_byte_size("100K").unwrap(), 100 * 1024);
        assert_eq!(parse_byte_size("100kb").unwrap(), 100 * 1024);
        assert_eq!(parse_byte_size("50M").unwrap(), 50 * 1024 * 1024);
        assert_eq!(parse_byte_size("2GB").unwrap(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("MB").is_err());
        assert!(parse_byte_size("12X").is_err());
    }
}
