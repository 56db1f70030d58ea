//! Configuration for the static file server.
//!
//! Supports both command-line arguments and an optional TOML configuration
//! file. CLI arguments take precedence over config file values, the same
//! merge policy the teacher crate this was derived from uses.

use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "reactord")]
#[command(author = "reactord authors")]
#[command(version)]
#[command(about = "A single-process static file server built on a one-shot reactor", long_about = None)]
pub struct CliArgs {
    /// Port to listen on.
    pub port: Option<u16>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to serve files from.
    #[arg(short = 'd', long)]
    pub document_root: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum number of concurrent connections.
    #[arg(short = 'm', long)]
    pub max_connections: Option<usize>,

    /// Maximum number of connections waiting in the task queue.
    #[arg(short = 'q', long)]
    pub queue_capacity: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Directory to serve files from.
    #[serde(default = "default_document_root")]
    pub document_root: PathBuf,
    /// Number of worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Maximum number of connections waiting in the task queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_root: default_document_root(),
            workers: default_workers(),
            max_connections: default_max_connections(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_document_root() -> PathBuf {
    PathBuf::from(".")
}

/// Default worker pool size.
fn default_workers() -> usize {
    8
}

/// Default ceiling on simultaneously open connections.
fn default_max_connections() -> usize {
    65536
}

/// Default bound on connections waiting in the task queue.
fn default_queue_capacity() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final, resolved configuration used to build the reactor.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub document_root: PathBuf,
    pub workers: usize,
    pub max_connections: usize,
    pub queue_capacity: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and an optional TOML file.
    ///
    /// CLI arguments take precedence over TOML file values. Returns an
    /// error if the port is missing or invalid, or the config file cannot
    /// be read/parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let port = cli
            .port
            .ok_or_else(|| ConfigError::InvalidPort("<missing>".to_string()))?;

        let toml_config = if let Some(ref path) = cli.config {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
            toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Config {
            port,
            document_root: cli.document_root.unwrap_or(toml_config.server.document_root),
            workers: cli.workers.unwrap_or(toml_config.server.workers),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            queue_capacity: cli.queue_capacity.unwrap_or(toml_config.server.queue_capacity),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.document_root, PathBuf::from("."));
        assert_eq!(config.server.workers, 8);
        assert_eq!(config.server.max_connections, 65536);
        assert_eq!(config.server.queue_capacity, 10_000);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            document_root = "/srv/www"
            workers = 4
            max_connections = 1024
            queue_capacity = 500

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.document_root, PathBuf::from("/srv/www"));
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.server.max_connections, 1024);
        assert_eq!(config.server.queue_capacity, 500);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_port_is_error() {
        let cli = CliArgs {
            port: None,
            config: None,
            document_root: None,
            workers: None,
            max_connections: None,
            queue_capacity: None,
            log_level: "info".to_string(),
        };
        assert!(Config::from_args(cli).is_err());
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = CliArgs {
            port: Some(8080),
            config: None,
            document_root: Some(PathBuf::from("/tmp/www")),
            workers: Some(2),
            max_connections: None,
            queue_capacity: None,
            log_level: "info".to_string(),
        };
        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.document_root, PathBuf::from("/tmp/www"));
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_connections, 65536);
    }
}
