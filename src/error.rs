//! Error types for configuration and startup failures.
//!
//! Per-connection failures (parse errors, missing resources, transport
//! errors) are represented by [`crate::parser::HttpCode`] and plain
//! `std::io::Error` instead; those are recovered from locally and never
//! bubble up to `main`, so they don't need a dedicated error type here.

use std::fmt;
use std::path::PathBuf;

/// Errors that can prevent the server from starting.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    FileRead(PathBuf, std::io::Error),
    /// The configuration file could not be parsed as TOML.
    TomlParse(PathBuf, toml::de::Error),
    /// The port argument was missing or not a valid port number.
    InvalidPort(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidPort(port) => write!(f, "invalid port: '{port}'"),
        }
    }
}

impl std::error::Error for ConfigError {}
