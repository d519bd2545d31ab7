use serde::Deserialize;
use std::net::SocketAddr;

use crate::inject::DEFAULT_MARKUP;

/// Injection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InjectConfig {
    /// HTML fragment injected at the front of every relayed HTML document
    /// Default: a doctype plus a console banner script
    #[serde(default = "default_markup")]
    pub markup: String,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self { markup: default_markup() }
    }
}

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Upstream connection timeout in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
    /// Idle timeout for pooled upstream connections in milliseconds
    /// Default: 60000 (60 seconds)
    #[serde(default = "default_idle_timeout")]
    pub idle_ms: u64,
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            idle_ms: default_idle_timeout(),
            shutdown_secs: default_shutdown_timeout(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:8000" or "127.0.0.1:8000"
    pub listen: SocketAddr,
    /// Injection configuration
    #[serde(default)]
    pub inject: InjectConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
}

fn default_markup() -> String {
    DEFAULT_MARKUP.to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_idle_timeout() -> u64 {
    60000
}

fn default_shutdown_timeout() -> u64 {
    30
}
