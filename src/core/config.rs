//! Configuration management for the MCP server.
//!
//! Configuration starts from defaults and is then overridden by `MCP_*`
//! environment variables (a `.env` file is loaded first when present).

use super::error::{Error, Result};
use super::transport::TransportConfig;
use crate::domains::tools::DEFAULT_ROUTE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Mount path of the MCP endpoint when none is configured.
pub const DEFAULT_MOUNT_PATH: &str = "/mcp";

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Tools domain configuration.
    pub tools: ToolsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the tools domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory holding the `{route}_tools.json` files.
    pub directory: PathBuf,

    /// Route used when a request carries no path.
    pub default_route: String,

    /// Path the MCP endpoint is mounted at. Routes live beneath it.
    pub mount_path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            default_route: DEFAULT_ROUTE.to_string(),
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
        }
    }
}

impl ToolsConfig {
    /// Prefix stripped from inbound paths to obtain the route key.
    ///
    /// `/mcp` gives `/mcp/`; a root mount gives `/`.
    pub fn mount_prefix(&self) -> String {
        format!("{}/", self.mount_path.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "dynamic-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: ToolsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`,
    /// `MCP_TOOLS_DIR`, `MCP_DEFAULT_ROUTE`, `MCP_HTTP_PATH`, plus the
    /// transport variables read by [`TransportConfig::from_env`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(dir) = std::env::var("MCP_TOOLS_DIR") {
            config.tools.directory = PathBuf::from(dir);
        }

        if let Ok(route) = std::env::var("MCP_DEFAULT_ROUTE") {
            let route = route.trim();
            if route.is_empty() {
                warn!("MCP_DEFAULT_ROUTE is empty, keeping '{}'", config.tools.default_route);
            } else {
                config.tools.default_route = route.to_string();
            }
        }

        if let Ok(path) = std::env::var("MCP_HTTP_PATH") {
            config.tools.mount_path = path;
        }

        config.transport = TransportConfig::from_env();

        config
    }

    /// Check the configuration for values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.tools.mount_path.starts_with('/') {
            return Err(Error::config(format!(
                "mount path '{}' must start with '/'",
                self.tools.mount_path
            )));
        }
        if self.tools.default_route.contains(['/', '\\']) {
            return Err(Error::config(format!(
                "default route '{}' must not contain path separators",
                self.tools.default_route
            )));
        }
        if !self.tools.directory.is_dir() {
            warn!(
                "Tools directory {} does not exist; every route will list no tools",
                self.tools.directory.display()
            );
        }
        Ok(())
    }
}
