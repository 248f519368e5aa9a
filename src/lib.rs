//! Dynamic MCP Server Library
//!
//! An MCP server whose tools are not compiled in. Each route reads a JSON
//! file of declarative tool definitions; every tool is a templated HTTP
//! request that the server binds with the caller's arguments and sends.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, the rmcp server handler and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: Tool definitions, per-route registry, template binding and HTTP invocation
//!
//! # Example
//!
//! ```rust,no_run
//! use dynamic_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone());
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
