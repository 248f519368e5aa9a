//! Transport layer for the MCP server.
//!
//! - **STDIO**: rmcp over standard input/output, default route only - feature: `stdio`
//! - **HTTP**: JSON-RPC over POST with one URL per route - feature: `http`
//!
//! Both transports delegate message processing to [`McpServer`](crate::core::McpServer).

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
