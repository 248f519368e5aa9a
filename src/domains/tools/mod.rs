//! Tools domain module.
//!
//! Tools are not compiled in. Each route has a JSON file of declarative tool
//! definitions; listing a route reloads that file, and calling a tool binds
//! the caller's arguments into the definition's HTTP request and sends it.
//!
//! ## Architecture
//!
//! - `definition.rs` - Tool and parameter definitions as stored on disk
//! - `source.rs` - Where definitions come from (`{route}_tools.json`)
//! - `registry.rs` - Per-route snapshots, swapped on every listing
//! - `template.rs` - `{{placeholder}}` and `{{env:NAME}}` binding
//! - `request.rs` - Concrete HTTP request built from a definition
//! - `invoker.rs` - Request execution and outcome normalization
//! - `schema.rs` - MCP tool descriptions and input schemas
//! - `route.rs` - Route resolution from inbound paths
//! - `service.rs` - List/call facade used by the server
//! - `error.rs` - Tool-specific error types

pub mod definition;
mod error;
pub mod invoker;
pub mod registry;
pub mod request;
pub mod route;
pub mod schema;
mod service;
pub mod source;
pub mod template;

pub use definition::{ParamConfig, ToolCatalog, ToolDefinition};
pub use error::ToolError;
pub use invoker::{HttpInvoker, InvocationResult};
pub use registry::{RouteRegistry, RouteTools};
pub use request::{HttpVerb, RequestSpec};
pub use route::{DEFAULT_MOUNT_PREFIX, DEFAULT_ROUTE, RouteContext};
pub use service::ToolService;
pub use source::{FileToolSource, ToolSource};
pub use template::{EnvLookup, ProcessEnv};
