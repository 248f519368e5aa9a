//! Tool-specific error types.

use thiserror::Error;

/// Errors that can occur while resolving or loading tools.
///
/// The `Display` text of the caller-facing variants is what ends up in the
/// error result returned to the client, so it is phrased for humans.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The call request did not name a tool.
    #[error("Tool name is required.")]
    MissingName,

    /// No listing has ever populated this route.
    #[error("No tools configured for route '{0}'.")]
    UnknownRoute(String),

    /// The requested tool is not among the route's enabled tools.
    #[error("Tool '{0}' not found.")]
    NotFound(String),

    /// The declarative tool source for a route could not be read or parsed.
    #[error("Failed to load tools for route '{route}': {message}")]
    Source { route: String, message: String },

    /// The caller's cancellation signal fired before the operation completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ToolError {
    /// Create a new "unknown route" error.
    pub fn unknown_route(route: impl Into<String>) -> Self {
        Self::UnknownRoute(route.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new source loading error.
    pub fn source(route: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            route: route.into(),
            message: message.into(),
        }
    }
}
