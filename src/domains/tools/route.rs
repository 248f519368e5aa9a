//! Route resolution from inbound request paths.

/// Route used when a request carries no path (stdio clients).
pub const DEFAULT_ROUTE: &str = "tools";

/// Mount prefix stripped from inbound paths.
pub const DEFAULT_MOUNT_PREFIX: &str = "/mcp/";

/// Identifies the tool namespace a request operates on.
///
/// Passed explicitly into every list and call operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteContext {
    route: String,
}

impl RouteContext {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
        }
    }

    /// Derive the route from an inbound path.
    ///
    /// `/mcp/billing` becomes `billing`. A missing path, or one naming only
    /// the mount itself, yields `default_route`.
    pub fn from_path(path: Option<&str>, mount_prefix: &str, default_route: &str) -> Self {
        let Some(path) = path else {
            return Self::new(default_route);
        };

        let mount = mount_prefix.trim_end_matches('/');
        let rest = if path == mount {
            ""
        } else {
            path.strip_prefix(mount_prefix).unwrap_or(path)
        };

        match rest.trim_matches('/') {
            "" => Self::new(default_route),
            route => Self::new(route),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Default for RouteContext {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE)
    }
}

impl std::fmt::Display for RouteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.route)
    }
}
