//! Per-route tool registry.
//!
//! Each route maps to an immutable [`RouteTools`] snapshot. A listing builds a
//! fresh snapshot from the route's source and publishes it with a single map
//! insert; calls clone the current `Arc` and never observe a half-built set.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::definition::ToolDefinition;
use super::error::ToolError;
use super::source::ToolSource;

// ============================================================================
// Route snapshot
// ============================================================================

/// The enabled tools of one route, in source order, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct RouteTools {
    tools: IndexMap<String, Arc<ToolDefinition>>,
}

impl RouteTools {
    /// Keep only enabled definitions. A later definition with the same name
    /// replaces an earlier one.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ToolDefinition>) -> Self {
        let tools = definitions
            .into_iter()
            .filter(|tool| tool.enabled)
            .map(|tool| (tool.name.clone(), Arc::new(tool)))
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDefinition>> {
        self.tools.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.tools.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Process-local map from route key to its current tool snapshot.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: RwLock<HashMap<String, Arc<RouteTools>>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload `route` from `source` and publish the result.
    ///
    /// An absent source publishes an empty set. A failing source is logged
    /// and leaves the current snapshot in place (creating an empty one on
    /// first use). Only cancellation is reported to the caller.
    #[instrument(skip(self, source, cancel))]
    pub async fn reload(
        &self,
        route: &str,
        source: &dyn ToolSource,
        cancel: &CancellationToken,
    ) -> Result<Arc<RouteTools>, ToolError> {
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            loaded = source.load(route) => loaded,
        };

        match loaded {
            Ok(Some(definitions)) => {
                let tools = RouteTools::from_definitions(definitions);
                info!("Loaded {} tools for route '{}'", tools.len(), route);
                Ok(self.publish(route, tools).await)
            }
            Ok(None) => {
                info!("No tool source for route '{}'", route);
                Ok(self.publish(route, RouteTools::default()).await)
            }
            Err(e) => {
                warn!("Keeping previous tools for route '{}': {}", route, e);
                Ok(self.current_or_empty(route).await)
            }
        }
    }

    /// Replace the snapshot for `route`.
    pub async fn publish(&self, route: &str, tools: RouteTools) -> Arc<RouteTools> {
        let tools = Arc::new(tools);
        self.routes
            .write()
            .await
            .insert(route.to_string(), Arc::clone(&tools));
        tools
    }

    /// Current snapshot for `route`, if any listing ever ran for it.
    pub async fn snapshot(&self, route: &str) -> Option<Arc<RouteTools>> {
        self.routes.read().await.get(route).cloned()
    }

    /// Find an enabled tool by name. Never reloads.
    pub async fn lookup(&self, route: &str, name: &str) -> Result<Arc<ToolDefinition>, ToolError> {
        let tools = self
            .snapshot(route)
            .await
            .ok_or_else(|| ToolError::unknown_route(route))?;
        tools
            .get(name)
            .filter(|tool| tool.enabled)
            .cloned()
            .ok_or_else(|| ToolError::not_found(name))
    }

    async fn current_or_empty(&self, route: &str) -> Arc<RouteTools> {
        let mut routes = self.routes.write().await;
        Arc::clone(routes.entry(route.to_string()).or_default())
    }
}
