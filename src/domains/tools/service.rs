//! Tool service: the list/call facade used by the protocol layer.

use rmcp::model::{JsonObject, Tool};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::error::ToolError;
use super::invoker::{HttpInvoker, InvocationResult};
use super::registry::RouteRegistry;
use super::request::RequestSpec;
use super::route::RouteContext;
use super::schema::to_mcp_tool;
use super::source::{FileToolSource, ToolSource};
use super::template::{EnvLookup, ProcessEnv};
use crate::core::config::ToolsConfig;

/// Lists and invokes the declaratively configured tools of each route.
pub struct ToolService {
    registry: RouteRegistry,
    source: Arc<dyn ToolSource>,
    invoker: HttpInvoker,
    env: Arc<dyn EnvLookup>,
}

impl ToolService {
    /// Service reading tool files from the configured directory and
    /// resolving `{{env:...}}` from the process environment.
    pub fn new(config: &ToolsConfig) -> Self {
        info!(
            "Initializing ToolService (tool files in {})",
            config.directory.display()
        );
        Self::with_parts(
            Arc::new(FileToolSource::new(&config.directory)),
            HttpInvoker::new(),
            Arc::new(ProcessEnv),
        )
    }

    pub fn with_parts(
        source: Arc<dyn ToolSource>,
        invoker: HttpInvoker,
        env: Arc<dyn EnvLookup>,
    ) -> Self {
        Self {
            registry: RouteRegistry::new(),
            source,
            invoker,
            env,
        }
    }

    /// Reload the route's tools and describe them.
    ///
    /// Load failures are logged and never surfaced; the only error is
    /// cancellation.
    #[instrument(skip(self, cancel), fields(route = %route))]
    pub async fn list_tools(
        &self,
        route: &RouteContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tool>, ToolError> {
        let tools = self
            .registry
            .reload(route.route(), self.source.as_ref(), cancel)
            .await?;
        Ok(tools.iter().map(|tool| to_mcp_tool(tool)).collect())
    }

    /// Invoke the named tool of the route with the caller's arguments.
    ///
    /// Reads the snapshot left by the route's last listing; no HTTP request
    /// is made unless the tool is found.
    #[instrument(skip(self, arguments, cancel), fields(route = %route))]
    pub async fn call_tool(
        &self,
        route: &RouteContext,
        name: Option<&str>,
        arguments: Option<JsonObject>,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            warn!("Tool call without a tool name");
            return ToolError::MissingName.into();
        };

        let tool = match self.registry.lookup(route.route(), name).await {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Rejecting call to '{}': {}", name, e);
                return e.into();
            }
        };

        let arguments = arguments.unwrap_or_default();
        let spec = RequestSpec::build(&tool, &arguments, self.env.as_ref());
        self.invoker
            .invoke(&tool.name, spec, tool.timeout(), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definition::ToolDefinition;
    use async_trait::async_trait;
    use axum::{Router, body::Bytes, http::Uri, routing::any};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    /// Upstream that echoes the request and counts hits.
    async fn spawn_upstream(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new()
            .route(
                "/fail",
                any(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
            )
            .route(
                "/{*path}",
                any(move |uri: Uri, body: Bytes| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        axum::Json(json!({
                            "path": uri.path(),
                            "query": uri.query().unwrap_or(""),
                            "body": String::from_utf8_lossy(&body),
                        }))
                    }
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn service_for(dir: &TempDir, env: HashMap<String, String>) -> ToolService {
        ToolService::with_parts(
            Arc::new(FileToolSource::new(dir.path())),
            HttpInvoker::new(),
            Arc::new(env),
        )
    }

    fn write_tools(dir: &TempDir, route: &str, document: Value) {
        fs::write(
            dir.path().join(format!("{route}_tools.json")),
            document.to_string(),
        )
        .unwrap();
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[tokio::test]
    async fn test_list_and_call_round_trip() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_upstream(hits.clone()).await;
        let dir = TempDir::new().unwrap();
        write_tools(
            &dir,
            "crm",
            json!({"tools": [
                {
                    "name": "echo",
                    "httpMethod": "GET",
                    "endpoint": format!("{base}/api?name={{{{n}}}}"),
                    "parameterMappings": {"n": {"type": "string", "required": true}}
                },
                {
                    "name": "create",
                    "httpMethod": "POST",
                    "endpoint": format!("{base}/items"),
                    "bodyTemplate": "{\"id\":\"{{id}}\"}"
                },
                {"name": "hidden", "enabled": false, "endpoint": format!("{base}/hidden")}
            ]}),
        );
        let service = service_for(&dir, HashMap::new());
        let route = RouteContext::new("crm");
        let cancel = CancellationToken::new();

        let listed = service.list_tools(&route, &cancel).await.unwrap();
        let names: Vec<_> = listed.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["echo", "create"]);
        assert_eq!(listed[0].input_schema["required"], json!(["n"]));

        let result = service
            .call_tool(&route, Some("echo"), args(json!({"n": "bob"})), &cancel)
            .await;
        assert!(!result.is_error, "{}", result.text);
        assert_eq!(result.payload["path"], "/api");
        assert_eq!(result.payload["query"], "name=bob");

        let result = service
            .call_tool(&route, Some("create"), args(json!({"id": "42"})), &cancel)
            .await;
        assert!(!result.is_error, "{}", result.text);
        assert_eq!(result.payload["body"], r#"{"id":"42"}"#);

        let result = service.call_tool(&route, Some("hidden"), None, &cancel).await;
        assert!(result.is_error);
        assert_eq!(result.text, "Tool 'hidden' not found.");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_call_fails_fast_without_network() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_upstream(hits.clone()).await;
        let dir = TempDir::new().unwrap();
        write_tools(&dir, "crm", json!({"tools": [{"name": "echo", "endpoint": base}]}));
        let service = service_for(&dir, HashMap::new());
        let route = RouteContext::new("crm");
        let cancel = CancellationToken::new();

        // Before any listing the route does not exist.
        let result = service.call_tool(&route, Some("echo"), None, &cancel).await;
        assert!(result.is_error);
        assert_eq!(result.text, "No tools configured for route 'crm'.");

        service.list_tools(&route, &cancel).await.unwrap();

        for name in [None, Some(""), Some("   ")] {
            let result = service.call_tool(&route, name, None, &cancel).await;
            assert!(result.is_error);
            assert_eq!(result.text, "Tool name is required.");
        }

        let result = service.call_tool(&route, Some("missing"), None, &cancel).await;
        assert!(result.is_error);
        assert_eq!(result.text, "Tool 'missing' not found.");
        assert_eq!(result.payload, json!("Tool 'missing' not found."));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_absent_source_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let service = service_for(&dir, HashMap::new());
        let listed = service
            .list_tools(&RouteContext::new("ghost"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_source_keeps_previous_tools() {
        let dir = TempDir::new().unwrap();
        write_tools(&dir, "crm", json!({"tools": [{"name": "a"}]}));
        let service = service_for(&dir, HashMap::new());
        let route = RouteContext::new("crm");
        let cancel = CancellationToken::new();

        assert_eq!(service.list_tools(&route, &cancel).await.unwrap().len(), 1);

        fs::write(dir.path().join("crm_tools.json"), "{ broken").unwrap();
        let listed = service.list_tools(&route, &cancel).await.unwrap();
        let names: Vec<_> = listed.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[tokio::test]
    async fn test_listing_reloads_source() {
        let dir = TempDir::new().unwrap();
        write_tools(&dir, "crm", json!({"tools": [{"name": "a"}]}));
        let service = service_for(&dir, HashMap::new());
        let route = RouteContext::new("crm");
        let cancel = CancellationToken::new();

        service.list_tools(&route, &cancel).await.unwrap();
        write_tools(&dir, "crm", json!({"tools": [{"name": "a", "enabled": false}, {"name": "b"}]}));
        let listed = service.list_tools(&route, &cancel).await.unwrap();

        let names: Vec<_> = listed.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["b"]);
        let result = service.call_tool(&route, Some("a"), None, &cancel).await;
        assert_eq!(result.text, "Tool 'a' not found.");
    }

    #[tokio::test]
    async fn test_upstream_error_is_normalized() {
        let base = spawn_upstream(Arc::new(AtomicUsize::new(0))).await;
        let dir = TempDir::new().unwrap();
        write_tools(
            &dir,
            "ops",
            json!({"tools": [{"name": "boom", "httpMethod": "GET", "endpoint": format!("{base}/fail")}]}),
        );
        let service = service_for(&dir, HashMap::new());
        let route = RouteContext::new("ops");
        let cancel = CancellationToken::new();
        service.list_tools(&route, &cancel).await.unwrap();

        let result = service.call_tool(&route, Some("boom"), None, &cancel).await;
        assert!(result.is_error);
        assert!(result.text.contains("500"));
        assert!(result.text.contains("oops"));
    }

    #[tokio::test]
    async fn test_env_query_parameter_reaches_upstream() {
        let base = spawn_upstream(Arc::new(AtomicUsize::new(0))).await;
        let dir = TempDir::new().unwrap();
        write_tools(
            &dir,
            "ops",
            json!({"tools": [{
                "name": "keyed",
                "httpMethod": "GET",
                "endpoint": format!("{base}/keyed"),
                "queryParameters": {"key": "{{env:UPSTREAM_KEY}}", "q": "{{q}}"}
            }]}),
        );
        let env: HashMap<String, String> =
            [("UPSTREAM_KEY".to_string(), "k 1".to_string())].into_iter().collect();
        let service = service_for(&dir, env);
        let route = RouteContext::new("ops");
        let cancel = CancellationToken::new();
        service.list_tools(&route, &cancel).await.unwrap();

        let result = service
            .call_tool(&route, Some("keyed"), args(json!({"UPSTREAM_KEY": "nope"})), &cancel)
            .await;
        assert!(!result.is_error, "{}", result.text);
        assert_eq!(result.payload["query"], "key=k%201");
    }

    #[tokio::test]
    async fn test_cancelled_listing() {
        let dir = TempDir::new().unwrap();
        let service = service_for(&dir, HashMap::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .list_tools(&RouteContext::new("crm"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    /// A source that always fails, to check listing never surfaces load errors.
    struct BrokenSource;

    #[async_trait]
    impl ToolSource for BrokenSource {
        async fn load(&self, route: &str) -> Result<Option<Vec<ToolDefinition>>, ToolError> {
            Err(ToolError::source(route, "unreachable store"))
        }
    }

    #[tokio::test]
    async fn test_source_failure_is_not_surfaced() {
        let service = ToolService::with_parts(
            Arc::new(BrokenSource),
            HttpInvoker::new(),
            Arc::new(HashMap::<String, String>::new()),
        );
        let listed = service
            .list_tools(&RouteContext::new("crm"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
