//! HTTP transport implementation.
//!
//! HTTP server with JSON-RPC over POST requests. The endpoint is mounted at
//! the configured path, and every path beneath it addresses one route:
//! `POST /mcp/billing` lists and calls the tools of route `billing`, while
//! `POST /mcp` uses the default route.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
};
use rmcp::model::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let mount = server.config().tools.mount_path.clone();
        let app = router(server, self.config.enable_cors);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {} (default route)", mount);
        info!("  → JSON-RPC: POST {}/{{route}}", mount.trim_end_matches('/'));
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Build the axum router serving `server`.
pub fn router(server: McpServer, enable_cors: bool) -> Router {
    let mount = server.config().tools.mount_path.clone();
    let base = mount.trim_end_matches('/');
    let routed = format!("{base}/{{route}}");

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route(&routed, post(handle_rpc));

    app = if base.is_empty() {
        app.route("/", get(root_handler).post(handle_rpc))
    } else {
        app.route(base, post(handle_rpc))
            .route("/", get(root_handler))
    };

    let mut app = app
        .with_state(server)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Root handler - provides API info.
async fn root_handler(State(server): State<McpServer>) -> impl IntoResponse {
    let mount = &server.config().tools.mount_path;
    Json(json!({
        "name": server.name(),
        "version": server.version(),
        "transport": "HTTP",
        "endpoints": {
            "rpc": mount,
            "routes": format!("{}/{{route}}", mount.trim_end_matches('/')),
            "health": "/health"
        },
        "defaultRoute": server.config().tools.default_route,
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle JSON-RPC requests on the mount path or one of its routes.
#[instrument(skip_all, fields(method, path = %uri.path()))]
async fn handle_rpc(
    State(server): State<McpServer>,
    uri: Uri,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    tracing::Span::current().record("method", &request.method);
    info!("Received JSON-RPC request: {}", request.method);

    match process_request(&server, uri.path(), request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Process a JSON-RPC request addressed to `path`.
///
/// Returns `None` for notifications, which get no response.
pub async fn process_request(
    server: &McpServer,
    path: &str,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::invalid_request(request.id));
    }

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(server, request),
        "ping" => JsonRpcResponse::success(request.id, json!({})),
        "tools/list" => handle_tools_list(server, path, request).await,
        "tools/call" => handle_tools_call(server, path, request).await,

        // Stateless HTTP has nothing to do for notifications
        method if method.starts_with("notifications/") => {
            info!("Received notification: {}", method);
            return None;
        }

        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    };
    Some(response)
}

fn handle_initialize(server: &McpServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let result = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": server.name(),
            "version": server.version()
        }
    });

    JsonRpcResponse::success(request.id, result)
}

async fn handle_tools_list(
    server: &McpServer,
    path: &str,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let route = server.route_for_path(Some(path));
    info!("Processing tools/list for route '{}'", route);

    match server
        .list_tools_for(&route, &CancellationToken::new())
        .await
    {
        Ok(tools) => JsonRpcResponse::success(request.id, json!({ "tools": tools })),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

async fn handle_tools_call(
    server: &McpServer,
    path: &str,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let route = server.route_for_path(Some(path));

    let params = request.params.unwrap_or_else(|| json!({}));
    let Some(params) = params.as_object() else {
        return JsonRpcResponse::invalid_params(request.id, "params must be an object");
    };

    let name = params.get("name").and_then(Value::as_str);
    let arguments: Option<JsonObject> = match params.get("arguments") {
        None | Some(Value::Null) => None,
        Some(Value::Object(arguments)) => Some(arguments.clone()),
        Some(_) => {
            return JsonRpcResponse::invalid_params(request.id, "arguments must be an object");
        }
    };
    info!(
        "Processing tools/call '{}' for route '{}'",
        name.unwrap_or_default(),
        route
    );

    let result = server
        .call_tool_for(&route, name, arguments, &CancellationToken::new())
        .await
        .into_call_tool_result();

    match serde_json::to_value(result) {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use std::fs;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    fn server_with_tools(dir: &TempDir) -> McpServer {
        let mut config = Config::default();
        config.tools.directory = dir.path().to_path_buf();
        McpServer::new(config)
    }

    fn rpc(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    async fn respond(server: &McpServer, path: &str, request: JsonRpcRequest) -> JsonRpcResponse {
        process_request(server, path, request)
            .await
            .expect("request expects a response")
    }

    fn tool_names(response: &JsonRpcResponse) -> Vec<String> {
        response.result.as_ref().unwrap()["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_routes_follow_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tools_tools.json"),
            r#"{"tools":[{"name":"default_tool"}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("crm_tools.json"),
            r#"{"tools":[{"name":"crm_tool"}]}"#,
        )
        .unwrap();
        let server = server_with_tools(&dir);

        let response = respond(&server, "/mcp", rpc("tools/list", json!({}))).await;
        assert_eq!(tool_names(&response), vec!["default_tool"]);

        let response = respond(&server, "/mcp/crm", rpc("tools/list", json!({}))).await;
        assert_eq!(tool_names(&response), vec!["crm_tool"]);
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_error_result() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("crm_tools.json"), r#"{"tools":[]}"#).unwrap();
        let server = server_with_tools(&dir);

        respond(&server, "/mcp/crm", rpc("tools/list", json!({}))).await;
        let response = respond(
            &server,
            "/mcp/crm",
            rpc("tools/call", json!({"name": "nope", "arguments": {}})),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Tool 'nope' not found.");
    }

    #[tokio::test]
    async fn test_call_without_name() {
        let server = server_with_tools(&TempDir::new().unwrap());
        let response = respond(&server, "/mcp", rpc("tools/call", json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Tool name is required.");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server_with_tools(&TempDir::new().unwrap());

        let response = respond(&server, "/mcp", rpc("resources/list", json!({}))).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let mut request = rpc("tools/list", json!({}));
        request.jsonrpc = "1.0".to_string();
        let response = respond(&server, "/mcp", request).await;
        assert_eq!(response.error.unwrap().code, -32600);

        let response = respond(
            &server,
            "/mcp",
            rpc("tools/call", json!({"name": "x", "arguments": [1]})),
        )
        .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server_with_tools(&TempDir::new().unwrap());
        let notification = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(process_request(&server, "/mcp", notification).await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_reports_tools_capability() {
        let server = server_with_tools(&TempDir::new().unwrap());
        let response = respond(&server, "/mcp", rpc("initialize", json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(result["serverInfo"]["name"], "dynamic-mcp-server");
    }

    #[tokio::test]
    async fn test_router_serves_route_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("crm_tools.json"),
            r#"{"tools":[{"name":"crm_tool"}]}"#,
        )
        .unwrap();
        let app = router(server_with_tools(&dir), false);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::new();
        let response: JsonRpcResponse = client
            .post(format!("http://{addr}/mcp/crm"))
            .json(&rpc("tools/list", json!({})))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(tool_names(&response), vec!["crm_tool"]);

        let accepted = client
            .post(format!("http://{addr}/mcp"))
            .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status(), reqwest::StatusCode::ACCEPTED);
        assert!(accepted.text().await.unwrap().is_empty());

        let health: Value = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");
    }
}
