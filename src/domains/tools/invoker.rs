//! Execution of bound tool requests and normalization of their outcome.
//!
//! Every outcome, success or failure, becomes an [`InvocationResult`]; the
//! invoker never returns an error to its caller.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use rmcp::model::{CallToolResult, Content};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::ToolError;
use super::request::RequestSpec;

// ============================================================================
// Invocation result
// ============================================================================

/// Uniform outcome of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub is_error: bool,

    /// Human-readable form: the raw response body, or the error message.
    pub text: String,

    /// Structured form: the parsed response body, or the error message.
    pub payload: Value,
}

impl InvocationResult {
    /// Successful call. The payload is the body parsed as JSON when it is
    /// valid JSON, and the raw text otherwise.
    pub fn success(body: String) -> Self {
        let payload =
            serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body.clone()));
        Self {
            is_error: false,
            text: body,
            payload,
        }
    }

    /// Failed call carrying `message` in both representations.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            is_error: true,
            payload: Value::String(message.clone()),
            text: message,
        }
    }

    /// Convert into the MCP protocol result.
    pub fn into_call_tool_result(self) -> CallToolResult {
        let content = vec![Content::text(self.text)];
        let mut result = if self.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        };
        result.structured_content = Some(self.payload);
        result
    }
}

impl From<ToolError> for InvocationResult {
    fn from(err: ToolError) -> Self {
        Self::failure(err.to_string())
    }
}

// ============================================================================
// Invoker
// ============================================================================

/// Sends tool requests over a shared HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `spec` for the tool named `tool_name`.
    ///
    /// The request is abandoned when `timeout` elapses or `cancel` fires.
    #[instrument(skip_all, fields(tool = %tool_name, method = %spec.verb))]
    pub async fn invoke(
        &self,
        tool_name: &str,
        spec: RequestSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        info!("Invoking tool '{}' at {} with method {}", tool_name, spec.url, spec.verb);
        if let Some(body) = &spec.body {
            debug!("Request body: {}", body.text);
        }

        let Some(request) = self.prepare(tool_name, spec, timeout) else {
            return InvocationResult::failure(format!(
                "Error invoking tool '{}': invalid HTTP method",
                tool_name
            ));
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Invocation of '{}' cancelled", tool_name);
                return InvocationResult::failure(format!(
                    "Error invoking tool '{}': cancelled - {}",
                    tool_name,
                    ToolError::Cancelled
                ));
            }
            outcome = send(request) => outcome,
        };

        match outcome {
            Ok((status, body)) => {
                info!("Response status: {}", status);
                debug!("Response content: {}", body);
                if status.is_success() {
                    InvocationResult::success(body)
                } else {
                    InvocationResult::failure(format!(
                        "Error invoking tool '{}': {} - {}",
                        tool_name, status, body
                    ))
                }
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", timeout.as_secs())
                } else {
                    "request failed".to_string()
                };
                warn!("Tool '{}' {}: {}", tool_name, reason, e);
                InvocationResult::failure(format!(
                    "Error invoking tool '{}': {} - {}",
                    tool_name, reason, e
                ))
            }
        }
    }

    fn prepare(
        &self,
        tool_name: &str,
        spec: RequestSpec,
        timeout: Duration,
    ) -> Option<reqwest::RequestBuilder> {
        let Some(method) = spec.verb.to_method() else {
            warn!("Tool '{}' has invalid HTTP method '{}'", tool_name, spec.verb);
            return None;
        };

        let mut request = self.client.request(method, spec.url.as_str()).timeout(timeout);
        for (name, value) in &spec.headers {
            request = add_header(request, name, value);
        }

        if let Some(body) = spec.body {
            request = request.header(CONTENT_TYPE, body.content_type.as_ref());
            for (name, value) in &body.headers {
                // The client computes the length of the body it sends.
                if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
                    debug!("Ignoring configured Content-Length header");
                    continue;
                }
                request = add_header(request, name, value);
            }
            request = request.body(body.text);
        }

        Some(request)
    }
}

async fn send(request: reqwest::RequestBuilder) -> reqwest::Result<(reqwest::StatusCode, String)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

/// Append a header, skipping names or values the HTTP stack cannot carry.
fn add_header(
    request: reqwest::RequestBuilder,
    name: &str,
    value: &str,
) -> reqwest::RequestBuilder {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => request.header(name, value),
        _ => {
            warn!("Skipping header '{}' that cannot be sent", name);
            request
        }
    }
}
