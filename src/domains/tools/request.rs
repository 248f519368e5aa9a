//! Request construction from a bound tool definition.

use mime::Mime;
use rmcp::model::JsonObject;
use std::fmt;
use tracing::warn;

use super::definition::ToolDefinition;
use super::template::{EnvLookup, bind_arguments, bind_value};

/// Header names that belong to the request body rather than the request.
pub const CONTENT_HEADER_NAMES: [&str; 9] = [
    "Content-Type",
    "Content-Length",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Location",
    "Content-MD5",
    "Expires",
    "Last-Modified",
];

/// Content type of every request body unless a tool overrides it.
pub const DEFAULT_BODY_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// ============================================================================
// HTTP verb
// ============================================================================

/// HTTP method of a tool. Anything unrecognized is carried as a custom verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Custom(String),
}

impl HttpVerb {
    /// Parse a method name, ignoring case and surrounding whitespace.
    pub fn parse(method: &str) -> Self {
        let method = method.trim().to_uppercase();
        match method.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => Self::Custom(method),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Custom(method) => method,
        }
    }

    /// Whether requests with this verb get the tool's body template.
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post)
    }

    /// Convert to a `reqwest` method. `None` only for custom names that are
    /// not valid HTTP tokens.
    pub fn to_method(&self) -> Option<reqwest::Method> {
        match self {
            Self::Get => Some(reqwest::Method::GET),
            Self::Post => Some(reqwest::Method::POST),
            Self::Put => Some(reqwest::Method::PUT),
            Self::Patch => Some(reqwest::Method::PATCH),
            Self::Delete => Some(reqwest::Method::DELETE),
            Self::Head => Some(reqwest::Method::HEAD),
            Self::Options => Some(reqwest::Method::OPTIONS),
            Self::Custom(method) => reqwest::Method::from_bytes(method.as_bytes()).ok(),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request spec
// ============================================================================

/// Body of an outbound request with its content-level headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub text: String,
    pub content_type: Mime,
    /// Content headers other than `Content-Type`.
    pub headers: Vec<(String, String)>,
}

/// A fully bound outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub verb: HttpVerb,
    pub url: String,
    /// Transport-level headers.
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestSpec {
    /// Build the request for `tool` with the caller's arguments.
    pub fn build(tool: &ToolDefinition, arguments: &JsonObject, env: &dyn EnvLookup) -> Self {
        let verb = tool.verb();
        let url = build_url(tool, arguments, env);

        let mut body = tool
            .body_template
            .as_deref()
            .filter(|template| verb.carries_body() && !template.trim().is_empty())
            .map(|template| RequestBody {
                text: bind_arguments(template, arguments),
                content_type: default_content_type(),
                headers: Vec::new(),
            });

        let mut headers = Vec::new();
        for (name, template) in &tool.headers {
            let value = bind_value(template, arguments, env);
            match body.as_mut() {
                Some(body) if is_content_header(name) => body.apply_header(name, value),
                _ => headers.push((name.clone(), value)),
            }
        }

        Self {
            verb,
            url,
            headers,
            body,
        }
    }
}

impl RequestBody {
    fn apply_header(&mut self, name: &str, value: String) {
        if !name.eq_ignore_ascii_case("Content-Type") {
            self.headers.push((name.to_string(), value));
            return;
        }
        match value.parse::<Mime>() {
            Ok(mime) => self.content_type = mime,
            Err(e) => warn!(
                "Ignoring unparseable Content-Type '{}': {}; keeping {}",
                value, e, self.content_type
            ),
        }
    }
}

fn default_content_type() -> Mime {
    DEFAULT_BODY_CONTENT_TYPE
        .parse()
        .unwrap_or(mime::APPLICATION_JSON)
}

/// Whether a header is routed to the body when one is present.
pub fn is_content_header(name: &str) -> bool {
    CONTENT_HEADER_NAMES
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn build_url(tool: &ToolDefinition, arguments: &JsonObject, env: &dyn EnvLookup) -> String {
    let mut url = bind_arguments(&tool.endpoint, arguments);

    let pairs: Vec<String> = tool
        .query_parameters
        .iter()
        .filter_map(|(key, template)| {
            let value = bind_value(template, arguments, env);
            // A value is only sent when binding actually produced something.
            (value != *template && !value.is_empty()).then(|| {
                format!(
                    "{}={}",
                    encode_query_component(key),
                    encode_query_component(&value)
                )
            })
        })
        .collect();

    if !pairs.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&pairs.join("&"));
    }
    url
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}
