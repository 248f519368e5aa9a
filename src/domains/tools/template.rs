//! Template binding for tool requests.
//!
//! Templates contain `{{key}}` placeholders. A template is tokenized once and
//! each placeholder is resolved on its own, so overlapping argument names
//! (`id` and `ids`) can never produce partial substitutions.
//!
//! Two binding modes exist:
//! - argument binding: `{{key}}` takes the stringified `arguments[key]`;
//!   unknown keys stay verbatim.
//! - value binding: if the text contains `{{env:`, every `{{env:VAR}}` span is
//!   replaced by the environment variable `VAR` (empty when unset) and
//!   arguments are not consulted at all. Otherwise it is argument binding.

use rmcp::model::JsonObject;
use serde_json::Value;
use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const ENV_MARKER: &str = "{{env:";
const ENV_PREFIX: &str = "env:";

/// Source of environment variables for `{{env:VAR}}` placeholders.
pub trait EnvLookup: Send + Sync {
    /// Value of the variable, or `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder { raw: &'a str, key: &'a str },
}

/// A tokenized template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Template<'a> {
    /// Split `text` into literal runs and `{{...}}` placeholders.
    ///
    /// A placeholder opens at the last `{{` before its closing `}}`, so
    /// `{{{x}}}` is a brace, the placeholder `x` and a brace. An opening
    /// `{{` with no matching `}}` is kept as literal text.
    pub fn parse(text: &'a str) -> Self {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(first_open) = rest.find(OPEN) {
            let search_from = first_open + OPEN.len();
            let Some(close) = rest[search_from..].find(CLOSE).map(|i| search_from + i) else {
                break;
            };
            let open = rest[..close].rfind(OPEN).unwrap_or(first_open);
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }
            let end = close + CLOSE.len();
            segments.push(Segment::Placeholder {
                raw: &rest[open..end],
                key: &rest[open + OPEN.len()..close],
            });
            rest = &rest[end..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Self { segments }
    }

    /// Whether the template has at least one placeholder.
    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder { .. }))
    }

    /// Render the template, replacing each placeholder whose key `resolve`
    /// knows and keeping the others verbatim.
    pub fn render<F>(&self, mut resolve: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { raw, key } => match resolve(key) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(raw),
                },
            }
        }
        out
    }
}

/// Substitute `{{key}}` placeholders from the call arguments.
pub fn bind_arguments(template: &str, arguments: &JsonObject) -> String {
    if arguments.is_empty() || !template.contains(OPEN) {
        return template.to_string();
    }
    Template::parse(template).render(|key| arguments.get(key).map(stringify))
}

/// Bind a query or header value: environment form if the value mentions
/// `{{env:`, argument form otherwise.
pub fn bind_value(template: &str, arguments: &JsonObject, env: &dyn EnvLookup) -> String {
    if uses_env(template) {
        bind_env(template, env)
    } else {
        bind_arguments(template, arguments)
    }
}

/// Whether a value is resolved purely from the environment.
pub fn uses_env(template: &str) -> bool {
    template.contains(ENV_MARKER)
}

fn bind_env(template: &str, env: &dyn EnvLookup) -> String {
    Template::parse(template).render(|key| {
        key.strip_prefix(ENV_PREFIX)
            .map(|name| env.var(name).unwrap_or_default())
    })
}

/// Text form of an argument value as it is spliced into templates.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
