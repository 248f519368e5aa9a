//! External declarative tool sources.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::definition::{ToolCatalog, ToolDefinition};
use super::error::ToolError;

/// Suffix appended to a route key to name its source file.
pub const TOOLS_FILE_SUFFIX: &str = "_tools.json";

/// Where a route's tool definitions come from.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Load every definition (enabled or not) for `route`.
    ///
    /// Returns `Ok(None)` when the route has no source at all.
    async fn load(&self, route: &str) -> Result<Option<Vec<ToolDefinition>>, ToolError>;
}

/// Reads `{directory}/{route}_tools.json`.
#[derive(Debug, Clone)]
pub struct FileToolSource {
    directory: PathBuf,
}

impl FileToolSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Path of the source file for `route`, or `None` if the route key could
    /// address anything outside the directory.
    pub fn path_for(&self, route: &str) -> Option<PathBuf> {
        let safe = !route.is_empty()
            && !route.contains(['/', '\\'])
            && !route.contains("..");
        safe.then(|| self.directory.join(format!("{route}{TOOLS_FILE_SUFFIX}")))
    }
}

#[async_trait]
impl ToolSource for FileToolSource {
    async fn load(&self, route: &str) -> Result<Option<Vec<ToolDefinition>>, ToolError> {
        let Some(path) = self.path_for(route) else {
            warn!("Route key '{}' is not a valid tool file name", route);
            return Ok(None);
        };

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No tool file at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(ToolError::source(
                    route,
                    format!("reading {}: {}", path.display(), e),
                ));
            }
        };

        let catalog = ToolCatalog::from_json_str(&text).map_err(|e| {
            ToolError::source(route, format!("parsing {}: {}", path.display(), e))
        })?;
        Ok(Some(catalog.tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_path_for_route() {
        let source = FileToolSource::new("/etc/tools");
        assert_eq!(
            source.path_for("billing"),
            Some(PathBuf::from("/etc/tools/billing_tools.json"))
        );
        assert_eq!(source.path_for(""), None);
        assert_eq!(source.path_for("../secrets"), None);
        assert_eq!(source.path_for("a/b"), None);
        assert_eq!(source.path_for("a\\b"), None);
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("crm_tools.json"),
            r#"{"tools":[{"name":"a"},{"name":"b","enabled":false}]}"#,
        )
        .unwrap();

        let tools = FileToolSource::new(dir.path())
            .load("crm")
            .await
            .unwrap()
            .expect("source present");
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let loaded = FileToolSource::new(dir.path()).load("nothing").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_unsafe_route_is_absent() {
        let dir = TempDir::new().unwrap();
        let loaded = FileToolSource::new(dir.path()).load("../x").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad_tools.json"), "{ nope").unwrap();

        let err = FileToolSource::new(dir.path()).load("bad").await.unwrap_err();
        assert!(matches!(err, ToolError::Source { ref route, .. } if route == "bad"));
    }
}
