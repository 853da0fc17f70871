//! List files tool - flat listing of a directory's immediate entries
//!
//! Directories are suffixed with '/'. Output order is lexicographic so two
//! calls on an unchanged directory return identical text.

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
enum ListFilesError {
    #[error("FileNotFound: {0}")]
    NotFound(String),
    #[error("NotADirectory: {0}")]
    NotADirectory(String),
    #[error("PermissionDenied: {0}")]
    PermissionDenied(String),
    #[error("ToolExecutionError: {0}")]
    Io(String),
}

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default)]
    path: Option<String>,
}

pub struct ListFilesTool {
    working_dir: PathBuf,
}

impl ListFilesTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn resolve_path(&self, path: Option<&str>) -> PathBuf {
        match path {
            Some(p) if !p.is_empty() && p != "." => {
                let pb = PathBuf::from(p);
                if pb.is_absolute() {
                    pb
                } else {
                    self.working_dir.join(pb)
                }
            }
            _ => self.working_dir.clone(),
        }
    }

    fn list(&self, path: Option<&str>) -> Result<String, ListFilesError> {
        let display = path.unwrap_or(".").to_string();
        let dir = self.resolve_path(path);

        if !dir.exists() {
            return Err(ListFilesError::NotFound(display));
        }
        if !dir.is_dir() {
            return Err(ListFilesError::NotADirectory(display));
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ListFilesError::PermissionDenied(display),
            _ => ListFilesError::Io(e.to_string()),
        })?;

        let mut items: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        items.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut lines = Vec::with_capacity(items.len());
        for entry in items {
            let name = entry.file_name().to_string_lossy().to_string();
            let suffix = if entry.path().is_dir() { "/" } else { "" };
            lines.push(format!("{}{}", name, suffix));
        }

        if lines.is_empty() {
            return Ok("(empty directory)".to_string());
        }

        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_files".to_string(),
            description: "List files and directories at a given path. If no path is provided, lists files in the current directory. Directories are shown with a trailing '/'.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Optional relative path to list files from. Defaults to current directory if not provided."
                    }
                },
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        if ctx.is_cancelled() {
            return ToolResult::error("Cancelled");
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("InvalidArguments: {}", e)),
        };

        match self.list(args.path.as_deref()) {
            Ok(listing) => ToolResult::success(listing),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn test_ctx(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(dir.to_path_buf(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_list_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool.execute(json!({}), &test_ctx(dir.path())).await;

        assert!(!result.is_error);
        assert_eq!(result.output, "a.txt\nb.txt\nsub/");
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x"), "").unwrap();
        std::fs::write(dir.path().join("y"), "").unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let first = tool.execute(json!({}), &test_ctx(dir.path())).await;
        let second = tool.execute(json!({}), &test_ctx(dir.path())).await;

        assert_eq!(first.output, second.output);
    }

    #[tokio::test]
    async fn test_list_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("nested.txt"), "").unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool.execute(json!({}), &test_ctx(dir.path())).await;

        assert!(!result.output.contains("nested.txt"));
    }

    #[tokio::test]
    async fn test_list_missing_path() {
        let dir = tempfile::tempdir().unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(json!({"path": "missing"}), &test_ctx(dir.path()))
            .await;

        assert!(result.is_error);
        assert!(result.output.starts_with("FileNotFound:"));
    }

    #[tokio::test]
    async fn test_list_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), "x").unwrap();

        let tool = ListFilesTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(json!({"path": "plain.txt"}), &test_ctx(dir.path()))
            .await;

        assert!(result.is_error);
        assert!(result.output.starts_with("NotADirectory:"));
    }
}
