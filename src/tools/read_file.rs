//! Read file tool - returns full file contents as text

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
enum ReadFileError {
    #[error("FileNotFound: {0}")]
    NotFound(String),
    #[error("PermissionDenied: {0}")]
    PermissionDenied(String),
    #[error("ToolExecutionError: {0}")]
    Io(String),
}

#[derive(Debug, Deserialize)]
struct Args {
    path: String,
}

pub struct ReadFileTool {
    working_dir: PathBuf,
}

impl ReadFileTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn read(&self, path: &str) -> Result<String, ReadFileError> {
        let requested = PathBuf::from(path);
        let full_path = if requested.is_absolute() {
            requested
        } else {
            self.working_dir.join(&requested)
        };

        std::fs::read_to_string(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReadFileError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                ReadFileError::PermissionDenied(path.to_string())
            }
            _ => ReadFileError::Io(e.to_string()),
        })
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read the contents of a given relative file path. Use this when you want to see what's inside a file. Do not use this with directory names.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The relative path of a file in the working directory."
                    }
                },
                "required": ["path"],
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

        match self.read(&args.path) {
            Ok(content) => ToolResult::success(content),
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
    async fn test_read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world\n").unwrap();

        let tool = ReadFileTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(json!({"path": "hello.txt"}), &test_ctx(dir.path()))
            .await;

        assert!(!result.is_error);
        assert_eq!(result.output, "hello world\n");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let tool = ReadFileTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(json!({"path": "nope.txt"}), &test_ctx(dir.path()))
            .await;

        assert!(result.is_error);
        assert!(result.output.starts_with("FileNotFound:"));
    }

    #[tokio::test]
    async fn test_missing_path_argument() {
        let dir = tempfile::tempdir().unwrap();

        let tool = ReadFileTool::new(dir.path().to_path_buf());
        let result = tool.execute(json!({}), &test_ctx(dir.path())).await;

        assert!(result.is_error);
        assert!(result.output.starts_with("InvalidArguments:"));
    }
}
