//! Edit file tool - literal search/replace with file creation
//!
//! Matching is exact literal substring matching. The replacement only
//! happens when `old_str` occurs exactly once; zero matches and multiple
//! matches are both errors the model can recover from by supplying more
//! surrounding context. An empty `old_str` against a missing path creates
//! the file.
//!
//! Writes are atomic: content goes to a temp file in the same directory
//! and is renamed over the target, so a failed write never leaves a
//! half-written file behind.

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
enum EditFileError {
    #[error("NotFound: old_str not found in {0}")]
    OldStrNotFound(String),
    #[error("AmbiguousMatch: old_str found {count} times in {path}, must match exactly once. Provide more surrounding context to identify the correct occurrence.")]
    Ambiguous { path: String, count: usize },
    #[error("FileNotFound: {0}")]
    FileNotFound(String),
    #[error("InvalidArguments: {0}")]
    InvalidArguments(String),
    #[error("PermissionDenied: {0}")]
    PermissionDenied(String),
    #[error("ToolExecutionError: {0}")]
    Io(String),
}

#[derive(Debug, Deserialize)]
struct Args {
    path: String,
    old_str: String,
    new_str: String,
}

pub struct EditFileTool {
    working_dir: PathBuf,
}

impl EditFileTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let requested = PathBuf::from(path);
        if requested.is_absolute() {
            requested
        } else {
            self.working_dir.join(requested)
        }
    }

    /// Write content to a temp file in the target's directory, then rename
    fn atomic_write(path: &Path, content: &str) -> Result<(), EditFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    EditFileError::PermissionDenied(parent.display().to_string())
                }
                _ => EditFileError::Io(format!("failed to create parent directories: {}", e)),
            })?;
        }

        let temp_path = path.with_extension("tmp.magpie_edit");

        std::fs::write(&temp_path, content).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                EditFileError::PermissionDenied(path.display().to_string())
            }
            _ => EditFileError::Io(e.to_string()),
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            EditFileError::Io(format!("failed to rename temp file: {}", e))
        })?;

        Ok(())
    }

    fn apply(&self, args: &Args) -> Result<String, EditFileError> {
        if args.old_str == args.new_str {
            return Err(EditFileError::InvalidArguments(
                "old_str and new_str must be different".to_string(),
            ));
        }

        let path = self.resolve_path(&args.path);

        if args.old_str.is_empty() {
            if path.exists() {
                // Empty old_str would match everywhere in an existing file
                return Err(EditFileError::InvalidArguments(format!(
                    "old_str is empty but {} already exists",
                    args.path
                )));
            }
            Self::atomic_write(&path, &args.new_str)?;
            return Ok(format!("Created {}", args.path));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EditFileError::FileNotFound(args.path.clone()),
            std::io::ErrorKind::PermissionDenied => {
                EditFileError::PermissionDenied(args.path.clone())
            }
            _ => EditFileError::Io(e.to_string()),
        })?;

        let count = content.matches(&args.old_str).count();
        match count {
            0 => Err(EditFileError::OldStrNotFound(args.path.clone())),
            1 => {
                let new_content = content.replacen(&args.old_str, &args.new_str, 1);
                Self::atomic_write(&path, &new_content)?;
                Ok(format!("Edited {}: replaced 1 occurrence", args.path))
            }
            count => Err(EditFileError::Ambiguous {
                path: args.path.clone(),
                count,
            }),
        }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "edit_file".to_string(),
            description: "Make edits to a text file.\n\nReplaces 'old_str' with 'new_str' in the given file. 'old_str' must match exactly one location in the file; matching is exact and literal. 'old_str' and 'new_str' MUST be different from each other.\n\nIf 'old_str' is empty and the file specified with path doesn't exist, it will be created with 'new_str' as its content.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path to the file"
                    },
                    "old_str": {
                        "type": "string",
                        "description": "Text to search for - must match exactly and must only have one match exactly"
                    },
                    "new_str": {
                        "type": "string",
                        "description": "Text to replace old_str with"
                    }
                },
                "required": ["path", "old_str", "new_str"],
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

        match self.apply(&args) {
            Ok(confirmation) => ToolResult::success(confirmation),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
