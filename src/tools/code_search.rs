//! Code search tool - searches code patterns with ripgrep
//!
//! Delegates matching to the external `rg` binary and parses its
//! `path:line_number:content` output into structured matches. ripgrep's
//! exit code 1 means "no matches" and is not an error; exit codes >= 2
//! signal a real failure.

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

const TIMEOUT_SECS: u64 = 30;
const MAX_MATCHES: usize = 50;

#[derive(Debug, thiserror::Error)]
enum CodeSearchError {
    #[error("ToolExecutionError: ripgrep (rg) not found. Please install ripgrep first.")]
    BinaryMissing,
    #[error("ToolExecutionError: search failed: {0}")]
    SearchFailed(String),
    #[error("Timeout: search did not finish within {0}s")]
    Timeout(u64),
}

#[derive(Debug, Deserialize)]
struct Args {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    case_sensitive: bool,
}

/// One `path:line:content` match from ripgrep's output
#[derive(Debug, Clone, PartialEq)]
struct SearchMatch {
    path: String,
    line_number: u64,
    content: String,
}

impl SearchMatch {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ':');
        let path = parts.next()?.to_string();
        let line_number = parts.next()?.parse().ok()?;
        let content = parts.next()?.to_string();
        Some(Self {
            path,
            line_number,
            content,
        })
    }
}

fn format_matches(matches: &[SearchMatch], total: usize) -> String {
    let mut lines: Vec<String> = matches
        .iter()
        .map(|m| format!("{}:{}:{}", m.path, m.line_number, m.content))
        .collect();

    if total > matches.len() {
        lines.push(format!(
            "... (showing first {} of {} matches)",
            matches.len(),
            total
        ));
    }

    lines.join("\n")
}

pub struct CodeSearchTool {
    working_dir: PathBuf,
}

impl CodeSearchTool {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn build_args(args: &Args) -> Vec<String> {
        let mut rg_args = vec![
            "--line-number".to_string(),
            "--with-filename".to_string(),
            "--color=never".to_string(),
        ];

        if !args.case_sensitive {
            rg_args.push("--ignore-case".to_string());
        }

        if let Some(ref file_type) = args.file_type {
            rg_args.push("--type".to_string());
            rg_args.push(file_type.clone());
        }

        rg_args.push(args.pattern.clone());
        rg_args.push(args.path.clone().unwrap_or_else(|| ".".to_string()));

        rg_args
    }

    async fn search(&self, args: &Args, ctx: &ToolContext) -> Result<String, CodeSearchError> {
        let rg = which::which("rg").map_err(|_| CodeSearchError::BinaryMissing)?;

        let child = Command::new(rg)
            .args(Self::build_args(args))
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CodeSearchError::SearchFailed(e.to_string()))?;

        let timeout = std::time::Duration::from_secs(TIMEOUT_SECS);

        let output = tokio::select! {
            biased;

            _ = ctx.cancellation.cancelled() => {
                return Err(CodeSearchError::SearchFailed("cancelled".to_string()));
            }

            _ = tokio::time::sleep(timeout) => {
                return Err(CodeSearchError::Timeout(TIMEOUT_SECS));
            }

            result = child.wait_with_output() => {
                result.map_err(|e| CodeSearchError::SearchFailed(e.to_string()))?
            }
        };

        match output.status.code() {
            // 1 = no matches, by ripgrep's contract
            Some(1) => return Ok("No matches found".to_string()),
            Some(0) => {}
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                return Err(CodeSearchError::SearchFailed(stderr));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let matches: Vec<SearchMatch> = stdout.lines().filter_map(SearchMatch::parse).collect();
        let total = matches.len();

        if total == 0 {
            return Ok("No matches found".to_string());
        }

        let capped = &matches[..total.min(MAX_MATCHES)];
        Ok(format_matches(capped, total))
    }
}

#[async_trait]
impl Tool for CodeSearchTool {
    fn name(&self) -> &str {
        "code_search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "code_search".to_string(),
            description: "Search for code patterns using ripgrep (rg).\n\nUse this to find code patterns, function definitions, variable usage, or any text in the codebase.\nYou can search by pattern, file type, or directory.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "The search pattern or regex to look for"
                    },
                    "path": {
                        "type": "string",
                        "description": "Optional path to search in (file or directory)"
                    },
                    "file_type": {
                        "type": "string",
                        "description": "Optional file type to limit search to (e.g., 'go', 'js', 'py')"
                    },
                    "case_sensitive": {
                        "type": "boolean",
                        "description": "Whether the search should be case sensitive (default: false)"
                    }
                },
                "required": ["pattern"],
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

        match self.search(&args, ctx).await {
            Ok(output) => ToolResult::success(output),
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

    #[test]
    fn test_parse_match_line() {
        let m = SearchMatch::parse("src/lib.rs:42:pub fn hello() {}").unwrap();
        assert_eq!(m.path, "src/lib.rs");
        assert_eq!(m.line_number, 42);
        assert_eq!(m.content, "pub fn hello() {}");
    }

    #[test]
    fn test_parse_match_line_with_colons_in_content() {
        let m = SearchMatch::parse("a.py:3:    x: int = 1").unwrap();
        assert_eq!(m.line_number, 3);
        assert_eq!(m.content, "    x: int = 1");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SearchMatch::parse("no separators here").is_none());
        assert!(SearchMatch::parse("file.rs:notanumber:text").is_none());
    }

    #[test]
    fn test_build_args_defaults() {
        let args = Args {
            pattern: "def ".to_string(),
            path: None,
            file_type: None,
            case_sensitive: false,
        };
        let rg_args = CodeSearchTool::build_args(&args);
        assert!(rg_args.contains(&"--ignore-case".to_string()));
        assert_eq!(rg_args.last().unwrap(), ".");
    }

    #[test]
    fn test_build_args_case_sensitive_with_type() {
        let args = Args {
            pattern: "Foo".to_string(),
            path: Some("src".to_string()),
            file_type: Some("py".to_string()),
            case_sensitive: true,
        };
        let rg_args = CodeSearchTool::build_args(&args);
        assert!(!rg_args.contains(&"--ignore-case".to_string()));
        let type_pos = rg_args.iter().position(|a| a == "--type").unwrap();
        assert_eq!(rg_args[type_pos + 1], "py");
        assert_eq!(rg_args.last().unwrap(), "src");
    }

    #[test]
    fn test_format_matches_truncation_notice() {
        let matches: Vec<SearchMatch> = (1..=3)
            .map(|i| SearchMatch {
                path: "f.rs".to_string(),
                line_number: i,
                content: "line".to_string(),
            })
            .collect();
        let out = format_matches(&matches[..2], 3);
        assert!(out.contains("showing first 2 of 3 matches"));
    }

    #[tokio::test]
    async fn test_search_single_python_def() {
        if which::which("rg").is_err() {
            return; // environment without ripgrep
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("only.py"),
            "import os\n\ndef main():\n    pass\n",
        )
        .unwrap();

        let tool = CodeSearchTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(
                json!({"pattern": "def ", "file_type": "py"}),
                &test_ctx(dir.path()),
            )
            .await;

        assert!(!result.is_error);
        let matches: Vec<&str> = result
            .output
            .lines()
            .filter(|l| l.contains("only.py"))
            .collect();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].contains(":3:"));
    }

    #[tokio::test]
    async fn test_search_no_matches_is_not_an_error() {
        if which::which("rg").is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "nothing interesting\n").unwrap();

        let tool = CodeSearchTool::new(dir.path().to_path_buf());
        let result = tool
            .execute(json!({"pattern": "zzz_absent_zzz"}), &test_ctx(dir.path()))
            .await;

        assert!(!result.is_error);
        assert_eq!(result.output, "No matches found");
    }
}
