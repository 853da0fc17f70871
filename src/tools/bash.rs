//! Bash tool - executes shell commands
//!
//! A non-zero exit code is part of the command's output, not a tool error:
//! execution succeeded, the command failed, and the model gets to see both
//! the output and the code. Tool-level errors are reserved for failing to
//! run the command at all (spawn failure, timeout, cancellation).

use crate::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::process::Stdio;
use tokio::process::Command;

const TIMEOUT_SECS: u64 = 30;
const MAX_OUTPUT_LENGTH: usize = 30_000;

#[derive(Debug, Deserialize)]
struct Args {
    command: String,
}

pub struct BashTool;

impl BashTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "bash".to_string(),
            description: "Execute a bash command and return its output. Use this to run shell commands. Stdout and stderr are captured together and the exit code is reported when non-zero. Commands are killed after 30 seconds.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The bash command to execute."
                    }
                },
                "required": ["command"],
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

        let child = match Command::new("bash")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&ctx.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ToolResult::error(format!("ToolExecutionError: failed to spawn: {}", e))
            }
        };

        let timeout = std::time::Duration::from_secs(TIMEOUT_SECS);

        // kill_on_drop reaps the child on the timeout and cancellation paths
        let output = tokio::select! {
            biased;

            _ = ctx.cancellation.cancelled() => {
                return ToolResult::error("Cancelled");
            }

            _ = tokio::time::sleep(timeout) => {
                return ToolResult::error(format!(
                    "Timeout: command did not finish within {}s",
                    TIMEOUT_SECS
                ));
            }

            result = child.wait_with_output() => {
                match result {
                    Ok(output) => output,
                    Err(e) => {
                        return ToolResult::error(format!(
                            "ToolExecutionError: failed to collect output: {}",
                            e
                        ))
                    }
                }
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let mut combined = stdout.to_string();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        if combined.len() > MAX_OUTPUT_LENGTH {
            combined.truncate(MAX_OUTPUT_LENGTH);
            combined.push_str("\n\n(Output truncated due to length limit)");
        }

        if exit_code != 0 {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&format!("Exit code: {}", exit_code));
        }

        ToolResult::success(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;

    fn test_ctx() -> ToolContext {
        ToolContext::new(PathBuf::from("/tmp"), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_bash_echo() {
        let tool = BashTool::new();
        let result = tool
            .execute(json!({"command": "echo hi"}), &test_ctx())
            .await;

        assert!(!result.is_error);
        assert!(result.output.contains("hi"));
        assert!(!result.output.contains("Exit code"));
    }

    #[tokio::test]
    async fn test_bash_nonzero_exit_is_not_an_error() {
        let tool = BashTool::new();
        let result = tool
            .execute(json!({"command": "echo before; exit 42"}), &test_ctx())
            .await;

        assert!(!result.is_error);
        assert!(result.output.contains("before"));
        assert!(result.output.contains("Exit code: 42"));
    }

    #[tokio::test]
    async fn test_bash_captures_stderr() {
        let tool = BashTool::new();
        let result = tool
            .execute(json!({"command": "echo oops >&2"}), &test_ctx())
            .await;

        assert!(!result.is_error);
        assert!(result.output.contains("oops"));
    }

    #[tokio::test]
    async fn test_bash_working_dir() {
        let tool = BashTool::new();
        let result = tool.execute(json!({"command": "pwd"}), &test_ctx()).await;

        assert!(!result.is_error);
        assert!(result.output.contains("/tmp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bash_timeout() {
        let tool = BashTool::new();
        let result = tool
            .execute(json!({"command": "sleep 300"}), &test_ctx())
            .await;

        assert!(result.is_error);
        assert!(result.output.starts_with("Timeout:"));
    }

    #[tokio::test]
    async fn test_bash_cancellation() {
        let tool = BashTool::new();
        let cancel = CancellationToken::new();
        let ctx = ToolContext::new(PathBuf::from("/tmp"), cancel.clone());

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let result = tool.execute(json!({"command": "sleep 10"}), &ctx).await;

        assert!(result.is_error);
        assert_eq!(result.output, "Cancelled");
    }

    #[tokio::test]
    async fn test_bash_truncates_long_output() {
        let tool = BashTool::new();
        let result = tool
            .execute(json!({"command": "yes x | head -c 40000"}), &test_ctx())
            .await;

        assert!(!result.is_error);
        assert!(result.output.len() < 40_000);
        assert!(result.output.contains("truncated"));
    }
}
