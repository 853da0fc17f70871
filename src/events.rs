//! Agent event types
//!
//! Events are emitted by the agent during a turn and consumed by output
//! adapters (the CLI). This is the only way the loop communicates progress
//! with the outside world.

use serde::Serialize;

/// Events emitted during agent execution
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Turn started (entering the loop)
    TurnStart,

    /// Complete text block from the model
    TextComplete { text: String },

    /// Tool call started
    ToolCallStart {
        call_id: String,
        tool: String,
        arguments: serde_json::Value,
    },

    /// Tool call completed
    ToolCallEnd {
        call_id: String,
        tool: String,
        output: String,
        is_error: bool,
        duration_ms: u64,
    },

    /// Token usage reported by the model
    Usage { input_tokens: u64, output_tokens: u64 },

    /// Turn completed (exiting the loop)
    TurnComplete { reason: TurnCompleteReason },

    /// Turn was cancelled
    Cancelled,
}

/// Reason the turn completed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnCompleteReason {
    /// Model responded with text only (no tool calls)
    TextResponse,
    /// Max iterations reached
    MaxIterations,
    /// Cancelled by user
    Cancelled,
}

/// Result of a single turn (returned by `Agent::execute_turn`)
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Final text output from this turn (if any)
    pub text: Option<String>,
    /// Tool calls that were executed or synthesized
    pub tool_calls: Vec<ExecutedToolCall>,
    /// Why the turn ended
    pub reason: TurnCompleteReason,
    /// Token usage
    pub usage: TokenUsage,
}

/// A tool call that was executed (or answered with a synthesized result)
#[derive(Debug, Clone)]
pub struct ExecutedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub output: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

/// Token usage for a turn
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}
