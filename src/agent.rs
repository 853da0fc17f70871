//! Agent - the turn-based orchestration loop
//!
//! One call to `execute_turn` runs the loop:
//! 1. Call the model with the full conversation and tool schemas
//! 2. Execute any tool calls, in the order received, strictly sequentially
//! 3. Append the results and repeat until the model answers with text only
//!
//! Tool failures are converted to error results and fed back to the model;
//! only model-API failures are fatal, and then only to the current turn.
//! The pairing invariant holds on every exit path: an assistant message
//! carrying N tool calls is always followed by exactly N tool results, in
//! matching order, with `Cancelled` results synthesized for calls that
//! never ran.

use crate::conversation::{Conversation, ConversationError};
use crate::events::{AgentEvent, ExecutedToolCall, TokenUsage, TurnCompleteReason, TurnResult};
use crate::provider::{ModelApiError, ModelClient, ToolCallRequest};
use crate::tool::{ToolContext, ToolRegistry, ToolResult};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Doom loop detection threshold - if 3 consecutive tool calls have the same
/// name and identical arguments, the model is likely stuck
const DOOM_LOOP_THRESHOLD: usize = 3;

/// Fatal failure of one turn. The session survives; the caller reports the
/// error and returns to the prompt.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelApiError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Tracks recent tool calls for doom loop detection
#[derive(Debug, Clone)]
struct ToolCallRecord {
    name: String,
    args_hash: u64,
}

impl ToolCallRecord {
    fn new(name: &str, args: &str) -> Self {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        args.hash(&mut hasher);
        Self {
            name: name.to_string(),
            args_hash: hasher.finish(),
        }
    }
}

fn is_doom_loop(recent_calls: &VecDeque<ToolCallRecord>) -> bool {
    if recent_calls.len() < DOOM_LOOP_THRESHOLD {
        return false;
    }
    let calls: Vec<_> = recent_calls.iter().rev().take(DOOM_LOOP_THRESHOLD).collect();
    let first = &calls[0];
    calls
        .iter()
        .all(|c| c.name == first.name && c.args_hash == first.args_hash)
}

/// The orchestrator. Owns the tool registry, drives the model client.
pub struct Agent {
    model: Arc<dyn ModelClient>,
    registry: ToolRegistry,
    working_dir: PathBuf,
    max_iterations: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelClient>, registry: ToolRegistry, working_dir: PathBuf) -> Self {
        Self {
            model,
            registry,
            working_dir,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn working_dir(&self) -> &PathBuf {
        &self.working_dir
    }

    /// Execute a full turn: loop until the model stops requesting tools,
    /// a fatal model error occurs, or the turn is cancelled.
    ///
    /// The caller appends the user message before calling this. Emits
    /// `AgentEvent`s through `event_tx` as it executes.
    pub async fn execute_turn(
        &self,
        conversation: &mut Conversation,
        event_tx: &mpsc::UnboundedSender<AgentEvent>,
        cancellation: CancellationToken,
    ) -> Result<TurnResult, AgentError> {
        let tools = self.registry.to_openai_tools();

        let mut total_usage = TokenUsage::default();
        let mut all_tool_calls: Vec<ExecutedToolCall> = vec![];
        let mut final_text: Option<String> = None;
        let mut recent_tool_calls: VecDeque<ToolCallRecord> =
            VecDeque::with_capacity(DOOM_LOOP_THRESHOLD + 1);

        let _ = event_tx.send(AgentEvent::TurnStart);

        for _iteration in 0..self.max_iterations {
            if cancellation.is_cancelled() {
                let _ = event_tx.send(AgentEvent::Cancelled);
                return Ok(TurnResult {
                    text: final_text,
                    tool_calls: all_tool_calls,
                    reason: TurnCompleteReason::Cancelled,
                    usage: total_usage,
                });
            }

            // No assistant message is appended yet, so aborting here leaves
            // the conversation without unanswered tool calls.
            let turn = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    let _ = event_tx.send(AgentEvent::Cancelled);
                    return Ok(TurnResult {
                        text: final_text,
                        tool_calls: all_tool_calls,
                        reason: TurnCompleteReason::Cancelled,
                        usage: total_usage,
                    });
                }
                result = self.model.complete(conversation.messages(), &tools) => result?,
            };

            if let Some(usage) = turn.usage {
                total_usage.input += usage.input;
                total_usage.output += usage.output;
                let _ = event_tx.send(AgentEvent::Usage {
                    input_tokens: usage.input,
                    output_tokens: usage.output,
                });
            }

            if let Some(ref text) = turn.text {
                let _ = event_tx.send(AgentEvent::TextComplete { text: text.clone() });
            }

            // No tool calls = terminal success path
            if turn.tool_calls.is_empty() {
                if let Some(ref text) = turn.text {
                    conversation.push_assistant_text(text)?;
                    final_text = Some(text.clone());
                }

                let _ = event_tx.send(AgentEvent::TurnComplete {
                    reason: TurnCompleteReason::TextResponse,
                });
                return Ok(TurnResult {
                    text: final_text,
                    tool_calls: all_tool_calls,
                    reason: TurnCompleteReason::TextResponse,
                    usage: total_usage,
                });
            }

            // The assistant message is appended with its tool calls even when
            // it carries no user-visible text.
            conversation.push_assistant_tool_calls(turn.text.as_deref(), &turn.tool_calls)?;
            if let Some(text) = turn.text {
                final_text = Some(text);
            }

            for (index, call) in turn.tool_calls.iter().enumerate() {
                // Cancellation observed between tool calls: answer this call
                // and every remaining one with a synthesized result so the
                // assistant message never has unanswered tool calls.
                if cancellation.is_cancelled() {
                    for outstanding in &turn.tool_calls[index..] {
                        conversation.push_tool_result(&outstanding.id, "Cancelled")?;
                        all_tool_calls.push(ExecutedToolCall {
                            id: outstanding.id.clone(),
                            name: outstanding.name.clone(),
                            arguments: serde_json::Value::Null,
                            output: "Cancelled".to_string(),
                            is_error: true,
                            duration_ms: 0,
                        });
                    }
                    let _ = event_tx.send(AgentEvent::Cancelled);
                    return Ok(TurnResult {
                        text: final_text,
                        tool_calls: all_tool_calls,
                        reason: TurnCompleteReason::Cancelled,
                        usage: total_usage,
                    });
                }

                let record = ToolCallRecord::new(&call.name, &call.arguments);
                recent_tool_calls.push_back(record);
                if recent_tool_calls.len() > DOOM_LOOP_THRESHOLD {
                    recent_tool_calls.pop_front();
                }

                let result = if is_doom_loop(&recent_tool_calls) {
                    // Give the model a fresh chance instead of executing the
                    // same call again
                    recent_tool_calls.clear();
                    let result = ToolResult::error(format!(
                        "ToolExecutionError: '{}' called {} times with identical arguments. \
                         You seem to be stuck. Try a different approach.",
                        call.name, DOOM_LOOP_THRESHOLD
                    ));
                    let args = serde_json::from_str(&call.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    self.emit_call_events(event_tx, call, args, &result, 0);
                    result
                } else {
                    self.dispatch(call, event_tx, &cancellation).await
                };

                conversation.push_tool_result(&call.id, &result.output)?;
                all_tool_calls.push(ExecutedToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: serde_json::from_str(&call.arguments)
                        .unwrap_or(serde_json::Value::Null),
                    output: result.output,
                    is_error: result.is_error,
                    duration_ms: 0,
                });
            }
        }

        let _ = event_tx.send(AgentEvent::TurnComplete {
            reason: TurnCompleteReason::MaxIterations,
        });
        Ok(TurnResult {
            text: final_text,
            tool_calls: all_tool_calls,
            reason: TurnCompleteReason::MaxIterations,
            usage: total_usage,
        })
    }

    /// Look up and invoke one tool. Every failure mode becomes an error
    /// result; nothing here can abort the loop.
    async fn dispatch(
        &self,
        call: &ToolCallRequest,
        event_tx: &mpsc::UnboundedSender<AgentEvent>,
        cancellation: &CancellationToken,
    ) -> ToolResult {
        let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => {
                let result =
                    ToolResult::error(format!("InvalidArguments: malformed JSON: {}", e));
                self.emit_call_events(event_tx, call, serde_json::Value::Null, &result, 0);
                return result;
            }
        };

        let Some(tool) = self.registry.get(&call.name) else {
            let result = ToolResult::error(format!("ToolNotFound: {}", call.name));
            self.emit_call_events(event_tx, call, args, &result, 0);
            return result;
        };

        let _ = event_tx.send(AgentEvent::ToolCallStart {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments: args.clone(),
        });

        let start = Instant::now();
        let ctx = ToolContext::new(self.working_dir.clone(), cancellation.clone());
        let result = tool.execute(args.clone(), &ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            target: "tool",
            tool = %call.name,
            is_error = result.is_error,
            duration_ms,
            "tool call finished"
        );

        let _ = event_tx.send(AgentEvent::ToolCallEnd {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            output: result.output.clone(),
            is_error: result.is_error,
            duration_ms,
        });

        result
    }

    fn emit_call_events(
        &self,
        event_tx: &mpsc::UnboundedSender<AgentEvent>,
        call: &ToolCallRequest,
        args: serde_json::Value,
        result: &ToolResult,
        duration_ms: u64,
    ) {
        let _ = event_tx.send(AgentEvent::ToolCallStart {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments: args,
        });
        let _ = event_tx.send(AgentEvent::ToolCallEnd {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            output: result.output.clone(),
            is_error: result.is_error,
            duration_ms,
        });
    }
}
