//! Magpie - A turn-based LLM agent with tools
//!
//! This crate provides:
//! - An agent loop that lets a model chain tool calls until it produces a
//!   final text answer
//! - A set of filesystem and shell tools (read_file, list_files, bash,
//!   edit_file, code_search)
//! - CLI/REPL interface

pub mod agent;
pub mod config;
pub mod conversation;
pub mod events;
pub mod provider;
pub mod tool;
pub mod tools;

pub use agent::{Agent, AgentError};
pub use config::Config;
pub use conversation::Conversation;
pub use events::{AgentEvent, ExecutedToolCall, TokenUsage, TurnCompleteReason, TurnResult};
pub use provider::{ModelApiError, ModelClient, ModelTurn, ProviderClient, ProviderConfig, ToolCallRequest};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolRegistry, ToolResult};
