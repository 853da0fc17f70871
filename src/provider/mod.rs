//! LLM provider layer
//!
//! OpenAI-compatible provider that handles chat completions with tools.
//! One request/response exchange per call; the agent loop drives repetition.

mod client;
mod config;

pub use client::*;
pub use config::*;
