//! Conversation store
//!
//! Append-only ordered log of messages for one session. Messages are
//! immutable once appended and the log is discarded at process exit.
//!
//! Invariant: every tool call carried by an assistant message is answered
//! by exactly one tool message, in the order the calls were issued, before
//! the next model request. `Agent::execute_turn` maintains this, including
//! on cancellation.

use crate::provider::ToolCallRequest;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionToolType, FunctionCall,
};

/// A message could not be assembled for the wire format
#[derive(Debug, thiserror::Error)]
#[error("failed to build message: {0}")]
pub struct ConversationError(String);

/// Append-only message log
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatCompletionRequestMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in append order
    pub fn messages(&self) -> &[ChatCompletionRequestMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Discard the history (REPL `/clear`)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append a user message
    pub fn push_user(&mut self, text: &str) -> Result<(), ConversationError> {
        let msg = ChatCompletionRequestUserMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| ConversationError(e.to_string()))?;
        self.messages.push(ChatCompletionRequestMessage::User(msg));
        Ok(())
    }

    /// Append an assistant message that carries text only
    pub fn push_assistant_text(&mut self, text: &str) -> Result<(), ConversationError> {
        let msg = ChatCompletionRequestAssistantMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| ConversationError(e.to_string()))?;
        self.messages
            .push(ChatCompletionRequestMessage::Assistant(msg));
        Ok(())
    }

    /// Append an assistant message carrying tool calls (and optional text)
    pub fn push_assistant_tool_calls(
        &mut self,
        text: Option<&str>,
        calls: &[ToolCallRequest],
    ) -> Result<(), ConversationError> {
        let tool_calls: Vec<ChatCompletionMessageToolCall> = calls
            .iter()
            .map(|c| ChatCompletionMessageToolCall {
                id: c.id.clone(),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                },
            })
            .collect();

        let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
        builder.tool_calls(tool_calls);
        if let Some(text) = text {
            builder.content(text);
        }
        let msg = builder
            .build()
            .map_err(|e| ConversationError(e.to_string()))?;
        self.messages
            .push(ChatCompletionRequestMessage::Assistant(msg));
        Ok(())
    }

    /// Append one tool result, keyed by the originating call's id
    pub fn push_tool_result(
        &mut self,
        tool_call_id: &str,
        content: &str,
    ) -> Result<(), ConversationError> {
        let msg = ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(tool_call_id)
            .content(content.to_string())
            .build()
            .map_err(|e| ConversationError(e.to_string()))?;
        self.messages.push(ChatCompletionRequestMessage::Tool(msg));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn test_append_order_preserved() {
        let mut conv = Conversation::new();
        conv.push_user("hello").unwrap();
        conv.push_assistant_text("hi").unwrap();

        assert_eq!(conv.len(), 2);
        assert!(matches!(
            conv.messages()[0],
            ChatCompletionRequestMessage::User(_)
        ));
        assert!(matches!(
            conv.messages()[1],
            ChatCompletionRequestMessage::Assistant(_)
        ));
    }

    #[test]
    fn test_tool_results_follow_tool_calls() {
        let mut conv = Conversation::new();
        conv.push_user("do things").unwrap();
        conv.push_assistant_tool_calls(None, &[call("a", "read_file"), call("b", "bash")])
            .unwrap();
        conv.push_tool_result("a", "contents").unwrap();
        conv.push_tool_result("b", "output").unwrap();

        let tool_msgs: Vec<_> = conv
            .messages()
            .iter()
            .filter_map(|m| match m {
                ChatCompletionRequestMessage::Tool(t) => Some(t.tool_call_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tool_msgs, vec!["a", "b"]);
    }

    #[test]
    fn test_clear_discards_history() {
        let mut conv = Conversation::new();
        conv.push_user("hello").unwrap();
        conv.clear();
        assert!(conv.is_empty());
    }
}
