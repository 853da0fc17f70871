//! OpenAI-compatible provider client
//!
//! Wraps a single non-streaming chat completion exchange with tool support.
//! Transport, authentication and rate-limit failures all surface as
//! `ModelApiError` - fatal to the current turn, never to the session.

use super::ProviderConfig;
use crate::events::TokenUsage;
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionTool, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Upper bound on one model exchange so a hung endpoint cannot freeze the session
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Failure of the model exchange itself (network, auth, rate limit, timeout)
#[derive(Debug, thiserror::Error)]
pub enum ModelApiError {
    #[error("ModelAPIError: {0}")]
    Request(String),
    #[error("ModelAPIError: request timed out after {0}s")]
    Timeout(u64),
    #[error("ModelAPIError: malformed response: {0}")]
    MalformedResponse(String),
}

/// One tool call requested by the model
///
/// `arguments` is the raw JSON text as received; it is parsed at the
/// dispatch boundary so a malformed payload becomes an `InvalidArguments`
/// tool result instead of a loop failure.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Parsed model response: assistant text and/or an ordered list of tool calls
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Option<TokenUsage>,
}

/// Seam between the agent loop and the model API, so the loop can be
/// exercised with a scripted model in tests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelTurn, ModelApiError>;
}

/// OpenAI-compatible client wrapper
#[derive(Clone)]
pub struct ProviderClient {
    config: ProviderConfig,
    client: Client<OpenAIConfig>,
}

impl ProviderClient {
    /// Create a new provider client from config
    pub fn new(config: ProviderConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        let client = Client::with_config(openai_config);

        Self { config, client }
    }

    /// Get the provider config
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelTurn, ModelApiError> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(&self.config.model)
            .max_tokens(self.config.max_tokens)
            .messages(messages.to_vec());

        if !tools.is_empty() {
            request_builder.tools(tools.to_vec());
        }

        let request = request_builder
            .build()
            .map_err(|e| ModelApiError::Request(format!("failed to build request: {}", e)))?;

        let start = Instant::now();
        tracing::debug!(
            target: "llm",
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "sending chat completion request"
        );

        let response = tokio::time::timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| ModelApiError::Timeout(REQUEST_TIMEOUT_SECS))?
        .map_err(|e| ModelApiError::Request(e.to_string()))?;

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            input: u.prompt_tokens as u64,
            output: u.completion_tokens as u64,
        });

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelApiError::MalformedResponse("no choices in response".to_string()))?;

        let text = choice.message.content.filter(|c| !c.is_empty());

        // Preserve the order the model listed the calls in - dispatch must
        // answer them in exactly this order.
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            target: "llm",
            elapsed_ms = start.elapsed().as_millis() as u64,
            has_text = text.is_some(),
            tool_calls = tool_calls.len(),
            "chat completion response received"
        );

        Ok(ModelTurn {
            text,
            tool_calls,
            usage,
        })
    }
}
