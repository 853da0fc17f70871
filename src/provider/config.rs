//! Provider configuration

use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    /// API key
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Model name/ID
    pub model: String,
    /// Maximum tokens for a response
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
        }
    }
}
