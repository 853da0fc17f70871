//! Configuration for the agent
//!
//! One immutable `Config` is built at startup from the environment (via
//! dotenvy) plus CLI overrides, and passed into the provider client and
//! agent constructors. Nothing reads the environment after startup.

use crate::provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "glm-4.7";

/// Main configuration for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider configuration
    pub provider: ProviderConfig,

    /// Working directory for file operations
    pub working_dir: PathBuf,

    /// Print every tool call and result
    pub verbose: bool,
}

impl Config {
    /// Build configuration from the environment.
    ///
    /// Loads `.env` if present, then reads `BASE_URL`, `API_KEY` and
    /// `MODEL_NAME`. An API key is required (from `api_key_override` or the
    /// environment); the other two have defaults.
    pub fn from_env(working_dir: PathBuf, api_key_override: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = match api_key_override {
            Some(key) => key.to_string(),
            None => std::env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY not set in environment or .env file"))?,
        };

        Ok(Self {
            provider: ProviderConfig::new(base_url, api_key, model),
            working_dir,
            verbose: false,
        })
    }

    /// Set verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Override the model name
    pub fn with_model(mut self, model: &str) -> Self {
        self.provider.model = model.to_string();
        self
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.provider.base_url = base_url.to_string();
        self
    }

    /// Override the API key
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.provider.api_key = api_key.to_string();
        self
    }
}
