//! Language-model backend for the generate endpoint.
//!
//! The prompt is built in `delve-core`; this module only moves text over
//! the wire (Anthropic Messages API) and parses the reply.

use std::time::Duration;

use async_trait::async_trait;
use delve_core::{GenerateRequest, GenerateResponse, build_prompt, parse_model_output};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::error::{NetError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL; `/v1/messages` is appended.
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 1500,
            timeout_secs: 60,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one user-turn prompt, return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn model_id(&self) -> &str;
}

pub struct AnthropicModel {
    config: ModelConfig,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl AnthropicModel {
    pub fn new(config: ModelConfig, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }

    /// Read the key from the variable named by `config.api_key_env`.
    pub fn from_env(config: ModelConfig) -> Result<Self> {
        let key = std::env::var(&config.api_key_env).ok();
        Self::new(config, key)
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NetError::MissingCredentials(self.config.api_key_env.clone()))?;

        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetError::Timeout(Duration::from_secs(self.config.timeout_secs))
                } else {
                    NetError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if status >= 400 {
            // Gateways answer with HTML or nothing; keep the status either way.
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "unknown API error".to_string());
            return Err(NetError::Status { status, message });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| NetError::Decode(e.to_string()))?;

        let text = json["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
            .and_then(|b| b["text"].as_str())
            .ok_or_else(|| NetError::Decode("reply has no text content block".into()))?;

        debug!(
            input_tokens = json["usage"]["input_tokens"].as_u64().unwrap_or(0),
            output_tokens = json["usage"]["output_tokens"].as_u64().unwrap_or(0),
            "model replied"
        );
        Ok(text.to_string())
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// One generate round trip: prompt, complete, parse.
pub async fn generate(
    model: &dyn LanguageModel,
    req: &GenerateRequest,
) -> Result<GenerateResponse> {
    let prompt = build_prompt(req);
    let text = model.complete(&prompt).await?;
    Ok(parse_model_output(&text)?)
}
