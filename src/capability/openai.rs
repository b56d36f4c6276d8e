use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::capability::{GenerateTextRequest, LlmClient};
use crate::core::config::ResearchLoopConfig;

/// Text generation against any OpenAI-compatible `chat/completions`
/// endpoint. Point `OPENAI_BASE_URL` at a local server for key-less
/// inference.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: &ResearchLoopConfig) -> Self {
        Self {
            http,
            base_url: config.resolve_base_url(),
            api_key: config.resolve_api_key().filter(|k| !k.is_empty()),
            default_model: config.resolve_model(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate_text(&self, req: GenerateTextRequest<'_>) -> Result<String> {
        let model = if req.model.trim().is_empty() {
            self.default_model.as_str()
        } else {
            req.model
        };
        let mut body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": req.prompt }],
        });
        if let Some(max_tokens) = req.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("llm endpoint returned HTTP {}", status));
        }

        let payload: Value = response.json().await?;
        payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("llm response carried no message content"))
    }
}
