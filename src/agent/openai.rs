//! [`ChatModel`] over an OpenAI-compatible Chat Completions endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

use crate::agent::model::{ChatMessage, ChatModel, Completion, FinishReason, ToolDefinition};
use crate::config::ModelConfig;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, messages = messages.len(), tools = tools.len(), "POST chat completion");

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
        }

        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("HTTP request failed for {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(%status, body = %text, "chat completion error");
            anyhow::bail!("chat completion failed with HTTP {status}: {text}");
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .context("failed to parse chat completion response")?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("chat completion response had no choices")?;

        debug!(finish_reason = ?choice.finish_reason, tool_calls = choice.message.requested_tools().len(), "chat completion received");
        Ok(Completion {
            message: choice.message,
            finish_reason: choice.finish_reason,
        })
    }
}
