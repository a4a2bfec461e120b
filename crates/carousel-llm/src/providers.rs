//! External LLM provider calls.
//!
//! OpenAI, Groq and the edge function share the chat-completions format.
//! Anthropic uses the Messages API and a separate system field.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::types::{ChatMessage, CompletionRequest, LLMProvider, ResolvedProvider};
use carousel_core::{Error, Result};

/// Prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Text generator backed by an HTTP provider.
pub struct HttpTextGenerator {
    client: Client,
    provider: ResolvedProvider,
    /// Set after the first request has logged its endpoint.
    endpoint_logged: AtomicBool,
}

impl HttpTextGenerator {
    pub fn new(client: Client, provider: ResolvedProvider) -> Self {
        Self {
            client,
            provider,
            endpoint_logged: AtomicBool::new(false),
        }
    }

    /// Generator for the configured provider, if any has credentials.
    pub fn from_config(client: Client, config: &LLMConfig) -> Option<Self> {
        config
            .resolve_provider()
            .map(|provider| Self::new(client, provider))
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider.provider
    }

    fn log_endpoint_once(&self) {
        if !self.endpoint_logged.swap(true, Ordering::Relaxed) {
            info!(
                "Text generation via {} at {} (model: {})",
                self.provider.provider,
                self.provider.endpoint,
                if self.provider.model.is_empty() {
                    "provider default"
                } else {
                    self.provider.model.as_str()
                }
            );
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.log_endpoint_once();

        let p = &self.provider;
        let builder = match p.provider {
            LLMProvider::Anthropic => self
                .client
                .post(&p.endpoint)
                .header("x-api-key", &p.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&anthropic_body(&request, &p.model)),
            LLMProvider::OpenAI | LLMProvider::Groq | LLMProvider::EdgeFunction => self
                .client
                .post(&p.endpoint)
                .header("Authorization", format!("Bearer {}", p.api_key))
                .json(&openai_body(&request, &p.model)),
        };

        debug!("Completion request to {} ({} messages)", p.provider, request.messages.len());

        let response = builder
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API error {}: {}", status, body)));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Malformed response: {}", e)))?;

        extract_content(p.provider, &parsed)
            .ok_or_else(|| Error::Generation("Response contained no message content".into()))
    }
}

/// Chat-completions body. An empty model is left to the endpoint.
pub fn openai_body(request: &CompletionRequest, model: &str) -> serde_json::Value {
    let msgs: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "messages": msgs,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if !model.is_empty() {
        body["model"] = json!(model);
    }
    body
}

/// Anthropic Messages body with the system prompt split out.
pub fn anthropic_body(request: &CompletionRequest, model: &str) -> serde_json::Value {
    let system_msg: Option<&ChatMessage> = request.messages.iter().find(|m| m.role == "system");
    let conv_msgs: Vec<serde_json::Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv_msgs,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if let Some(sys) = system_msg {
        body["system"] = json!(sys.content);
    }
    body
}

/// Pull the generated text out of a provider response.
pub fn extract_content(provider: LLMProvider, response: &serde_json::Value) -> Option<String> {
    let text = match provider {
        LLMProvider::Anthropic => response["content"]
            .as_array()?
            .iter()
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join(""),
        _ => response["choices"][0]["message"]["content"]
            .as_str()?
            .to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end().trim_end_matches("```").trim()
}
