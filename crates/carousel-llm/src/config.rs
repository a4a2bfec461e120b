//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use crate::types::{LLMConfigResponse, LLMProvider, ResolvedProvider};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// LLM configuration read from llm-config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    /// OpenAI-compatible hosted function (`{messages}` in, `{choices}` out).
    #[serde(default)]
    pub edge_function_url: Option<String>,
    #[serde(default)]
    pub edge_function_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    /// Model forwarded to the edge function; empty lets the function choose.
    #[serde(default)]
    pub edge_function_model: String,
    /// File the configuration was loaded from.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            edge_function_url: None,
            edge_function_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            edge_function_model: String::new(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for API keys
        if config.openai_api_key.is_none() {
            config.openai_api_key = env_key("OPENAI_API_KEY");
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = env_key("ANTHROPIC_API_KEY");
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = env_key("GROQ_API_KEY");
        }
        if config.edge_function_url.is_none() {
            config.edge_function_url = env_key("CAROUSEL_AI_FUNCTION_URL");
        }
        if config.edge_function_key.is_none() {
            config.edge_function_key = env_key("CAROUSEL_AI_FUNCTION_KEY");
        }

        config
    }

    fn edge_function(&self) -> Option<ResolvedProvider> {
        match (&self.edge_function_url, &self.edge_function_key) {
            (Some(url), Some(key)) => Some(ResolvedProvider {
                provider: LLMProvider::EdgeFunction,
                endpoint: url.clone(),
                model: self.edge_function_model.clone(),
                api_key: key.clone(),
            }),
            _ => None,
        }
    }

    fn anthropic(&self) -> Option<ResolvedProvider> {
        self.anthropic_api_key.as_ref().map(|k| ResolvedProvider {
            provider: LLMProvider::Anthropic,
            endpoint: ANTHROPIC_MESSAGES_URL.into(),
            model: self.anthropic_model.clone(),
            api_key: k.clone(),
        })
    }

    fn groq(&self) -> Option<ResolvedProvider> {
        self.groq_api_key.as_ref().map(|k| ResolvedProvider {
            provider: LLMProvider::Groq,
            endpoint: GROQ_CHAT_URL.into(),
            model: self.groq_model.clone(),
            api_key: k.clone(),
        })
    }

    fn openai(&self) -> Option<ResolvedProvider> {
        self.openai_api_key.as_ref().map(|k| ResolvedProvider {
            provider: LLMProvider::OpenAI,
            endpoint: OPENAI_CHAT_URL.into(),
            model: self.openai_model.clone(),
            api_key: k.clone(),
        })
    }

    /// Resolve which provider, endpoint and model to use.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "edge" => self.edge_function(),
                "anthropic" => self.anthropic(),
                "groq" => self.groq(),
                "openai" => self.openai(),
                _ => None,
            };
        }

        // Auto mode: edge function > Anthropic > Groq > OpenAI
        self.edge_function()
            .or_else(|| self.anthropic())
            .or_else(|| self.groq())
            .or_else(|| self.openai())
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        let resolved = self.resolve_provider();
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            edge_function_configured: self.edge_function().is_some(),
            active_provider: resolved.as_ref().map(|r| r.provider.to_string()),
            active_model: resolved.map(|r| r.model).filter(|m| !m.is_empty()),
        }
    }
}

fn env_key(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prefers_edge_function() {
        let config = LLMConfig {
            openai_api_key: Some("sk-openai".into()),
            anthropic_api_key: Some("sk-ant".into()),
            edge_function_url: Some("https://fn.example.com/ask-ai".into()),
            edge_function_key: Some("anon".into()),
            ..LLMConfig::default()
        };
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::EdgeFunction);
        assert_eq!(resolved.endpoint, "https://fn.example.com/ask-ai");
    }

    #[test]
    fn test_auto_order_without_edge() {
        let config = LLMConfig {
            openai_api_key: Some("sk-openai".into()),
            groq_api_key: Some("gsk".into()),
            ..LLMConfig::default()
        };
        assert_eq!(config.resolve_provider().unwrap().provider, LLMProvider::Groq);
    }

    #[test]
    fn test_edge_function_needs_url_and_key() {
        let config = LLMConfig {
            edge_function_url: Some("https://fn.example.com".into()),
            ..LLMConfig::default()
        };
        assert!(config.resolve_provider().is_none());
    }

    #[test]
    fn test_explicit_preference() {
        let config = LLMConfig {
            preferred_provider: "openai".into(),
            anthropic_api_key: Some("sk-ant".into()),
            ..LLMConfig::default()
        };
        assert!(config.resolve_provider().is_none());

        let config = LLMConfig {
            preferred_provider: "anthropic".into(),
            anthropic_api_key: Some("sk-ant".into()),
            ..LLMConfig::default()
        };
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.endpoint, ANTHROPIC_MESSAGES_URL);
        assert_eq!(resolved.model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(
            &path,
            r#"{"preferred_provider": "groq", "groq_api_key": "gsk", "groq_model": "llama-3.1-8b-instant"}"#,
        )
        .unwrap();

        let loaded = LLMConfig::load(&path);
        assert_eq!(loaded.preferred_provider, "groq");
        assert_eq!(loaded.config_path, path);
        let resolved = loaded.resolve_provider().unwrap();
        assert_eq!(resolved.model, "llama-3.1-8b-instant");
        assert_eq!(resolved.endpoint, GROQ_CHAT_URL);
        assert_eq!(loaded.anthropic_model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = LLMConfig::load(&dir.path().join("absent.json"));
        assert_eq!(loaded.preferred_provider, "auto");
        assert_eq!(loaded.openai_model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_response_hides_keys() {
        let config = LLMConfig {
            openai_api_key: Some("sk-secret".into()),
            ..LLMConfig::default()
        };
        let json = serde_json::to_string(&config.to_response()).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("\"activeProvider\":\"openai\""));
    }
}
