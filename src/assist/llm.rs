//! Chat-completion client for an OpenAI-compatible endpoint.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::ResolvedSettings;
use crate::config::resolver::{LLM_TOKEN_ENV, process_env, resolve_github_token};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A model that answers one system + user prompt pair.
pub trait ChatModel: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// `POST <endpoint>/chat/completions` client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
}

impl ChatClient {
    pub fn new(endpoint: &str, model: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("logpilot/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Assist(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            token: token.trim().to_string(),
        })
    }

    /// Build the client from resolved settings.
    ///
    /// Returns `None` when the model is disabled or no token is available:
    /// `LOGPILOT_LLM_TOKEN` first, then the GitHub token.
    pub fn from_settings(settings: &ResolvedSettings) -> Option<Self> {
        if !settings.llm_enabled.value {
            tracing::debug!("chat model disabled in settings");
            return None;
        }
        let token = match process_env(LLM_TOKEN_ENV) {
            Some(token) => token,
            None => match resolve_github_token(&process_env) {
                Ok(resolved) => resolved.value,
                Err(e) => {
                    tracing::info!("chat model unavailable: {}", e);
                    return None;
                }
            },
        };
        match Self::new(&settings.llm_endpoint.value, &settings.llm_model.value, &token) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("chat model unavailable: {}", e);
                None
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatModel for ChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        tracing::debug!(model = %self.model, prompt_len = user.len(), "chat completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Assist(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Assist(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Assist(format!("unreadable response: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        tracing::debug!(response_len = content.len(), "chat completion done");
        Ok(content)
    }
}

/// Pull the JSON part out of a model answer that may wrap it in a code block
/// or surround it with prose.
pub fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return text[json_start..json_start + end].trim();
        }
    }
    if let Some(start) = text.find("```") {
        let json_start = start + 3;
        let json_start = text[json_start..]
            .find('\n')
            .map(|n| json_start + n + 1)
            .unwrap_or(json_start);
        if let Some(end) = text[json_start..].find("```") {
            return text[json_start..json_start + end].trim();
        }
    }
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            return &text[start..=end];
        }
    }
    text.trim()
}
