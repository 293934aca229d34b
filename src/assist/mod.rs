//! AI-assisted log enrichment, TODO suggestions and summaries.
//!
//! Every operation works without a chat model: enrichment falls back to
//! replacing bare GitHub URLs with titled links, suggestions fall back to the
//! log's unchecked checklist items and summaries fall back to the collected
//! logs themselves.

pub mod enrich;
pub mod llm;
pub mod suggest;
pub mod summary;

pub use enrich::apply_fallback_enrichment;
pub use llm::{ChatClient, ChatModel};
pub use suggest::{SuggestionSource, Suggestions};
pub use summary::{MAX_SUMMARY_DAYS, NO_LOGS_MESSAGE};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::github::{GitHubProvider, LinkInfo, extract_github_urls};
use crate::models::LogDate;
use crate::storage::Store;
use crate::{Error, Result};

/// Chat model plus the GitHub access needed to resolve links.
pub struct Assistant<M = ChatClient> {
    model: Option<M>,
    github: Arc<GitHubProvider>,
    org: Option<String>,
}

impl<M: ChatModel> Assistant<M> {
    pub fn new(model: Option<M>, github: Arc<GitHubProvider>, org: Option<String>) -> Self {
        Self { model, github, org }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Resolve the GitHub links of `markdown`. Links that cannot be looked up
    /// (including when no token is available) are skipped.
    pub async fn lookup_links(&self, markdown: &str, config: &AppConfig) -> Vec<LinkInfo> {
        let urls = extract_github_urls(markdown, self.org.as_deref(), config);
        if urls.is_empty() {
            return Vec::new();
        }
        match self.github.client().await {
            Ok(client) => client.fetch_link_infos(&urls).await,
            Err(e) => {
                tracing::warn!("skipping link lookup: {}", e);
                Vec::new()
            }
        }
    }

    /// Ask the model, returning `None` on failure or an empty answer.
    async fn ask(&self, system: &str, user: &str) -> Option<String> {
        let model = self.model.as_ref()?;
        match model.complete(system, user).await {
            Ok(answer) if !answer.trim().is_empty() => Some(answer),
            Ok(_) => {
                tracing::warn!("chat model returned an empty answer");
                None
            }
            Err(e) => {
                tracing::warn!("chat model failed: {}", e);
                None
            }
        }
    }

    /// Rewrite a raw log with titled links, through the model when possible.
    pub async fn enrich(&self, raw: &str, config: &AppConfig) -> String {
        let links = self.lookup_links(raw, config).await;
        let prompt = enrich::enrich_user_prompt(raw, &links);
        match self.ask(enrich::ENRICH_SYSTEM_PROMPT, &prompt).await {
            Some(answer) => answer,
            None => apply_fallback_enrichment(raw, &links),
        }
    }

    /// Replace bare GitHub URLs with titled links. Never uses the model.
    pub async fn linkify(&self, raw: &str, config: &AppConfig) -> String {
        let links = self.lookup_links(raw, config).await;
        apply_fallback_enrichment(raw, &links)
    }

    /// Suggest follow-up TODOs for a log.
    pub async fn suggest(&self, log: &str) -> Suggestions {
        if log.trim().is_empty() {
            return Suggestions::empty();
        }
        if let Some(answer) = self.ask(suggest::SUGGEST_SYSTEM_PROMPT, log).await {
            return Suggestions {
                suggestions: suggest::parse_suggestions(&answer),
                source: SuggestionSource::Model,
            };
        }
        Suggestions {
            suggestions: suggest::fallback_suggestions(log),
            source: SuggestionSource::Fallback,
        }
    }

    /// Summarize day logs, or return them as-is when no model answers.
    pub async fn summarize(&self, logs: &[(LogDate, String)], prompt: Option<&str>) -> String {
        if logs.is_empty() {
            return NO_LOGS_MESSAGE.to_string();
        }
        let collected = summary::format_logs(logs);
        let user = summary::summary_user_prompt(&collected, prompt);
        self.ask(summary::SUMMARY_SYSTEM_PROMPT, &user)
            .await
            .unwrap_or(collected)
    }

    // --- Operations on stored logs ---

    /// Enrich the raw log of `date` and store the result as the rich log.
    pub async fn enrich_log(&self, store: &Store, date: &LogDate) -> Result<String> {
        let raw = store.read_log(date)?;
        if raw.trim().is_empty() {
            return Err(Error::InvalidInput("No log content to enrich".to_string()));
        }
        let config = store.read_config()?;
        let content = self.enrich(&raw, &config).await;
        store.write_rich_log(date, &content)?;
        tracing::info!(date = %date, len = content.len(), "enriched log");
        Ok(content)
    }

    /// Linkify the raw log of `date` in place.
    pub async fn linkify_log(&self, store: &Store, date: &LogDate) -> Result<String> {
        let raw = store.read_log(date)?;
        if raw.trim().is_empty() {
            return Err(Error::InvalidInput("No log content to linkify".to_string()));
        }
        let config = store.read_config()?;
        let content = self.linkify(&raw, &config).await;
        store.write_log(date, &content)?;
        tracing::info!(date = %date, len = content.len(), "linkified log");
        Ok(content)
    }

    pub async fn suggest_for_date(&self, store: &Store, date: &LogDate) -> Result<Suggestions> {
        let log = store.read_log(date)?;
        Ok(self.suggest(&log).await)
    }

    /// Summarize the logs of `start..=end`.
    pub async fn summarize_range(
        &self,
        store: &Store,
        start: &LogDate,
        end: &LogDate,
        prompt: Option<&str>,
    ) -> Result<String> {
        let days = start.days_until(end);
        if days < 0 {
            return Err(Error::InvalidInput(format!(
                "End date {} is before start date {}",
                end, start
            )));
        }
        if days >= MAX_SUMMARY_DAYS {
            return Err(Error::InvalidInput(format!(
                "Date range is longer than {} days",
                MAX_SUMMARY_DAYS
            )));
        }
        let logs = store.collect_logs(start, end)?;
        Ok(self.summarize(&logs, prompt).await)
    }
}
