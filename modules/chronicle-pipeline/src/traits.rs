// Injected capabilities.
//
// PromptSubmitter is the only way the pipeline reaches a model. EventCatalog
// and CitationCatalog answer questions about what the calling application
// has already persisted. Retries, timeouts and storage all live behind these
// traits, on the caller's side.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chronicle_common::Stage;

/// One model request: the phase it belongs to plus system and user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub stage: Stage,
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(stage: Stage, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            stage,
            system: system.into(),
            user: user.into(),
        }
    }

    /// System and user text as a single prompt, for providers without a
    /// separate system channel.
    pub fn text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

// ---------------------------------------------------------------------------
// PromptSubmitter
// ---------------------------------------------------------------------------

/// Submit a prompt, get back the model's raw (JSON-ish) text.
#[async_trait]
pub trait PromptSubmitter: Send + Sync {
    async fn submit(&self, prompt: &Prompt) -> Result<String>;
}

#[async_trait]
impl<T: PromptSubmitter + ?Sized> PromptSubmitter for Arc<T> {
    async fn submit(&self, prompt: &Prompt) -> Result<String> {
        (**self).submit(prompt).await
    }
}

// ---------------------------------------------------------------------------
// Persisted-data lookups
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Slug of an already-persisted event with exactly this title.
    async fn slug_for_title(&self, title: &str) -> Result<Option<String>>;

    /// Every slug that currently resolves to a persisted event.
    async fn persisted_slugs(&self) -> Result<HashSet<String>>;
}

#[async_trait]
pub trait CitationCatalog: Send + Sync {
    /// Whether a research citation number is still usable.
    async fn is_live(&self, number: u32) -> Result<bool>;
}

/// Nothing persisted yet; every citation is live.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCatalog;

#[async_trait]
impl EventCatalog for NullCatalog {
    async fn slug_for_title(&self, _title: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn persisted_slugs(&self) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
}

#[async_trait]
impl CitationCatalog for NullCatalog {
    async fn is_live(&self, _number: u32) -> Result<bool> {
        Ok(true)
    }
}
