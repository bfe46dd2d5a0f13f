//! Trigger phrases and the derived lookup structures handlers match against.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use moka::future::Cache;
use regex::Regex;
use tokio::sync::RwLock;

/// How long a derived view stays cached before it is rebuilt from storage.
const VIEW_TTL: Duration = Duration::from_secs(60);

/// Which handler a phrase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseCategory {
    /// Word-boundary regex-matched reply in direct chats
    Keyword,
    /// Substring-matched reply echoed into group chats
    Group,
    /// Tag template with `|`-separated response variants
    Tag,
}

/// A stored trigger/response pair.
#[derive(Debug, Clone)]
pub struct Phrase {
    /// Category the phrase is matched under
    pub category: PhraseCategory,
    /// Trigger text
    pub trigger: String,
    /// Response text; for [`PhraseCategory::Tag`] a `|`-separated variant list
    pub response: String,
}

/// A keyword phrase with its precompiled matching pattern.
#[derive(Debug, Clone)]
pub struct CompiledKeyword {
    /// Original trigger text
    pub trigger: String,
    /// Case-insensitive whole-word pattern for the trigger
    pub regex: Regex,
    /// Response to send on a match
    pub response: String,
}

/// Phrase persistence plus the derived views handlers consume.
#[async_trait]
pub trait PhraseStore: Send + Sync {
    /// Store a phrase.
    async fn add_phrase(&self, phrase: Phrase) -> Result<()>;

    /// Remove a phrase by trigger and category. Returns whether it existed.
    async fn remove_phrase(&self, trigger: &str, category: PhraseCategory) -> Result<bool>;

    /// Keyword phrases compiled to patterns, longest trigger first so the
    /// most specific phrase wins when several match.
    async fn keyword_patterns(&self) -> Result<Arc<Vec<CompiledKeyword>>>;

    /// Group phrases keyed by lowercased trigger.
    async fn group_keywords(&self) -> Result<Arc<HashMap<String, String>>>;

    /// Tag templates keyed by lowercased trigger, response split into variants.
    async fn tags(&self) -> Result<Arc<HashMap<String, Vec<String>>>>;
}

/// `RwLock`-backed phrase store with TTL-cached derived views.
pub struct InMemoryPhraseStore {
    phrases: RwLock<Vec<Phrase>>,
    keyword_view: Cache<(), Arc<Vec<CompiledKeyword>>>,
    group_view: Cache<(), Arc<HashMap<String, String>>>,
    tag_view: Cache<(), Arc<HashMap<String, Vec<String>>>>,
}

impl InMemoryPhraseStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phrases: RwLock::new(Vec::new()),
            keyword_view: view_cache(),
            group_view: view_cache(),
            tag_view: view_cache(),
        }
    }

    /// Create a store preloaded with phrases.
    #[must_use]
    pub fn with_phrases(phrases: Vec<Phrase>) -> Self {
        Self {
            phrases: RwLock::new(phrases),
            keyword_view: view_cache(),
            group_view: view_cache(),
            tag_view: view_cache(),
        }
    }

    async fn invalidate_views(&self) {
        self.keyword_view.invalidate(&()).await;
        self.group_view.invalidate(&()).await;
        self.tag_view.invalidate(&()).await;
    }
}

impl Default for InMemoryPhraseStore {
    fn default() -> Self {
        Self::new()
    }
}

fn view_cache<V: Clone + Send + Sync + 'static>() -> Cache<(), V> {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(VIEW_TTL)
        .build()
}

fn compile_keywords(phrases: &[Phrase]) -> Result<Arc<Vec<CompiledKeyword>>> {
    let mut keywords: Vec<&Phrase> = phrases
        .iter()
        .filter(|p| p.category == PhraseCategory::Keyword)
        .collect();
    keywords.sort_by(|a, b| b.trigger.len().cmp(&a.trigger.len()));

    let mut compiled = Vec::with_capacity(keywords.len());
    for phrase in keywords {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&phrase.trigger));
        compiled.push(CompiledKeyword {
            trigger: phrase.trigger.clone(),
            regex: Regex::new(&pattern)?,
            response: phrase.response.clone(),
        });
    }
    Ok(Arc::new(compiled))
}

#[async_trait]
impl PhraseStore for InMemoryPhraseStore {
    async fn add_phrase(&self, phrase: Phrase) -> Result<()> {
        self.phrases.write().await.push(phrase);
        self.invalidate_views().await;
        Ok(())
    }

    async fn remove_phrase(&self, trigger: &str, category: PhraseCategory) -> Result<bool> {
        let mut phrases = self.phrases.write().await;
        let before = phrases.len();
        phrases.retain(|p| !(p.category == category && p.trigger == trigger));
        let removed = phrases.len() != before;
        drop(phrases);

        if removed {
            self.invalidate_views().await;
        }
        Ok(removed)
    }

    async fn keyword_patterns(&self) -> Result<Arc<Vec<CompiledKeyword>>> {
        self.keyword_view
            .try_get_with((), async {
                let phrases = self.phrases.read().await;
                compile_keywords(&phrases)
            })
            .await
            .map_err(|e| anyhow!("Failed to build keyword view: {e}"))
    }

    async fn group_keywords(&self) -> Result<Arc<HashMap<String, String>>> {
        Ok(self
            .group_view
            .get_with((), async {
                let phrases = self.phrases.read().await;
                Arc::new(
                    phrases
                        .iter()
                        .filter(|p| p.category == PhraseCategory::Group)
                        .map(|p| (p.trigger.to_lowercase(), p.response.clone()))
                        .collect(),
                )
            })
            .await)
    }

    async fn tags(&self) -> Result<Arc<HashMap<String, Vec<String>>>> {
        Ok(self
            .tag_view
            .get_with((), async {
                let phrases = self.phrases.read().await;
                Arc::new(
                    phrases
                        .iter()
                        .filter(|p| p.category == PhraseCategory::Tag)
                        .map(|p| {
                            let variants = p
                                .response
                                .split('|')
                                .map(|v| v.trim().to_string())
                                .filter(|v| !v.is_empty())
                                .collect();
                            (p.trigger.to_lowercase(), variants)
                        })
                        .collect(),
                )
            })
            .await)
    }
}
