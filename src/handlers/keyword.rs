//! Keyword-triggered canned replies.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::UpdateHandler;
use crate::event::InboundEvent;
use crate::outbound::MessageDispatcher;
use crate::store::PhraseStore;

/// Matches message text against the stored keyword phrases.
pub struct KeywordHandler {
    phrases: Arc<dyn PhraseStore>,
    dispatcher: Arc<MessageDispatcher>,
}

impl KeywordHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(phrases: Arc<dyn PhraseStore>, dispatcher: Arc<MessageDispatcher>) -> Self {
        Self { phrases, dispatcher }
    }
}

#[async_trait]
impl UpdateHandler for KeywordHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(chat_id) = event.chat_id() else {
            return Ok(false);
        };

        // Patterns are ordered longest trigger first, so the most specific
        // phrase wins.
        let patterns = self.phrases.keyword_patterns().await?;
        for keyword in patterns.iter() {
            if keyword.regex.is_match(text) {
                self.dispatcher.enqueue(chat_id, keyword.response.clone()).await;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
