//! Group-chat keyword echo.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::UpdateHandler;
use crate::event::InboundEvent;
use crate::outbound::MessageDispatcher;
use crate::store::PhraseStore;

/// Answers group phrases without requiring the bot to be mentioned.
pub struct GroupKeywordHandler {
    phrases: Arc<dyn PhraseStore>,
    dispatcher: Arc<MessageDispatcher>,
}

impl GroupKeywordHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(phrases: Arc<dyn PhraseStore>, dispatcher: Arc<MessageDispatcher>) -> Self {
        Self { phrases, dispatcher }
    }
}

#[async_trait]
impl UpdateHandler for GroupKeywordHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(chat_id) = event.chat_id() else {
            return Ok(false);
        };

        let keywords = self.phrases.group_keywords().await?;
        let lowered = text.to_lowercase();

        for (keyword, response) in keywords.iter() {
            if lowered.contains(keyword.as_str()) {
                self.dispatcher.enqueue(chat_id, response.clone()).await;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn group_eligible(&self) -> bool {
        true
    }
}
