//! Tag commands: "позови @кто-то" style messages aimed at another user.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{UpdateHandler, VariantPicker};
use crate::event::InboundEvent;
use crate::outbound::MessageDispatcher;
use crate::store::PhraseStore;

/// Matches tag triggers and replies with a random variant addressed to the
/// tagged username.
pub struct TagHandler {
    phrases: Arc<dyn PhraseStore>,
    dispatcher: Arc<MessageDispatcher>,
    picker: Arc<dyn VariantPicker>,
}

impl TagHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(
        phrases: Arc<dyn PhraseStore>,
        dispatcher: Arc<MessageDispatcher>,
        picker: Arc<dyn VariantPicker>,
    ) -> Self {
        Self {
            phrases,
            dispatcher,
            picker,
        }
    }
}

#[async_trait]
impl UpdateHandler for TagHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(chat_id) = event.chat_id() else {
            return Ok(false);
        };

        let tags = self.phrases.tags().await?;
        let lowered = text.to_lowercase();

        for (keyword, variants) in tags.iter() {
            if !lowered.contains(keyword.as_str()) || variants.is_empty() {
                continue;
            }

            let parts: Vec<&str> = text.split_whitespace().collect();
            if parts.len() < 2 {
                self.dispatcher
                    .enqueue(chat_id, format!("Используй так: {keyword} @никнейм @bot_name"))
                    .await;
                return Ok(true);
            }

            let target = parts[1];
            let variant = &variants[self.picker.pick(variants.len())];
            self.dispatcher
                .enqueue(chat_id, variant.replace("{username}", target))
                .await;
            return Ok(true);
        }
        Ok(false)
    }
}
