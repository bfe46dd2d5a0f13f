//! Echoes the file id of any received sticker.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::UpdateHandler;
use crate::event::{ContentKind, InboundEvent};
use crate::outbound::MessageDispatcher;

/// Replies with the sticker's file id so it can be wired up as a command.
pub struct StickerHandler {
    dispatcher: Arc<MessageDispatcher>,
}

impl StickerHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(dispatcher: Arc<MessageDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl UpdateHandler for StickerHandler {
    async fn handle(&self, event: &InboundEvent, _text: &str) -> Result<bool> {
        let Some(message) = &event.message else {
            return Ok(false);
        };
        let ContentKind::Sticker(file_id) = &message.content else {
            return Ok(false);
        };

        self.dispatcher
            .enqueue(message.chat_id, format!("FileId стикера:\n{file_id}"))
            .await;
        Ok(true)
    }
}
