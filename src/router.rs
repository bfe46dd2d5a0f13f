//! Routes normalized inbound events through the handler chain.
//!
//! Handlers run in registration order and the first one to claim an event
//! stops the chain. Group messages that neither mention the bot nor start
//! with a command only reach handlers that opted into group traffic.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::event::{ChatKind, InboundEvent};
use crate::handlers::UpdateHandler;
use crate::outbound::{MessageDispatcher, Outbound};

/// Reply for unclaimed direct or mentioned messages.
const UNKNOWN_COMMAND_REPLY: &str = "Не знаю такой команды 😅.";
/// Reply for button presses no handler recognizes.
const UNKNOWN_CALLBACK_REPLY: &str = "Неизвестное действие 😅";

/// The ordered handler chain plus routing policy around it.
pub struct Router {
    handlers: Vec<Arc<dyn UpdateHandler>>,
    dispatcher: Arc<MessageDispatcher>,
    transport: Arc<dyn Outbound>,
    bot_mention: String,
}

impl Router {
    /// Create a router. `bot_username` is the bot's own username without
    /// the leading `@`.
    #[must_use]
    pub fn new(
        handlers: Vec<Arc<dyn UpdateHandler>>,
        dispatcher: Arc<MessageDispatcher>,
        transport: Arc<dyn Outbound>,
        bot_username: &str,
    ) -> Self {
        Self {
            handlers,
            dispatcher,
            transport,
            bot_mention: format!("@{bot_username}"),
        }
    }

    /// Route one event. Returns whether any handler claimed it.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<bool> {
        if event.callback.is_some() {
            return self.dispatch_callback(event).await;
        }
        self.dispatch_message(event).await
    }

    async fn dispatch_message(&self, event: &InboundEvent) -> Result<bool> {
        let Some(message) = &event.message else {
            return Ok(false);
        };

        let raw = message.text.trim();
        let mentioned = find_case_insensitive(raw, &self.bot_mention).is_some();

        if message.chat_kind == ChatKind::Group && !mentioned && !raw.starts_with('/') {
            for handler in self.handlers.iter().filter(|h| h.group_eligible()) {
                if handler.handle(event, raw).await? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        let cleaned = strip_mention(raw, &self.bot_mention);
        for handler in &self.handlers {
            if handler.handle(event, &cleaned).await? {
                return Ok(true);
            }
        }

        debug!("No handler claimed message in chat {}", message.chat_id);
        if message.chat_kind == ChatKind::Direct || mentioned {
            self.dispatcher
                .enqueue(message.chat_id, UNKNOWN_COMMAND_REPLY)
                .await;
        }
        Ok(false)
    }

    /// A button press re-enters the chain as the command its payload names.
    /// The callback is acknowledged no matter what the chain decided.
    async fn dispatch_callback(&self, event: &InboundEvent) -> Result<bool> {
        let Some(callback) = &event.callback else {
            return Ok(false);
        };

        let command = format!("/{}", callback.payload);
        let mut claimed = false;
        for handler in &self.handlers {
            if handler.handle(event, &command).await? {
                claimed = true;
                break;
            }
        }

        if !claimed {
            self.dispatcher
                .enqueue(callback.chat_id, UNKNOWN_CALLBACK_REPLY)
                .await;
        }
        self.transport.answer_callback(&callback.callback_id).await?;
        Ok(claimed)
    }
}

/// Byte offset of `needle` in `haystack`, ignoring ASCII case. `needle`
/// must be ASCII.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Remove every occurrence of the mention and collapse runs of whitespace.
fn strip_mention(text: &str, mention: &str) -> String {
    let mut remaining = text;
    let mut cleaned = String::with_capacity(text.len());
    while let Some(at) = find_case_insensitive(remaining, mention) {
        cleaned.push_str(&remaining[..at]);
        remaining = &remaining[at + mention.len()..];
    }
    cleaned.push_str(remaining);
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
