//! Normalized view over platform updates.
//!
//! Handlers and the router never touch raw transport types; the ingestion
//! layer in [`crate::telegram`] converts incoming updates into these structs.

/// Direct vs. group context of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with the bot
    Direct,
    /// Group or supergroup
    Group,
}

/// Payload kind of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Plain text
    Text,
    /// Sticker with its transport file id
    Sticker(String),
    /// Anything the chain does not act on (photos, voice, polls, ...)
    Other,
}

/// An inbound chat message, normalized.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Chat the message arrived in
    pub chat_id: i64,
    /// Direct or group context
    pub chat_kind: ChatKind,
    /// Sender's platform id
    pub sender_id: i64,
    /// Sender's display name
    pub sender_name: String,
    /// Raw message text (empty for non-text content)
    pub text: String,
    /// Payload kind
    pub content: ContentKind,
}

/// A callback (inline button press), normalized.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// Transport-level callback id (acknowledged after routing)
    pub callback_id: String,
    /// Chat of the originating message
    pub chat_id: i64,
    /// Sender's platform id
    pub sender_id: i64,
    /// Sender's display name
    pub sender_name: String,
    /// Opaque button payload
    pub payload: String,
}

/// Normalized inbound event: exactly one of message or callback is set.
///
/// Read-only to all handlers.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Message part, if the update carried a message
    pub message: Option<MessageEvent>,
    /// Callback part, if the update carried a button press
    pub callback: Option<CallbackEvent>,
}

impl InboundEvent {
    /// Wrap a message event.
    #[must_use]
    pub fn from_message(message: MessageEvent) -> Self {
        Self {
            message: Some(message),
            callback: None,
        }
    }

    /// Wrap a callback event.
    #[must_use]
    pub fn from_callback(callback: CallbackEvent) -> Self {
        Self {
            message: None,
            callback: Some(callback),
        }
    }

    /// Chat id replies should go to, regardless of event shape.
    #[must_use]
    pub fn chat_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .map(|m| m.chat_id)
            .or_else(|| self.callback.as_ref().map(|c| c.chat_id))
    }

    /// Platform id of whoever produced the event.
    #[must_use]
    pub fn sender_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .map(|m| m.sender_id)
            .or_else(|| self.callback.as_ref().map(|c| c.sender_id))
    }

    /// Display name of whoever produced the event.
    #[must_use]
    pub fn sender_name(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.sender_name.as_str())
            .or_else(|| self.callback.as_ref().map(|c| c.sender_name.as_str()))
            .unwrap_or("друг")
    }
}
