//! Transport boundary consumed by the dispatcher and the handlers.
//!
//! The dispatcher only cares about the tri-state outcome of `send_text`:
//! delivered, throttled by the provider (with an optional suggested delay),
//! or failed for any other reason.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors produced at the transport boundary.
#[derive(Debug, Error)]
pub enum SendError {
    /// Provider asked us to slow down; retry after the suggested delay.
    #[error("throttled by provider (retry after {retry_after:?})")]
    Throttled {
        /// Provider-suggested delay before retrying, if it gave one.
        retry_after: Option<Duration>,
    },
    /// Any other delivery failure.
    #[error("send failed: {0}")]
    Failed(String),
}

/// Inline keyboard button: label shown to the user, opaque callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    /// Button caption
    pub label: String,
    /// Opaque payload routed back through the handler chain on press
    pub payload: String,
}

impl InlineButton {
    /// Convenience constructor.
    #[must_use]
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Structured reply markup attached to a text send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    /// Button rows, top to bottom
    pub rows: Vec<Vec<InlineButton>>,
}

/// Activity hint shown in the chat while a handler prepares its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatActivity {
    /// "typing..."
    Typing,
    /// "recording a voice message..."
    RecordVoice,
}

/// Audio payload: either a provider-cached file reference or raw bytes.
#[derive(Debug, Clone)]
pub enum AudioPayload {
    /// Resend a file the provider already has
    CachedId(String),
    /// Upload new content
    Upload {
        /// File name shown to the recipient
        file_name: String,
        /// Raw file bytes
        bytes: Vec<u8>,
    },
}

/// A quiz poll sent by the canned `/quiz` command.
#[derive(Debug, Clone)]
pub struct QuizSpec {
    /// Question text
    pub question: String,
    /// Answer options
    pub options: Vec<String>,
    /// Index of the correct option
    pub correct: u8,
    /// Shown after answering
    pub explanation: String,
}

/// Outbound operations the bot performs against the messaging provider.
///
/// Implemented for teloxide in [`crate::telegram`]; tests substitute a
/// recording mock.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Send a text message, optionally with an inline keyboard.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), SendError>;

    /// Send a sticker by provider file id.
    async fn send_sticker(&self, chat_id: i64, file_id: &str) -> Result<(), SendError>;

    /// Send an animated dice with the given emoji.
    async fn send_dice(&self, chat_id: i64, emoji: &str) -> Result<(), SendError>;

    /// Send a quiz poll.
    async fn send_quiz(&self, chat_id: i64, quiz: &QuizSpec) -> Result<(), SendError>;

    /// Send an audio message; returns the provider file id for uploads.
    async fn send_audio(
        &self,
        chat_id: i64,
        payload: AudioPayload,
    ) -> Result<Option<String>, SendError>;

    /// Show an activity indicator in the chat.
    async fn send_chat_action(&self, chat_id: i64, activity: ChatActivity)
        -> Result<(), SendError>;

    /// Acknowledge a callback query so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), SendError>;

    /// Publish the bot's command list to the provider.
    async fn set_my_commands(&self, commands: &[(String, String)]) -> Result<(), SendError>;
}
