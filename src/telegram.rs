//! Teloxide boundary: the [`Outbound`] implementation, update
//! normalization and long-polling wiring.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, CallbackQuery, ChatAction, DiceEmoji, InlineKeyboardButton, InlineKeyboardMarkup,
    InputFile, InputPollOption, Message, PollType,
};
use teloxide::RequestError;
use tracing::error;

use crate::event::{CallbackEvent, ChatKind, ContentKind, InboundEvent, MessageEvent};
use crate::outbound::transport::{AudioPayload, ChatActivity, QuizSpec};
use crate::outbound::{InlineKeyboard, Outbound, SendError};
use crate::router::Router;

/// [`Outbound`] over a live teloxide [`Bot`].
pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    /// Wrap a bot handle.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn map_request_error(err: RequestError) -> SendError {
    match err {
        RequestError::RetryAfter(secs) => SendError::Throttled {
            retry_after: Some(secs.duration()),
        },
        other => SendError::Failed(other.to_string()),
    }
}

fn to_reply_markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

fn to_dice_emoji(emoji: &str) -> DiceEmoji {
    match emoji {
        "🎯" => DiceEmoji::Darts,
        "⚽" => DiceEmoji::Football,
        "🏀" => DiceEmoji::Basketball,
        "🎳" => DiceEmoji::Bowling,
        _ => DiceEmoji::Dice,
    }
}

#[async_trait]
impl Outbound for TelegramApi {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), SendError> {
        let mut req = self.bot.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(to_reply_markup(keyboard));
        }
        req.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, file_id: &str) -> Result<(), SendError> {
        self.bot
            .send_sticker(ChatId(chat_id), InputFile::file_id(teloxide::types::FileId(file_id.to_owned())))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn send_dice(&self, chat_id: i64, emoji: &str) -> Result<(), SendError> {
        let mut req = self.bot.send_dice(ChatId(chat_id));
        req.emoji = Some(to_dice_emoji(emoji));
        req.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn send_quiz(&self, chat_id: i64, quiz: &QuizSpec) -> Result<(), SendError> {
        let options: Vec<InputPollOption> = quiz
            .options
            .iter()
            .cloned()
            .map(InputPollOption::new)
            .collect();

        let mut req = self
            .bot
            .send_poll(ChatId(chat_id), quiz.question.clone(), options);
        req.type_ = Some(PollType::Quiz);
        req.correct_option_id = Some(quiz.correct);
        req.is_anonymous = Some(false);
        req.explanation = Some(quiz.explanation.clone());
        req.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        payload: AudioPayload,
    ) -> Result<Option<String>, SendError> {
        let input = match payload {
            AudioPayload::CachedId(file_id) => InputFile::file_id(teloxide::types::FileId(file_id)),
            AudioPayload::Upload { file_name, bytes } => {
                InputFile::memory(bytes).file_name(file_name)
            }
        };
        let message = self
            .bot
            .send_audio(ChatId(chat_id), input)
            .await
            .map_err(map_request_error)?;
        Ok(message.audio().map(|a| a.file.id.to_string()))
    }

    async fn send_chat_action(
        &self,
        chat_id: i64,
        activity: ChatActivity,
    ) -> Result<(), SendError> {
        let action = match activity {
            ChatActivity::Typing => ChatAction::Typing,
            ChatActivity::RecordVoice => ChatAction::RecordVoice,
        };
        self.bot
            .send_chat_action(ChatId(chat_id), action)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), SendError> {
        self.bot
            .answer_callback_query(teloxide::types::CallbackQueryId(callback_id.to_owned()))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn set_my_commands(&self, commands: &[(String, String)]) -> Result<(), SendError> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|(name, description)| BotCommand::new(name.clone(), description.clone()))
            .collect();
        self.bot
            .set_my_commands(commands)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

fn sender_name(user: &teloxide::types::User) -> String {
    user.full_name()
}

/// Normalize a Telegram message into the transport-neutral event shape.
#[must_use]
pub fn normalize_message(msg: &Message) -> InboundEvent {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Direct
    } else {
        ChatKind::Group
    };

    let content = if let Some(sticker) = msg.sticker() {
        ContentKind::Sticker(sticker.file.id.to_string())
    } else if msg.text().is_some() {
        ContentKind::Text
    } else {
        ContentKind::Other
    };

    InboundEvent::from_message(MessageEvent {
        chat_id: msg.chat.id.0,
        chat_kind,
        sender_id: msg
            .from
            .as_ref()
            .map(|u| u.id.0.cast_signed())
            .unwrap_or_default(),
        sender_name: msg
            .from
            .as_ref()
            .map(sender_name)
            .unwrap_or_else(|| "друг".to_string()),
        text: msg.text().unwrap_or_default().to_string(),
        content,
    })
}

/// Normalize a callback query. `None` when it carries no payload or its
/// originating message (and thus the chat) is gone.
#[must_use]
pub fn normalize_callback(q: &CallbackQuery) -> Option<InboundEvent> {
    let payload = q.data.as_deref()?;
    let chat_id = q.message.as_ref().map(|msg| msg.chat().id.0)?;

    Some(InboundEvent::from_callback(CallbackEvent {
        callback_id: q.id.to_string(),
        chat_id,
        sender_id: q.from.id.0.cast_signed(),
        sender_name: sender_name(&q.from),
        payload: payload.to_string(),
    }))
}

async fn on_message(msg: Message, router: Arc<Router>) -> Result<(), RequestError> {
    let event = normalize_message(&msg);
    if let Err(e) = router.dispatch(&event).await {
        error!("Message handling error: {e}");
    }
    respond(())
}

async fn on_callback(q: CallbackQuery, router: Arc<Router>) -> Result<(), RequestError> {
    let Some(event) = normalize_callback(&q) else {
        return respond(());
    };
    if let Err(e) = router.dispatch(&event).await {
        error!("Callback handling error: {e}");
    }
    respond(())
}

/// Long-poll updates and feed them through the router until shutdown.
pub async fn run_polling(bot: Bot, router: Arc<Router>) {
    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(on_callback))
        .branch(Update::filter_message().endpoint(on_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
