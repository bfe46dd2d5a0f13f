//! Built-in slash commands.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{UpdateHandler, VariantPicker};
use crate::event::InboundEvent;
use crate::outbound::transport::QuizSpec;
use crate::outbound::transport::InlineButton;
use crate::outbound::{InlineKeyboard, MessageDispatcher, Outbound};
use crate::store::PhraseStore;

/// Sticker shortcuts: command to provider file id.
const NAMED_STICKERS: &[(&str, &str)] = &[
    (
        "/misha",
        "CAACAgIAAxkBAAM3aQyJ-u2Z13Z73C39Yvw5dpRaM-oAAuyGAAKs9ElIiV1v7bo2cLY2BA",
    ),
    (
        "/vanya",
        "CAACAgIAAxkBAAM5aQyKAvVEobWnRk3ta9cf4NcHjzkAAll_AAJXF0BISg4y0sxlb9I2BA",
    ),
    (
        "/fedya",
        "CAACAgIAAxkBAAM7aQyKC0GtkI-cKC9SKJ0ktPfx_tIAAtKFAAJg-kBI4Jr_ecEGYvk2BA",
    ),
    (
        "/grystno",
        "CAACAgIAAxkBAAM_aQyKQ44sLT1MAAFaUgZMqOYBCIBiAAKePwACKxrBSQ9tMdUadxVKNgQ",
    ),
    (
        "/dima",
        "CAACAgIAAxkBAAIB5mkNxtB8NI4IlrFzT4SJ6WGurMujAAJ7jwACgVFoSBFwCUl_EhndNgQ",
    ),
    (
        "/banda",
        "CAACAgIAAxkBAAIB6GkNx5piapWOhSHoRuu5psPWPl6zAAJweAACTKNxSLvmKsNWvEm_NgQ",
    ),
];

/// Dice emoji the /game command rolls.
const GAME_EMOJIS: &[&str] = &["🎯", "🎲", "⚽", "🏀", "🎳"];

fn quiz_pool() -> Vec<QuizSpec> {
    vec![
        QuizSpec {
            question: "Кто лучший программист? 💻".to_string(),
            options: vec![
                "Миша".to_string(),
                "Федя".to_string(),
                "Дима".to_string(),
                "Ваня".to_string(),
            ],
            correct: 0,
            explanation: "Очевидно 😎 — Миша лучший!".to_string(),
        },
        QuizSpec {
            question: "Какой язык любит Дима? 🧠".to_string(),
            options: vec![
                "C#".to_string(),
                "Python".to_string(),
                "Rust".to_string(),
                "Assembler".to_string(),
            ],
            correct: 1,
            explanation: "Дима — питонист в душе 🐍".to_string(),
        },
        QuizSpec {
            question: "Что выберет Федя? 🍕".to_string(),
            options: vec![
                "Пиццу".to_string(),
                "Работу".to_string(),
                "Сон".to_string(),
                "Танцы".to_string(),
            ],
            correct: 0,
            explanation: "Федя выбирает пиццу, как настоящий иммигрант 🇨🇦".to_string(),
        },
    ]
}

/// Handles the fixed command table: /start, /hello, /commands, /game, /quiz
/// and the named sticker shortcuts.
pub struct CommandHandler {
    dispatcher: Arc<MessageDispatcher>,
    transport: Arc<dyn Outbound>,
    phrases: Arc<dyn PhraseStore>,
    picker: Arc<dyn VariantPicker>,
}

impl CommandHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(
        dispatcher: Arc<MessageDispatcher>,
        transport: Arc<dyn Outbound>,
        phrases: Arc<dyn PhraseStore>,
        picker: Arc<dyn VariantPicker>,
    ) -> Self {
        Self {
            dispatcher,
            transport,
            phrases,
            picker,
        }
    }

    /// The commands to advertise via the provider's command menu.
    #[must_use]
    pub fn command_menu() -> Vec<(String, String)> {
        let mut commands = vec!["/start", "/hello", "/commands", "/game", "/quiz"];
        commands.extend(NAMED_STICKERS.iter().map(|(cmd, _)| *cmd));
        commands
            .into_iter()
            .map(|c| (c.trim_start_matches('/').to_string(), "Команда бота".to_string()))
            .collect()
    }

    fn start_keyboard() -> InlineKeyboard {
        InlineKeyboard {
            rows: vec![
                vec![
                    InlineButton::new("Привет 👋", "hello"),
                    InlineButton::new("Команды", "commands"),
                    InlineButton::new("🎯 Играть", "game"),
                    InlineButton::new("🧠 Викторина", "quiz"),
                ],
                vec![
                    InlineButton::new("БАНДА 😎", "banda"),
                    InlineButton::new("Миша 😎", "misha"),
                    InlineButton::new("Ваня 😏", "vanya"),
                    InlineButton::new("Федя 😎", "fedya"),
                    InlineButton::new("Дима 😢", "dima"),
                    InlineButton::new("Грустно", "grystno"),
                ],
            ],
        }
    }

    async fn handle_start(&self, chat_id: i64) {
        self.dispatcher
            .enqueue_with(
                chat_id,
                "Привет! Выбери действие:",
                Some(Self::start_keyboard()),
                None,
            )
            .await;
    }

    async fn handle_hello(&self, event: &InboundEvent, chat_id: i64) {
        self.dispatcher
            .enqueue(chat_id, format!("Привет, {}! 😄", event.sender_name()))
            .await;
    }

    /// The listing always goes to the sender's private chat, even when the
    /// command arrived from a group.
    async fn handle_commands(&self, event: &InboundEvent) -> Result<()> {
        let Some(sender_id) = event.sender_id() else {
            return Ok(());
        };

        let keywords: Vec<String> = self
            .phrases
            .keyword_patterns()
            .await?
            .iter()
            .map(|k| k.trigger.clone())
            .collect();
        let tags: Vec<String> = self.phrases.tags().await?.keys().cloned().collect();

        let listing = format!(
            "Привет, {}! 👋\n\n📜 Доступные команды:\n\nОбычные:\n{}\n\nТэг '(tag) @никнейм @bot_name'\n{}",
            event.sender_name(),
            keywords.join("\n"),
            tags.join("\n"),
        );
        self.dispatcher.enqueue(sender_id, listing).await;
        Ok(())
    }

    async fn handle_game(&self, chat_id: i64) -> Result<()> {
        let emoji = GAME_EMOJIS[self.picker.pick(GAME_EMOJIS.len())];
        self.dispatcher
            .enqueue(chat_id, format!("Бросаем {emoji}!"))
            .await;
        self.transport.send_dice(chat_id, emoji).await?;
        Ok(())
    }

    async fn handle_quiz(&self, chat_id: i64) -> Result<()> {
        let pool = quiz_pool();
        let quiz = &pool[self.picker.pick(pool.len())];
        self.transport.send_quiz(chat_id, quiz).await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateHandler for CommandHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(chat_id) = event.chat_id() else {
            return Ok(false);
        };
        let command = text.trim().to_lowercase();

        match command.as_str() {
            "/start" => self.handle_start(chat_id).await,
            "/hello" => self.handle_hello(event, chat_id).await,
            "/commands" => self.handle_commands(event).await?,
            "/game" => self.handle_game(chat_id).await?,
            "/quiz" => self.handle_quiz(chat_id).await?,
            _ => {
                let Some((_, file_id)) =
                    NAMED_STICKERS.iter().find(|(cmd, _)| *cmd == command)
                else {
                    return Ok(false);
                };
                self.transport.send_sticker(chat_id, file_id).await?;
            }
        }
        Ok(true)
    }
}
