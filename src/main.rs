use banda_bot::access::RoleGate;
use banda_bot::config::Settings;
use banda_bot::handlers::{
    AdminHandler, AudioHandler, CommandHandler, GroupKeywordHandler, KeywordHandler, RandomPicker,
    StickerHandler, TagHandler, UpdateHandler, VariantPicker,
};
use banda_bot::outbound::{DispatchConfig, MessageDispatcher, Outbound};
use banda_bot::router::Router;
use banda_bot::store::{
    AudioStore, InMemoryAudioStore, InMemoryPhraseStore, InMemoryUserStore, PhraseStore, UserStore,
};
use banda_bot::telegram::{self, TelegramApi};
use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting the bot token from log output
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting Banda bot...");

    let settings = init_settings();

    let bot = Bot::new(settings.telegram_token.clone());
    let me = bot.get_me().await?;
    let bot_username = me.user.username.clone().unwrap_or_default();
    info!("Running as @{bot_username}");

    let transport: Arc<dyn Outbound> = Arc::new(TelegramApi::new(bot.clone()));
    let dispatcher =
        MessageDispatcher::spawn(transport.clone(), DispatchConfig::from_settings(&settings));

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let phrases: Arc<dyn PhraseStore> = Arc::new(InMemoryPhraseStore::new());
    let audio: Arc<dyn AudioStore> = Arc::new(InMemoryAudioStore::new());
    let picker: Arc<dyn VariantPicker> = Arc::new(RandomPicker);

    // Chain order matters: the first handler to claim an update wins.
    let handlers: Vec<Arc<dyn UpdateHandler>> = vec![
        Arc::new(StickerHandler::new(dispatcher.clone())),
        Arc::new(AdminHandler::new(
            dispatcher.clone(),
            RoleGate::new(users.clone()),
            users.clone(),
            phrases.clone(),
        )),
        Arc::new(CommandHandler::new(
            dispatcher.clone(),
            transport.clone(),
            phrases.clone(),
            picker.clone(),
        )),
        Arc::new(KeywordHandler::new(phrases.clone(), dispatcher.clone())),
        Arc::new(TagHandler::new(
            phrases.clone(),
            dispatcher.clone(),
            picker,
        )),
        Arc::new(AudioHandler::new(
            audio,
            transport.clone(),
            PathBuf::from(&settings.audio_dir),
        )),
        Arc::new(GroupKeywordHandler::new(phrases, dispatcher.clone())),
    ];

    if let Err(e) = transport
        .set_my_commands(&CommandHandler::command_menu())
        .await
    {
        error!("Failed to publish command menu: {e}");
    }

    let router = Arc::new(Router::new(
        handlers,
        dispatcher.clone(),
        transport,
        &bot_username,
    ));

    info!("Bot is running...");
    telegram::run_polling(bot, router).await;

    dispatcher.shutdown();
    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
