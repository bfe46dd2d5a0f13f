use async_trait::async_trait;
use banda_bot::access::RoleGate;
use banda_bot::event::{CallbackEvent, ChatKind, ContentKind, InboundEvent, MessageEvent};
use banda_bot::handlers::{
    AdminHandler, AudioHandler, CommandHandler, GroupKeywordHandler, KeywordHandler,
    StickerHandler, TagHandler, UpdateHandler, VariantPicker,
};
use banda_bot::outbound::transport::{AudioPayload, ChatActivity, InlineKeyboard, QuizSpec};
use banda_bot::outbound::{DispatchConfig, MessageDispatcher, Outbound, SendError};
use banda_bot::router::Router;
use banda_bot::store::{
    AudioRecord, AudioStore, InMemoryAudioStore, InMemoryPhraseStore, InMemoryUserStore, NewUser,
    Phrase, PhraseCategory, PhraseStore, UserStore,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

const ADMIN_CHAT: i64 = 42;
const GROUP_CHAT: i64 = -100;

#[derive(Default)]
struct MockTransport {
    texts: Mutex<Vec<(i64, String)>>,
    stickers: Mutex<Vec<(i64, String)>>,
    audio_uploads: Mutex<Vec<String>>,
    audio_cached: Mutex<Vec<String>>,
    answered: Mutex<Vec<String>>,
}

impl MockTransport {
    fn texts(&self) -> Vec<(i64, String)> {
        self.texts.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Outbound for MockTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), SendError> {
        self.texts
            .lock()
            .expect("lock poisoned")
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, file_id: &str) -> Result<(), SendError> {
        self.stickers
            .lock()
            .expect("lock poisoned")
            .push((chat_id, file_id.to_string()));
        Ok(())
    }

    async fn send_dice(&self, _: i64, _: &str) -> Result<(), SendError> {
        Ok(())
    }

    async fn send_quiz(&self, _: i64, _: &QuizSpec) -> Result<(), SendError> {
        Ok(())
    }

    async fn send_audio(&self, _: i64, payload: AudioPayload) -> Result<Option<String>, SendError> {
        match payload {
            AudioPayload::CachedId(file_id) => {
                self.audio_cached.lock().expect("lock poisoned").push(file_id);
                Ok(None)
            }
            AudioPayload::Upload { file_name, .. } => {
                self.audio_uploads
                    .lock()
                    .expect("lock poisoned")
                    .push(file_name);
                Ok(Some("fresh-file-id".to_string()))
            }
        }
    }

    async fn send_chat_action(&self, _: i64, _: ChatActivity) -> Result<(), SendError> {
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), SendError> {
        self.answered
            .lock()
            .expect("lock poisoned")
            .push(callback_id.to_string());
        Ok(())
    }

    async fn set_my_commands(&self, _: &[(String, String)]) -> Result<(), SendError> {
        Ok(())
    }
}

/// Always picks the first variant, so tag replies are deterministic.
struct FirstPicker;

impl VariantPicker for FirstPicker {
    fn pick(&self, _len: usize) -> usize {
        0
    }
}

struct Fixture {
    router: Router,
    transport: Arc<MockTransport>,
    users: Arc<InMemoryUserStore>,
    audio: Arc<InMemoryAudioStore>,
}

fn fixture(audio_dir: PathBuf) -> Fixture {
    let transport = Arc::new(MockTransport::default());
    let dispatcher = MessageDispatcher::spawn(
        transport.clone(),
        DispatchConfig {
            queue_capacity: 32,
            cooldown: Duration::from_millis(1),
            dedup_window: Duration::from_millis(1),
            pacing: Duration::from_millis(1),
            default_retry_delay: Duration::from_millis(1),
        },
    );

    let users = Arc::new(InMemoryUserStore::new());
    let phrases = Arc::new(InMemoryPhraseStore::with_phrases(vec![
        Phrase {
            category: PhraseCategory::Keyword,
            trigger: "привет".to_string(),
            response: "И тебе привет!".to_string(),
        },
        Phrase {
            category: PhraseCategory::Keyword,
            trigger: "привет всем".to_string(),
            response: "Всем привет!".to_string(),
        },
        Phrase {
            category: PhraseCategory::Group,
            trigger: "банда".to_string(),
            response: "Банда в сборе!".to_string(),
        },
        Phrase {
            category: PhraseCategory::Tag,
            trigger: "позови".to_string(),
            response: "{username}, тебя зовут!|{username}, ау!".to_string(),
        },
    ]));
    let audio = Arc::new(InMemoryAudioStore::new());
    let picker: Arc<dyn VariantPicker> = Arc::new(FirstPicker);

    let transport_dyn: Arc<dyn Outbound> = transport.clone();
    let users_dyn: Arc<dyn UserStore> = users.clone();
    let phrases_dyn: Arc<dyn PhraseStore> = phrases.clone();
    let audio_dyn: Arc<dyn AudioStore> = audio.clone();

    let handlers: Vec<Arc<dyn UpdateHandler>> = vec![
        Arc::new(StickerHandler::new(dispatcher.clone())),
        Arc::new(AdminHandler::new(
            dispatcher.clone(),
            RoleGate::new(users_dyn.clone()),
            users_dyn,
            phrases_dyn.clone(),
        )),
        Arc::new(CommandHandler::new(
            dispatcher.clone(),
            transport_dyn.clone(),
            phrases_dyn.clone(),
            picker.clone(),
        )),
        Arc::new(KeywordHandler::new(phrases_dyn.clone(), dispatcher.clone())),
        Arc::new(TagHandler::new(
            phrases_dyn.clone(),
            dispatcher.clone(),
            picker,
        )),
        Arc::new(AudioHandler::new(
            audio_dyn,
            transport_dyn.clone(),
            audio_dir,
        )),
        Arc::new(GroupKeywordHandler::new(phrases_dyn, dispatcher.clone())),
    ];

    let router = Router::new(handlers, dispatcher, transport_dyn, "banda_bot");
    Fixture {
        router,
        transport,
        users,
        audio,
    }
}

fn direct(text: &str) -> InboundEvent {
    InboundEvent::from_message(MessageEvent {
        chat_id: ADMIN_CHAT,
        chat_kind: ChatKind::Direct,
        sender_id: ADMIN_CHAT,
        sender_name: "Вася".to_string(),
        text: text.to_string(),
        content: ContentKind::Text,
    })
}

fn group(text: &str) -> InboundEvent {
    InboundEvent::from_message(MessageEvent {
        chat_id: GROUP_CHAT,
        chat_kind: ChatKind::Group,
        sender_id: ADMIN_CHAT,
        sender_name: "Вася".to_string(),
        text: text.to_string(),
        content: ContentKind::Text,
    })
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn keyword_reply_in_direct_chat() {
    let fx = fixture(PathBuf::from("no-audio"));
    let claimed = fx
        .router
        .dispatch(&direct("ну привет тебе"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert!(claimed);
    assert_eq!(fx.transport.texts(), vec![(ADMIN_CHAT, "И тебе привет!".to_string())]);
}

#[tokio::test]
async fn longest_keyword_trigger_wins() {
    let fx = fixture(PathBuf::from("no-audio"));
    fx.router
        .dispatch(&direct("привет всем присутствующим"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert_eq!(fx.transport.texts(), vec![(ADMIN_CHAT, "Всем привет!".to_string())]);
}

#[tokio::test]
async fn sticker_file_id_echoed_back() {
    let fx = fixture(PathBuf::from("no-audio"));
    let event = InboundEvent::from_message(MessageEvent {
        chat_id: ADMIN_CHAT,
        chat_kind: ChatKind::Direct,
        sender_id: ADMIN_CHAT,
        sender_name: "Вася".to_string(),
        text: String::new(),
        content: ContentKind::Sticker("sticker-123".to_string()),
    });

    let claimed = fx.router.dispatch(&event).await.expect("dispatch failed");
    settle().await;

    assert!(claimed);
    assert_eq!(
        fx.transport.texts(),
        vec![(ADMIN_CHAT, "FileId стикера:\nsticker-123".to_string())]
    );
}

#[tokio::test]
async fn unregistered_admin_command_rejected_without_mutation() {
    let fx = fixture(PathBuf::from("no-audio"));
    let claimed = fx
        .router
        .dispatch(&direct(
            "/addrole 01234567-89ab-cdef-0123-456789abcdef;Admin",
        ))
        .await
        .expect("dispatch failed");
    settle().await;

    assert!(claimed);
    assert_eq!(
        fx.transport.texts(),
        vec![(ADMIN_CHAT, "Ты не зарегистрирован!".to_string())]
    );
    assert!(fx
        .users
        .users_by_role("Admin")
        .await
        .expect("query failed")
        .is_empty());
}

#[tokio::test]
async fn admin_can_add_and_use_phrase() {
    let fx = fixture(PathBuf::from("no-audio"));
    let user = fx
        .users
        .add_user(NewUser {
            telegram_id: ADMIN_CHAT,
            name: "Вася".to_string(),
            email: "vasya@example.com".to_string(),
            age: 30,
        })
        .await
        .expect("add failed");
    fx.users
        .assign_role(user.id, "Admin")
        .await
        .expect("assign failed");

    fx.router
        .dispatch(&direct("/addphrase зачем;Затем!"))
        .await
        .expect("dispatch failed");
    settle().await;
    fx.router
        .dispatch(&direct("а зачем это всё"))
        .await
        .expect("dispatch failed");
    settle().await;

    let texts = fx.transport.texts();
    assert_eq!(texts[0], (ADMIN_CHAT, "Фраза 'зачем' добавлена!".to_string()));
    assert_eq!(texts[1], (ADMIN_CHAT, "Затем!".to_string()));
}

#[tokio::test]
async fn group_phrase_answered_without_mention() {
    let fx = fixture(PathBuf::from("no-audio"));
    let claimed = fx
        .router
        .dispatch(&group("банда собирается вечером"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert!(claimed);
    assert_eq!(
        fx.transport.texts(),
        vec![(GROUP_CHAT, "Банда в сборе!".to_string())]
    );
}

#[tokio::test]
async fn keyword_in_group_needs_mention() {
    let fx = fixture(PathBuf::from("no-audio"));
    let silent = fx
        .router
        .dispatch(&group("привет"))
        .await
        .expect("dispatch failed");
    settle().await;
    assert!(!silent);
    assert!(fx.transport.texts().is_empty());

    fx.router
        .dispatch(&group("привет @banda_bot"))
        .await
        .expect("dispatch failed");
    settle().await;
    assert_eq!(
        fx.transport.texts(),
        vec![(GROUP_CHAT, "И тебе привет!".to_string())]
    );
}

#[tokio::test]
async fn tag_without_target_gets_usage_hint() {
    let fx = fixture(PathBuf::from("no-audio"));
    fx.router
        .dispatch(&direct("позови"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert_eq!(
        fx.transport.texts(),
        vec![(
            ADMIN_CHAT,
            "Используй так: позови @никнейм @bot_name".to_string()
        )]
    );
}

#[tokio::test]
async fn tag_reply_substitutes_target_username() {
    let fx = fixture(PathBuf::from("no-audio"));
    fx.router
        .dispatch(&direct("позови @misha"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert_eq!(
        fx.transport.texts(),
        vec![(ADMIN_CHAT, "@misha, тебя зовут!".to_string())]
    );
}

#[tokio::test]
async fn unknown_direct_text_gets_fallback() {
    let fx = fixture(PathBuf::from("no-audio"));
    let claimed = fx
        .router
        .dispatch(&direct("абракадабра"))
        .await
        .expect("dispatch failed");
    settle().await;

    assert!(!claimed);
    assert_eq!(
        fx.transport.texts(),
        vec![(ADMIN_CHAT, "Не знаю такой команды 😅.".to_string())]
    );
}

#[tokio::test]
async fn callback_runs_named_sticker_and_is_acknowledged() {
    let fx = fixture(PathBuf::from("no-audio"));
    let event = InboundEvent::from_callback(CallbackEvent {
        callback_id: "cb-7".to_string(),
        chat_id: ADMIN_CHAT,
        sender_id: ADMIN_CHAT,
        sender_name: "Вася".to_string(),
        payload: "banda".to_string(),
    });

    let claimed = fx.router.dispatch(&event).await.expect("dispatch failed");
    settle().await;

    assert!(claimed);
    assert_eq!(fx.transport.stickers.lock().expect("lock poisoned").len(), 1);
    assert_eq!(
        *fx.transport.answered.lock().expect("lock poisoned"),
        vec!["cb-7".to_string()]
    );
}

#[tokio::test]
async fn audio_cache_hit_resends_by_id_without_upload() {
    let dir = std::env::temp_dir().join(format!("banda-audio-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.expect("mkdir failed");
    let bytes = b"fake mp3 bytes".to_vec();
    tokio::fs::write(dir.join("гимн.mp3"), &bytes)
        .await
        .expect("write failed");

    let fx = fixture(dir.clone());
    let hash: String = Sha256::digest(&bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    fx.audio
        .add(AudioRecord {
            key: "гимн".to_string(),
            file_id: "cached-id".to_string(),
            file_hash: hash,
            created_at: Utc::now(),
        })
        .await
        .expect("seed failed");

    let claimed = fx
        .router
        .dispatch(&direct("Гимн"))
        .await
        .expect("dispatch failed");

    assert!(claimed);
    assert_eq!(
        *fx.transport.audio_cached.lock().expect("lock poisoned"),
        vec!["cached-id".to_string()]
    );
    assert!(fx.transport.audio_uploads.lock().expect("lock poisoned").is_empty());

    tokio::fs::remove_dir_all(&dir).await.expect("cleanup failed");
}

#[tokio::test]
async fn changed_audio_file_is_reuploaded_and_recorded() {
    let dir = std::env::temp_dir().join(format!("banda-audio-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.expect("mkdir failed");
    tokio::fs::write(dir.join("гимн.mp3"), b"new content")
        .await
        .expect("write failed");

    let fx = fixture(dir.clone());
    fx.audio
        .add(AudioRecord {
            key: "гимн".to_string(),
            file_id: "stale-id".to_string(),
            file_hash: "0000".to_string(),
            created_at: Utc::now(),
        })
        .await
        .expect("seed failed");

    let claimed = fx
        .router
        .dispatch(&direct("гимн"))
        .await
        .expect("dispatch failed");

    assert!(claimed);
    assert_eq!(
        *fx.transport.audio_uploads.lock().expect("lock poisoned"),
        vec!["гимн.mp3".to_string()]
    );
    let record = fx
        .audio
        .get_by_key("гимн")
        .await
        .expect("lookup failed")
        .expect("record missing");
    assert_eq!(record.file_id, "fresh-file-id");

    tokio::fs::remove_dir_all(&dir).await.expect("cleanup failed");
}

#[tokio::test]
async fn commands_listing_goes_to_sender_privately() {
    let fx = fixture(PathBuf::from("no-audio"));
    let event = InboundEvent::from_message(MessageEvent {
        chat_id: GROUP_CHAT,
        chat_kind: ChatKind::Group,
        sender_id: 99,
        sender_name: "Вася".to_string(),
        text: "/commands @banda_bot".to_string(),
        content: ContentKind::Text,
    });

    let claimed = fx.router.dispatch(&event).await.expect("dispatch failed");
    settle().await;

    assert!(claimed);
    let texts = fx.transport.texts();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, 99, "listing must go to the sender, not the group");
    assert!(texts[0].1.contains("Доступные команды"));
}
