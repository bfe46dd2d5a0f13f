use async_trait::async_trait;
use banda_bot::outbound::transport::{AudioPayload, ChatActivity, InlineKeyboard, QuizSpec};
use banda_bot::outbound::{DispatchConfig, MessageDispatcher, Outbound, SendError};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// Transport that records deliveries and can fail a configured number of
/// leading attempts.
#[derive(Default)]
struct ScriptedTransport {
    sent: Mutex<Vec<(i64, String)>>,
    /// Errors returned before sends start succeeding, consumed front first.
    failures: Mutex<Vec<SendError>>,
    /// Per-attempt artificial delay, to keep the consumer busy.
    send_delay: Option<Duration>,
}

impl ScriptedTransport {
    fn with_failures(failures: Vec<SendError>) -> Self {
        Self {
            failures: Mutex::new(failures),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Outbound for ScriptedTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), SendError> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        let next_failure = {
            let mut failures = self.failures.lock().expect("lock poisoned");
            if failures.is_empty() {
                None
            } else {
                Some(failures.remove(0))
            }
        };
        if let Some(err) = next_failure {
            return Err(err);
        }
        self.sent
            .lock()
            .expect("lock poisoned")
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_sticker(&self, _: i64, _: &str) -> Result<(), SendError> {
        Ok(())
    }
    async fn send_dice(&self, _: i64, _: &str) -> Result<(), SendError> {
        Ok(())
    }
    async fn send_quiz(&self, _: i64, _: &QuizSpec) -> Result<(), SendError> {
        Ok(())
    }
    async fn send_audio(&self, _: i64, _: AudioPayload) -> Result<Option<String>, SendError> {
        Ok(None)
    }
    async fn send_chat_action(&self, _: i64, _: ChatActivity) -> Result<(), SendError> {
        Ok(())
    }
    async fn answer_callback(&self, _: &str) -> Result<(), SendError> {
        Ok(())
    }
    async fn set_my_commands(&self, _: &[(String, String)]) -> Result<(), SendError> {
        Ok(())
    }
}

fn config(cooldown_ms: u64, dedup_ms: u64) -> DispatchConfig {
    DispatchConfig {
        queue_capacity: 16,
        cooldown: Duration::from_millis(cooldown_ms),
        dedup_window: Duration::from_millis(dedup_ms),
        pacing: Duration::from_millis(5),
        default_retry_delay: Duration::from_millis(10),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn recipient_cooldown_drops_but_other_chats_pass() {
    let transport = Arc::new(ScriptedTransport::default());
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(500, 1));

    dispatcher.enqueue(1, "первое").await;
    dispatcher.enqueue(1, "второе").await;
    dispatcher.enqueue(2, "другому").await;
    settle().await;

    assert_eq!(
        transport.sent(),
        vec![(1, "первое".to_string()), (2, "другому".to_string())],
        "second message to a cooling-down chat must be dropped"
    );
    dispatcher.shutdown();
}

#[tokio::test]
async fn repeated_content_deduplicated_within_window() {
    let transport = Arc::new(ScriptedTransport::default());
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(30, 500));

    dispatcher.enqueue(1, "повтор").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    // Cooldown has expired, only the dedup window should reject this.
    dispatcher.enqueue(1, "повтор").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    dispatcher.enqueue(1, "другое").await;
    settle().await;

    assert_eq!(
        transport.sent(),
        vec![(1, "повтор".to_string()), (1, "другое".to_string())]
    );
    dispatcher.shutdown();
}

#[tokio::test]
async fn full_queue_evicts_oldest_pending() {
    let transport = Arc::new(ScriptedTransport {
        send_delay: Some(Duration::from_millis(100)),
        ..ScriptedTransport::default()
    });
    let dispatcher = MessageDispatcher::spawn(
        transport.clone(),
        DispatchConfig {
            queue_capacity: 2,
            cooldown: Duration::from_millis(1),
            dedup_window: Duration::from_millis(1),
            pacing: Duration::from_millis(5),
            default_retry_delay: Duration::from_millis(10),
        },
    );

    dispatcher.enqueue(1, "в работе").await;
    // Let the consumer pick up the first message before filling the queue.
    tokio::time::sleep(Duration::from_millis(30)).await;
    dispatcher.enqueue(2, "будет вытеснено").await;
    dispatcher.enqueue(3, "останется").await;
    dispatcher.enqueue(4, "новое").await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(
        transport.sent(),
        vec![
            (1, "в работе".to_string()),
            (3, "останется".to_string()),
            (4, "новое".to_string()),
        ],
        "oldest queued message must be evicted, newest kept"
    );
    dispatcher.shutdown();
}

#[tokio::test]
async fn throttled_delivery_retried_exactly_once() {
    let transport = Arc::new(ScriptedTransport::with_failures(vec![
        SendError::Throttled {
            retry_after: Some(Duration::from_millis(20)),
        },
    ]));
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(1, 1));

    dispatcher.enqueue(1, "с повтором").await;
    settle().await;

    assert_eq!(transport.sent(), vec![(1, "с повтором".to_string())]);
    dispatcher.shutdown();
}

#[tokio::test]
async fn second_throttle_drops_message_and_loop_continues() {
    let transport = Arc::new(ScriptedTransport::with_failures(vec![
        SendError::Throttled { retry_after: None },
        SendError::Throttled {
            retry_after: Some(Duration::from_millis(10)),
        },
    ]));
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(1, 1));

    dispatcher.enqueue(1, "не дойдёт").await;
    settle().await;
    dispatcher.enqueue(2, "дойдёт").await;
    settle().await;

    assert_eq!(
        transport.sent(),
        vec![(2, "дойдёт".to_string())],
        "a message throttled twice is dropped without blocking the queue"
    );
    dispatcher.shutdown();
}

#[tokio::test]
async fn delivery_failure_never_stops_the_consumer() {
    let transport = Arc::new(ScriptedTransport::with_failures(vec![SendError::Failed(
        "boom".to_string(),
    )]));
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(1, 1));

    dispatcher.enqueue(1, "упадёт").await;
    settle().await;
    dispatcher.enqueue(2, "пройдёт").await;
    settle().await;

    assert_eq!(transport.sent(), vec![(2, "пройдёт".to_string())]);
    dispatcher.shutdown();
}

#[tokio::test]
async fn blank_messages_never_reach_the_transport() {
    let transport = Arc::new(ScriptedTransport::default());
    let dispatcher = MessageDispatcher::spawn(transport.clone(), config(1, 1));

    dispatcher.enqueue(1, "").await;
    dispatcher.enqueue(1, "  \n\t ").await;
    settle().await;

    assert!(transport.sent().is_empty());
    dispatcher.shutdown();
}
