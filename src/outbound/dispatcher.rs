//! Single-writer outbound dispatcher.
//!
//! Producers call [`MessageDispatcher::enqueue`] concurrently; one long-lived
//! consumer task drains the bounded queue, pacing deliveries and retrying
//! exactly once when the provider reports throttling. Delivery failures are
//! never surfaced to producers: `enqueue` already returned by the time the
//! send happens, so the contract is fire-and-forget by design.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::admission::AdmissionControl;
use super::queue::{SendQueue, SendRequest};
use super::transport::{InlineKeyboard, Outbound, SendError};
use crate::config::Settings;

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Bounded queue capacity (drop-oldest when exceeded)
    pub queue_capacity: usize,
    /// Minimum spacing between admitted sends to one recipient
    pub cooldown: Duration,
    /// Window during which identical (recipient, text) pairs are dropped
    pub dedup_window: Duration,
    /// Fixed delay between consecutive delivery attempts
    pub pacing: Duration,
    /// Retry delay used when the provider throttles without suggesting one
    pub default_retry_delay: Duration,
}

impl DispatchConfig {
    /// Build from loaded [`Settings`].
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            queue_capacity: settings.max_queue_size,
            cooldown: settings.cooldown(),
            dedup_window: settings.dedup_window(),
            pacing: settings.pacing(),
            default_retry_delay: settings.retry_delay(),
        }
    }
}

/// Outbound message dispatcher: admission control plus one consumer loop.
pub struct MessageDispatcher {
    queue: Arc<SendQueue>,
    admission: AdmissionControl,
    shutdown: CancellationToken,
}

impl MessageDispatcher {
    /// Create the dispatcher and start its consumer loop.
    #[must_use]
    pub fn spawn(transport: Arc<dyn Outbound>, config: DispatchConfig) -> Arc<Self> {
        let queue = Arc::new(SendQueue::new(config.queue_capacity));
        let shutdown = CancellationToken::new();

        tokio::spawn(consumer_loop(
            queue.clone(),
            transport,
            config.pacing,
            config.default_retry_delay,
            shutdown.clone(),
        ));

        Arc::new(Self {
            queue,
            admission: AdmissionControl::new(config.cooldown, config.dedup_window),
            shutdown,
        })
    }

    /// Enqueue a plain text reply.
    pub async fn enqueue(&self, chat_id: i64, text: impl Into<String>) {
        self.enqueue_with(chat_id, text, None, None).await;
    }

    /// Enqueue a reply with optional keyboard and cancellation.
    ///
    /// No-op on blank text. Rate admission runs first and records the
    /// recipient's cooldown even when the dedup check then rejects the
    /// message. Both rejections are silent drops; a full queue evicts its
    /// oldest item rather than this one. Never blocks on a full queue and
    /// never reports delivery errors.
    pub async fn enqueue_with(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        keyboard: Option<InlineKeyboard>,
        cancel: Option<CancellationToken>,
    ) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }

        if !self.admission.admit_rate(chat_id).await {
            debug!("Rate limit: dropping message for chat {chat_id}");
            return;
        }
        if !self.admission.admit_dedup(chat_id, &text).await {
            debug!("Dedup: dropping repeated message for chat {chat_id}");
            return;
        }

        self.queue
            .push(SendRequest {
                chat_id,
                text,
                keyboard,
                cancel,
            })
            .await;
    }

    /// Number of queued, not yet attempted requests.
    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    /// Stop the consumer loop. Queued items are not drained.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for MessageDispatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn consumer_loop(
    queue: Arc<SendQueue>,
    transport: Arc<dyn Outbound>,
    pacing: Duration,
    default_retry_delay: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            () = shutdown.cancelled() => break,
            request = queue.pop() => request,
        };

        deliver(transport.as_ref(), &request, default_retry_delay).await;

        // Fixed pacing after every attempt bounds outbound throughput to one
        // message per interval regardless of recipient.
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = sleep(pacing) => {}
        }
    }
    debug!("Outbound consumer loop stopped");
}

/// One delivery: at most the original attempt plus a single retry after a
/// throttling signal. Everything else is logged and swallowed.
async fn deliver(transport: &dyn Outbound, request: &SendRequest, default_retry_delay: Duration) {
    match attempt(transport, request).await {
        None => debug!("Send to chat {} cancelled before delivery", request.chat_id),
        Some(Ok(())) => {}
        Some(Err(SendError::Throttled { retry_after })) => {
            let delay = retry_after.unwrap_or(default_retry_delay);
            warn!(
                "Provider throttled send to chat {}, retrying once in {:?}",
                request.chat_id, delay
            );
            if wait_or_cancel(delay, request.cancel.as_ref()).await {
                debug!("Send to chat {} cancelled during retry wait", request.chat_id);
                return;
            }
            match attempt(transport, request).await {
                Some(Err(e)) => warn!(
                    "Retry for chat {} failed, dropping message: {e}",
                    request.chat_id
                ),
                None => debug!("Retry for chat {} cancelled", request.chat_id),
                Some(Ok(())) => {}
            }
        }
        Some(Err(e)) => warn!("Send to chat {} failed, dropping message: {e}", request.chat_id),
    }
}

/// Run one send attempt; `None` means the request's cancellation fired first.
async fn attempt(transport: &dyn Outbound, request: &SendRequest) -> Option<Result<(), SendError>> {
    if request
        .cancel
        .as_ref()
        .is_some_and(CancellationToken::is_cancelled)
    {
        return None;
    }
    let send = transport.send_text(request.chat_id, &request.text, request.keyboard.as_ref());
    match &request.cancel {
        Some(token) => tokio::select! {
            () = token.cancelled() => None,
            result = send => Some(result),
        },
        None => Some(send.await),
    }
}

/// Sleep for `delay`; returns `true` if the request was cancelled first.
async fn wait_or_cancel(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => tokio::select! {
            () = token.cancelled() => true,
            () = sleep(delay) => false,
        },
        None => {
            sleep(delay).await;
            false
        }
    }
}
