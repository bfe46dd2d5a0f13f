//! Bounded FIFO queue with drop-oldest overflow behavior.
//!
//! Producers never block: pushing into a full queue evicts the oldest unsent
//! item instead of rejecting the new one. A single consumer drains the queue
//! in admission order.

use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::transport::InlineKeyboard;

/// One admitted outbound message, consumed exactly once by the dispatcher
/// loop.
#[derive(Debug)]
pub struct SendRequest {
    /// Recipient chat
    pub chat_id: i64,
    /// Text payload
    pub text: String,
    /// Optional inline keyboard
    pub keyboard: Option<InlineKeyboard>,
    /// Aborts this request's delivery attempt(s) when triggered
    pub cancel: Option<CancellationToken>,
}

/// Bounded drop-oldest queue of [`SendRequest`]s.
pub struct SendQueue {
    items: Mutex<VecDeque<SendRequest>>,
    notify: Notify,
    capacity: usize,
}

impl SendQueue {
    /// Create a queue holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a request, evicting the oldest queued item when full.
    pub async fn push(&self, request: SendRequest) {
        {
            let mut items = self.items.lock().await;
            if items.len() >= self.capacity {
                if let Some(evicted) = items.pop_front() {
                    debug!(
                        "Outbound queue full, dropping oldest item for chat {}",
                        evicted.chat_id
                    );
                }
            }
            items.push_back(request);
        }
        self.notify.notify_one();
    }

    /// Remove and return the oldest request, waiting if the queue is empty.
    pub async fn pop(&self) -> SendRequest {
        loop {
            if let Some(request) = self.items.lock().await.pop_front() {
                return request;
            }
            // notify_one stores a permit when nobody waits, so a push racing
            // with this await cannot be lost.
            self.notify.notified().await;
        }
    }

    /// Current queue length.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the queue is currently empty.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}
