//! Rate-limit and dedup admission control.
//!
//! Two independent concurrent maps gate entry into the outbound queue: a
//! per-recipient cooldown and a short-lived set of recently admitted
//! (recipient, text) pairs. Both are moka caches whose TTL does the expiry,
//! so entries never linger past their window and no per-entry timer task is
//! needed.

use moka::future::Cache;
use std::time::Duration;

/// Admission gate applied before anything enters the outbound queue.
///
/// Rate limiting runs first and its bookkeeping stands even when the dedup
/// check then rejects the message: a deduped message still consumes the
/// recipient's rate window.
pub struct AdmissionControl {
    /// chat_id -> () with TTL = cooldown; presence means "in cooldown"
    rate: Cache<i64, ()>,
    /// (chat_id, text) -> () with TTL = dedup window
    dedup: Cache<(i64, String), ()>,
}

impl AdmissionControl {
    /// Create an admission gate with the given cooldown and dedup window.
    #[must_use]
    pub fn new(cooldown: Duration, dedup_window: Duration) -> Self {
        let rate = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(cooldown)
            .build();
        let dedup = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(dedup_window)
            .build();
        Self { rate, dedup }
    }

    /// Per-recipient rate check.
    ///
    /// Returns `true` and starts the recipient's cooldown if the previous
    /// cooldown has elapsed; returns `false` otherwise. A rejected attempt
    /// does not extend the cooldown.
    pub async fn admit_rate(&self, chat_id: i64) -> bool {
        // entry() gives per-key atomic insert-if-absent; is_fresh tells us
        // whether we won the slot or hit a live cooldown entry.
        self.rate.entry(chat_id).or_insert(()).await.is_fresh()
    }

    /// Dedup check for a (recipient, text) pair.
    ///
    /// Returns `true` and records the pair if it has not been admitted
    /// within the dedup window; `false` if it has.
    pub async fn admit_dedup(&self, chat_id: i64, text: &str) -> bool {
        self.dedup
            .entry((chat_id, text.to_owned()))
            .or_insert(())
            .await
            .is_fresh()
    }
}
