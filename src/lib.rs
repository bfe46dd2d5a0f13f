#![deny(missing_docs)]
//! Banda Bot - Telegram chat-bot backend
//!
//! Inbound updates run through an ordered handler chain (admin commands,
//! canned commands, keyword/tag triggers, audio lookups); outbound replies
//! funnel through a single-writer dispatcher that rate-limits per recipient,
//! deduplicates repeated content and retries once on provider throttling.

/// Role-based permission gate
pub mod access;
/// Configuration management
pub mod config;
/// Normalized inbound events
pub mod event;
/// Update handler chain
pub mod handlers;
/// Outbound dispatcher, admission control and transport boundary
pub mod outbound;
/// Inbound update routing
pub mod router;
/// User, phrase and audio stores
pub mod store;
/// Teloxide transport implementation and update normalization
pub mod telegram;
