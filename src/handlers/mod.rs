//! The handler chain: each inbound event is offered to handlers in order
//! until one claims it.

pub mod admin;
pub mod audio;
pub mod command;
pub mod group;
pub mod keyword;
pub mod sticker;
pub mod tag;

use anyhow::Result;
use async_trait::async_trait;
use rand::RngExt;

use crate::event::InboundEvent;

pub use admin::AdminHandler;
pub use audio::AudioHandler;
pub use command::CommandHandler;
pub use group::GroupKeywordHandler;
pub use keyword::KeywordHandler;
pub use sticker::StickerHandler;
pub use tag::TagHandler;

/// A single link in the handler chain.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Offer the event to this handler. `text` is the message text with any
    /// bot mention already stripped. Returns `true` when the event is
    /// claimed and the chain should stop.
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool>;

    /// Whether this handler also runs for group messages that do not
    /// mention the bot.
    fn group_eligible(&self) -> bool {
        false
    }
}

/// Picks one variant out of `len`. Abstracted so tests can pin the choice.
pub trait VariantPicker: Send + Sync {
    /// Return an index in `0..len`. `len` must be non-zero.
    fn pick(&self, len: usize) -> usize;
}

/// [`VariantPicker`] backed by the thread-local RNG.
#[derive(Default)]
pub struct RandomPicker;

impl VariantPicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}
