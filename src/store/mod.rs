//! Persistence traits and their in-memory implementations.
//!
//! Handlers depend only on the traits; the in-memory stores back them with
//! `RwLock`-guarded maps plus short-lived moka caches for the derived views
//! that are rebuilt on every read (compiled keyword patterns, tag variants).

pub mod audio;
pub mod phrases;
pub mod users;

pub use audio::{AudioRecord, AudioStore, InMemoryAudioStore};
pub use phrases::{CompiledKeyword, InMemoryPhraseStore, Phrase, PhraseCategory, PhraseStore};
pub use users::{InMemoryUserStore, NewUser, User, UserStore};
