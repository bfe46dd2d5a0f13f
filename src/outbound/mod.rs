//! Outbound message path: admission control, bounded queue, single-writer
//! dispatcher and the transport boundary it forwards to.

/// Rate-limit and dedup admission checks
pub mod admission;
/// Single-consumer dispatcher loop
pub mod dispatcher;
/// Bounded drop-oldest queue
pub mod queue;
/// Transport trait and error taxonomy
pub mod transport;

pub use admission::AdmissionControl;
pub use dispatcher::{DispatchConfig, MessageDispatcher};
pub use queue::SendQueue;
pub use transport::{ChatActivity, InlineKeyboard, Outbound, SendError};
