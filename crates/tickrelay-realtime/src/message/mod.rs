//! Message types: validated tick envelopes, server control messages, and
//! transport frames.

pub mod frame;
pub mod tick;
pub mod types;

pub use frame::{InboundFrame, OutboundFrame};
pub use tick::{TickBatch, TickMessage};
pub use types::ServerMessage;
