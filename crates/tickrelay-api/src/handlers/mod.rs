//! Route handlers.

pub mod fallback;
pub mod health;
pub mod status;
pub mod ticker;
pub mod ws;
