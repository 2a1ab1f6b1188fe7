//! Fan-out of tick messages to every open connection.

pub mod engine;

pub use engine::{BroadcastEngine, BroadcastReport};
