//! # tickrelay-core
//!
//! Core crate for TickRelay. Contains configuration schemas, typed
//! identifiers, timestamp formatting, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TickRelay crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
