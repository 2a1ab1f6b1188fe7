//! Ingest: normalizes producer updates from both inbound paths.

pub mod gateway;

pub use gateway::{IngestGateway, IngestReceipt};
