//! Connection registry: the authoritative set of open connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use tickrelay_core::types::ConnectionId;

use super::handle::Connection;
use crate::error::RelayError;

/// Thread-safe set of registered connections, keyed by id.
///
/// Once [`ConnectionRegistry::close`] is called no further connections are
/// admitted; existing entries remain until the lifecycle manager removes them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    by_id: DashMap<ConnectionId, Arc<Connection>>,
    closed: AtomicBool,
}

impl ConnectionRegistry {
    /// Creates an empty, open registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection.
    pub fn add(&self, connection: Arc<Connection>) -> Result<(), RelayError> {
        if self.is_closed() {
            return Err(RelayError::RegistryClosed);
        }

        let id = connection.id;
        match self.by_id.entry(id) {
            Entry::Occupied(_) => return Err(RelayError::DuplicateConnection(id)),
            Entry::Vacant(slot) => {
                slot.insert(connection);
            }
        }

        // A concurrent close() may have taken its snapshot before the insert.
        if self.is_closed() {
            self.by_id.remove(&id);
            return Err(RelayError::RegistryClosed);
        }
        Ok(())
    }

    /// Removes a connection. Removing an absent id is a no-op.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.by_id.remove(id).map(|(_, connection)| connection)
    }

    /// Looks up a connection by id.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of all registered connections.
    ///
    /// Later adds and removes do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of registered connections.
    pub fn size(&self) -> usize {
        self.by_id.len()
    }

    /// Stops admitting new connections.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the registry has stopped admitting connections.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
