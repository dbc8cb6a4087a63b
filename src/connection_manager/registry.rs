use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::types::{ConnectionHandle, RegistryError};

/// Process-wide mapping from logged-in name to its live connection
pub struct ClientRegistry {
    /// name -> ConnectionHandle
    clients: DashMap<String, Arc<ConnectionHandle>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Claim `name` for `handle` if nobody holds it.
    ///
    /// Concurrent claims on the same name resolve to exactly one winner; the
    /// losers leave the registry untouched.
    pub fn register(&self, name: &str, handle: Arc<ConnectionHandle>) -> Result<(), RegistryError> {
        match self.clients.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::NameTaken(name.to_string())),
            Entry::Vacant(slot) => {
                tracing::info!(connection_id = %handle.id, name = %name, "Identity registered");
                slot.insert(handle);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ConnectionHandle>> {
        self.clients.get(name).map(|h| h.clone())
    }

    /// Release `name`. No-op if it is not registered.
    pub fn unregister(&self, name: &str) {
        if let Some((_, handle)) = self.clients.remove(name) {
            tracing::info!(connection_id = %handle.id, name = %name, "Identity unregistered");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
