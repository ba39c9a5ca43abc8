//! Client registry.
//!
//! Maps client IDs to the latest known [`Client`] descriptor. Whoever
//! follows the hub's registration events keeps it current; the tracker
//! only ever reads from it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::identifiers::ClientId;
use crate::protocol::{Client, Metadata, Subscriptions};

// ============================================================================
// ClientDirectory
// ============================================================================

/// Read-only view of the registered clients.
///
/// Implementations must be safe to query from any task.
pub trait ClientDirectory: Send + Sync {
    /// Looks up a client by ID.
    ///
    /// `None` means the client is unknown, which is normal while the
    /// registry lags behind the hub.
    fn lookup(&self, client_id: &ClientId) -> Option<Arc<Client>>;
}

// ============================================================================
// ClientRegistry
// ============================================================================

/// In-memory, thread-safe [`ClientDirectory`].
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    /// Known clients by ID.
    clients: Arc<RwLock<FxHashMap<ClientId, Arc<Client>>>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a client.
    pub fn insert(&self, client: Client) {
        self.clients
            .write()
            .insert(client.id.clone(), Arc::new(client));
    }

    /// Removes a client, returning its last descriptor.
    pub fn remove(&self, client_id: &ClientId) -> Option<Arc<Client>> {
        self.clients.write().remove(client_id)
    }

    /// Replaces the metadata of a known client.
    ///
    /// Returns `false` if the client is unknown.
    pub fn update_metadata(&self, client_id: &ClientId, metadata: Metadata) -> bool {
        self.update(client_id, |client| client.metadata = Some(metadata))
    }

    /// Replaces the subscriptions of a known client.
    ///
    /// Returns `false` if the client is unknown.
    pub fn update_subscriptions(&self, client_id: &ClientId, subscriptions: Subscriptions) -> bool {
        self.update(client_id, |client| client.subscriptions = Some(subscriptions))
    }

    /// Returns the number of known clients.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns `true` if no clients are known.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Swaps in a modified copy of a descriptor.
    ///
    /// Descriptors already captured by transmissions keep their old state.
    fn update(&self, client_id: &ClientId, apply: impl FnOnce(&mut Client)) -> bool {
        let mut clients = self.clients.write();
        let Some(existing) = clients.get(client_id) else {
            return false;
        };
        let mut client = Client::clone(existing);
        apply(&mut client);
        clients.insert(client_id.clone(), Arc::new(client));
        true
    }
}

impl ClientDirectory for ClientRegistry {
    fn lookup(&self, client_id: &ClientId) -> Option<Arc<Client>> {
        self.clients.read().get(client_id).cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
