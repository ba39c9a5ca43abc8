//! Observable, append-only transmission collection.
//!
//! Each tracker keeps two of these: one for transmissions this client
//! sent and one for those it received. Observers register a
//! [`ListListener`] and are told about every append and every later
//! completion of a contained transmission, by position.
//!
//! # Events
//!
//! | Event | Fired when |
//! |-------|------------|
//! | [`ListEvent::Added`] | A transmission is appended at the tail |
//! | [`ListEvent::Changed`] | A contained transmission responds or fails |

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::error;

use crate::identifiers::ListenerId;

use super::transmission::{Status, Transmission};

// ============================================================================
// Types
// ============================================================================

/// Callback receiving list events.
///
/// Called on the tracker's coordinator task. Listeners must not add or
/// remove listeners on the same list from inside the callback.
pub type ListListener = Box<dyn Fn(&ListEvent) + Send + Sync>;

// ============================================================================
// ListEvent
// ============================================================================

/// Change notification for a [`TransmissionList`].
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// A transmission was appended.
    Added {
        /// Position of the new transmission.
        index: usize,
        /// The appended transmission.
        transmission: Arc<Transmission>,
    },

    /// A contained transmission reached a terminal status.
    Changed {
        /// Position of the transmission.
        index: usize,
        /// The completed transmission.
        transmission: Arc<Transmission>,
    },
}

impl ListEvent {
    /// Returns the affected position.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Added { index, .. } | Self::Changed { index, .. } => *index,
        }
    }

    /// Returns the affected transmission.
    #[inline]
    #[must_use]
    pub fn transmission(&self) -> &Arc<Transmission> {
        match self {
            Self::Added { transmission, .. } | Self::Changed { transmission, .. } => transmission,
        }
    }
}

// ============================================================================
// TransmissionList
// ============================================================================

/// Shared state behind a list handle.
struct ListInner {
    /// Transmissions in insertion order.
    items: RwLock<Vec<Arc<Transmission>>>,
    /// Registered observers.
    listeners: Mutex<Vec<(ListenerId, ListListener)>>,
}

impl ListInner {
    /// Delivers an event to every listener.
    ///
    /// A panicking listener is logged and skipped; the others still run.
    fn emit(&self, event: &ListEvent) {
        let listeners = self.listeners.lock();
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(listener = ?id, index = event.index(), "List listener panicked");
            }
        }
    }
}

/// Ordered, observable sequence of transmissions.
///
/// Cheap to clone; clones observe the same sequence. Only the tracker
/// appends; entries are never removed or reordered.
#[derive(Clone)]
pub struct TransmissionList {
    inner: Arc<ListInner>,
}

impl Default for TransmissionList {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmissionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ListInner {
                items: RwLock::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the number of transmissions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    /// Returns `true` if the list is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    /// Returns the transmission at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Arc<Transmission>> {
        self.inner.items.read().get(index).cloned()
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Transmission>> {
        self.inner.items.read().clone()
    }

    /// Returns the number of transmissions still waiting.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.inner
            .items
            .read()
            .iter()
            .filter(|t| t.status() == Status::Waiting)
            .count()
    }

    /// Registers an observer.
    pub fn add_listener(&self, listener: ListListener) -> ListenerId {
        let id = ListenerId::next();
        self.inner.listeners.lock().push((id, listener));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Appends a transmission and starts watching it for completion.
    pub(crate) fn append(&self, transmission: Arc<Transmission>) {
        let index = {
            let mut items = self.inner.items.write();
            items.push(Arc::clone(&transmission));
            items.len() - 1
        };

        // Weak, so a dropped list does not stay alive through its entries.
        let weak = Arc::downgrade(&self.inner);
        transmission.on_terminal(Box::new(move |_| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let entry = inner.items.read().get(index).cloned();
            if let Some(transmission) = entry {
                inner.emit(&ListEvent::Changed {
                    index,
                    transmission,
                });
            }
        }));

        self.inner.emit(&ListEvent::Added {
            index,
            transmission,
        });
    }

    /// Returns the first waiting transmission matching `predicate`.
    pub(crate) fn find_waiting(
        &self,
        predicate: impl Fn(&Transmission) -> bool,
    ) -> Option<Arc<Transmission>> {
        self.inner
            .items
            .read()
            .iter()
            .find(|t| t.status() == Status::Waiting && predicate(t))
            .cloned()
    }
}

impl std::fmt::Debug for TransmissionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransmissionList")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
