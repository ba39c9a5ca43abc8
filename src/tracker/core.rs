//! Message tracker handle.
//!
//! The [`MessageTracker`] owns the sent and received lists, the client
//! directory and the channel into the coordinator task. Hub connections
//! wrapped by it report every exchange into those lists.
//!
//! # Example
//!
//! ```no_run
//! use samp_tracker::{ClientRegistry, MessageTracker};
//!
//! # async fn example(base: impl samp_tracker::HubConnection) -> samp_tracker::Result<()> {
//! let registry = ClientRegistry::new();
//! let tracker = MessageTracker::builder().registry(registry).build()?;
//!
//! let connection = tracker.wrap(base);
//! // ... use `connection` exactly like the base connection ...
//!
//! for tx in tracker.sent().snapshot() {
//!     println!("{} -> {}: {}", tx.sender().label(), tx.receiver().label(), tx.status());
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ClientId, MsgTag};
use crate::protocol::Client;
use crate::transport::{ClientDirectory, HubConnection};

use super::builder::TrackerBuilder;
use super::connection::TrackingConnection;
use super::coordinator::{Coordinator, TrackerCommand};
use super::list::TransmissionList;

// ============================================================================
// Types
// ============================================================================

/// State shared between the tracker handle and its wrappers.
pub(crate) struct TrackerInner {
    /// Label carried in log lines.
    pub name: String,
    /// Channel into the coordinator.
    command_tx: mpsc::UnboundedSender<TrackerCommand>,
    /// Registered clients.
    directory: Arc<dyn ClientDirectory>,
    /// Transmissions this client sent.
    pub sent: TransmissionList,
    /// Transmissions this client received.
    pub received: TransmissionList,
}

impl TrackerInner {
    /// Posts a bookkeeping step to the coordinator.
    ///
    /// Never fails: after shutdown the step is dropped and logged, and the
    /// hub operation that produced it carries on regardless.
    pub(crate) fn post(&self, command: TrackerCommand) {
        let name = command.name();
        trace!(tracker = %self.name, command = name, "Posting command");
        if self.command_tx.send(command).is_err() {
            warn!(tracker = %self.name, command = name, "Tracker closed, bookkeeping dropped");
        }
    }

    /// Looks up a client, logging unknown IDs.
    pub(crate) fn lookup(&self, client_id: &ClientId) -> Option<Arc<Client>> {
        let client = self.directory.lookup(client_id);
        if client.is_none() {
            debug!(tracker = %self.name, client = %client_id, "Unknown client, exchange not tracked");
        }
        client
    }
}

// ============================================================================
// MessageTracker
// ============================================================================

/// Tracker for messages sent and received over wrapped hub connections.
///
/// Cheap to clone; clones share the same lists and coordinator.
///
/// # Examples
///
/// ```no_run
/// use samp_tracker::{ClientRegistry, MessageTracker};
///
/// # async fn example() -> samp_tracker::Result<()> {
/// let tracker = MessageTracker::builder()
///     .registry(ClientRegistry::new())
///     .name("viewer")
///     .build()?;
///
/// tracker.sent().add_listener(Box::new(|event| {
///     println!("sent list changed at {}", event.index());
/// }));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MessageTracker {
    /// Shared inner state.
    pub(crate) inner: Arc<TrackerInner>,
}

// ============================================================================
// MessageTracker - Display
// ============================================================================

impl fmt::Debug for MessageTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageTracker")
            .field("name", &self.inner.name)
            .field("sent", &self.inner.sent.len())
            .field("received", &self.inner.received.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MessageTracker - Constructor
// ============================================================================

impl MessageTracker {
    /// Creates a builder for configuring a tracker.
    #[inline]
    #[must_use]
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    /// Creates a tracker and spawns its coordinator task.
    ///
    /// Must be called inside a tokio runtime.
    pub(crate) fn new(name: String, directory: Arc<dyn ClientDirectory>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let sent = TransmissionList::new();
        let received = TransmissionList::new();

        let coordinator = Coordinator::new(name.clone(), sent.clone(), received.clone());
        tokio::spawn(coordinator.run(command_rx));

        debug!(tracker = %name, "Tracker created");

        Self {
            inner: Arc::new(TrackerInner {
                name,
                command_tx,
                directory,
                sent,
                received,
            }),
        }
    }
}

// ============================================================================
// MessageTracker - Accessors
// ============================================================================

impl MessageTracker {
    /// Returns the tracker label.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the list of transmissions this client sent.
    #[inline]
    #[must_use]
    pub fn sent(&self) -> &TransmissionList {
        &self.inner.sent
    }

    /// Returns the list of transmissions this client received.
    #[inline]
    #[must_use]
    pub fn received(&self) -> &TransmissionList {
        &self.inner.received
    }

    /// Returns `true` once the coordinator has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.command_tx.is_closed()
    }
}

// ============================================================================
// MessageTracker - Operations
// ============================================================================

impl MessageTracker {
    /// Wraps a hub connection so its traffic is tracked.
    ///
    /// The wrapper identifies this client by the base connection's
    /// registered ID. A tracker may wrap successive connections; they all
    /// report into the same lists.
    pub fn wrap<C: HubConnection>(&self, base: C) -> TrackingConnection<C> {
        TrackingConnection::new(base, Arc::clone(&self.inner))
    }

    /// Waits until every bookkeeping step posted so far has been applied.
    ///
    /// # Errors
    ///
    /// - [`Error::TrackerClosed`] if the coordinator has stopped
    /// - [`Error::ChannelClosed`] if it stopped before answering
    pub async fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(TrackerCommand::Flush(reply_tx))
            .map_err(|_| Error::TrackerClosed)?;
        reply_rx.await?;
        Ok(())
    }

    /// Returns the tags of broadcasts still awaiting responses.
    ///
    /// Reflects every step posted before the call.
    ///
    /// # Errors
    ///
    /// - [`Error::TrackerClosed`] if the coordinator has stopped
    /// - [`Error::ChannelClosed`] if it stopped before answering
    pub async fn active_broadcasts(&self) -> Result<Vec<MsgTag>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(TrackerCommand::ActiveBroadcasts(reply_tx))
            .map_err(|_| Error::TrackerClosed)?;
        let mut tags = reply_rx.await?;
        tags.sort();
        Ok(tags)
    }

    /// Stops the coordinator after it has applied all earlier steps.
    ///
    /// Wrapped connections keep working; their bookkeeping is dropped.
    pub fn shutdown(&self) {
        debug!(tracker = %self.inner.name, "Tracker shutting down");
        let _ = self.inner.command_tx.send(TrackerCommand::Shutdown);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tracker::broadcast::SessionId;
    use crate::transport::ClientRegistry;

    fn tracker() -> MessageTracker {
        MessageTracker::new("test".into(), Arc::new(ClientRegistry::new()))
    }

    #[tokio::test]
    async fn test_new_tracker_is_empty() {
        let tracker = tracker();
        assert_eq!(tracker.name(), "test");
        assert!(tracker.sent().is_empty());
        assert!(tracker.received().is_empty());
        tracker.flush().await.expect("flush");
        assert!(tracker.active_broadcasts().await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_tracker() {
        let tracker = tracker();
        tracker.shutdown();

        let result = tracker.flush().await;
        assert!(matches!(
            result,
            Err(Error::TrackerClosed | Error::ChannelClosed(_))
        ));

        // Wait for the coordinator to drop its receiver.
        for _ in 0..100 {
            if tracker.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(tracker.is_closed());
        assert!(matches!(tracker.flush().await, Err(Error::TrackerClosed)));
    }

    #[tokio::test]
    async fn test_post_after_shutdown_is_harmless() {
        let tracker = tracker();
        tracker.shutdown();
        tracker
            .inner
            .post(TrackerCommand::OpenBroadcast {
                msg_tag: MsgTag::new("late"),
                session: SessionId::next(),
            });
    }

    #[tokio::test]
    async fn test_lookup_unknown_client() {
        let tracker = tracker();
        assert!(tracker.inner.lookup(&ClientId::new("ghost")).is_none());
    }
}
