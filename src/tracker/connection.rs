//! Hub connection wrapper that tracks outbound traffic.
//!
//! [`TrackingConnection`] implements [`HubConnection`] by delegating to a
//! base connection and posting bookkeeping around each call:
//!
//! | Operation | Before delegating | After success | After failure |
//! |-----------|-------------------|---------------|---------------|
//! | `notify` | append | respond (absent) | fail |
//! | `notify_all` | - | append + respond each | - |
//! | `call` | append | wait for response | fail |
//! | `call_all` | open session | append + activate session | discard session |
//! | `call_and_wait` | append | respond | fail |
//! | `reply` | - | route reply | - |
//!
//! Transport errors are always returned to the caller unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::identifiers::{ClientId, MsgId, MsgTag};
use crate::protocol::{Client, Message, Metadata, RegInfo, Response, Subscriptions};
use crate::transport::{CallableClient, HubConnection};

use super::broadcast::SessionId;
use super::callable::TrackingCallable;
use super::coordinator::{Outcome, TrackerCommand};
use super::core::TrackerInner;
use super::transmission::Transmission;

// ============================================================================
// SelfClient
// ============================================================================

/// Descriptor of the local client, kept current with its declarations.
///
/// Transmissions capture the descriptor as it was when they were created.
#[derive(Clone)]
pub(crate) struct SelfClient {
    current: Arc<RwLock<Arc<Client>>>,
}

impl SelfClient {
    /// Creates a descriptor with nothing declared.
    pub(crate) fn new(id: ClientId) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(Client::new(id)))),
        }
    }

    /// Returns the current descriptor.
    #[inline]
    pub(crate) fn get(&self) -> Arc<Client> {
        Arc::clone(&self.current.read())
    }

    /// Records newly declared metadata.
    pub(crate) fn set_metadata(&self, metadata: Metadata) {
        self.replace(|client| client.metadata = Some(metadata));
    }

    /// Records newly declared subscriptions.
    pub(crate) fn set_subscriptions(&self, subscriptions: Subscriptions) {
        self.replace(|client| client.subscriptions = Some(subscriptions));
    }

    fn replace(&self, apply: impl FnOnce(&mut Client)) {
        let mut current = self.current.write();
        let mut client = Client::clone(&current);
        apply(&mut client);
        *current = Arc::new(client);
    }
}

// ============================================================================
// TrackingConnection
// ============================================================================

/// A [`HubConnection`] that records every exchange in its tracker.
///
/// Created with [`MessageTracker::wrap`](crate::MessageTracker::wrap).
pub struct TrackingConnection<C> {
    /// Wrapped connection.
    base: C,
    /// Owning tracker.
    tracker: Arc<TrackerInner>,
    /// This client's descriptor.
    self_client: SelfClient,
}

impl<C: HubConnection> TrackingConnection<C> {
    /// Wraps `base`, identifying this client by its registered ID.
    pub(crate) fn new(base: C, tracker: Arc<TrackerInner>) -> Self {
        let self_client = SelfClient::new(base.reg_info().self_id.clone());
        Self {
            base,
            tracker,
            self_client,
        }
    }
}

impl<C> TrackingConnection<C> {
    /// Returns the wrapped connection.
    #[inline]
    #[must_use]
    pub fn base(&self) -> &C {
        &self.base
    }

    /// Returns this client's descriptor as currently declared.
    #[inline]
    #[must_use]
    pub fn self_client(&self) -> Arc<Client> {
        self.self_client.get()
    }

    /// Creates a transmission from this client, if the recipient is known.
    fn outbound(
        &self,
        recipient_id: &ClientId,
        msg: &Message,
        msg_tag: Option<MsgTag>,
        msg_id: Option<MsgId>,
    ) -> Option<Arc<Transmission>> {
        let recipient = self.tracker.lookup(recipient_id)?;
        Some(Arc::new(Transmission::new(
            self.self_client.get(),
            recipient,
            msg.clone(),
            msg_tag,
            msg_id,
        )))
    }

    /// Posts the append of a single outbound transmission.
    fn record(&self, transmission: Option<&Arc<Transmission>>) {
        if let Some(transmission) = transmission {
            self.tracker
                .post(TrackerCommand::AddSent(vec![Arc::clone(transmission)]));
        }
    }

    /// Posts the completion of a transmission.
    fn complete(&self, transmission: Option<Arc<Transmission>>, outcome: Outcome) {
        if let Some(transmission) = transmission {
            self.tracker.post(TrackerCommand::Complete {
                transmission,
                outcome,
            });
        }
    }
}

impl<C> fmt::Debug for TrackingConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingConnection")
            .field("tracker", &self.tracker.name)
            .field("self_id", &self.self_client.get().id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TrackingConnection - HubConnection
// ============================================================================

#[async_trait]
impl<C: HubConnection> HubConnection for TrackingConnection<C> {
    fn reg_info(&self) -> &RegInfo {
        self.base.reg_info()
    }

    async fn ping(&self) -> Result<()> {
        self.base.ping().await
    }

    async fn unregister(&self) -> Result<()> {
        self.base.unregister().await
    }

    async fn declare_metadata(&self, metadata: &Metadata) -> Result<()> {
        self.base.declare_metadata(metadata).await?;
        self.self_client.set_metadata(metadata.clone());
        Ok(())
    }

    async fn declare_subscriptions(&self, subscriptions: &Subscriptions) -> Result<()> {
        self.base.declare_subscriptions(subscriptions).await?;
        self.self_client.set_subscriptions(subscriptions.clone());
        Ok(())
    }

    async fn set_callable(&self, callable: Arc<dyn CallableClient>) -> Result<()> {
        let tracking = TrackingCallable::new(
            callable,
            Arc::clone(&self.tracker),
            self.self_client.clone(),
        );
        self.base.set_callable(Arc::new(tracking)).await
    }

    async fn notify(&self, recipient_id: &ClientId, msg: &Message) -> Result<()> {
        let transmission = self.outbound(recipient_id, msg, None, None);
        self.record(transmission.as_ref());

        match self.base.notify(recipient_id, msg).await {
            Ok(()) => {
                // Notifications never get a reply.
                self.complete(transmission, Outcome::Responded(None));
                Ok(())
            }
            Err(e) => {
                self.complete(transmission, Outcome::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn notify_all(&self, msg: &Message) -> Result<Vec<ClientId>> {
        let recipient_ids = self.base.notify_all(msg).await?;

        let transmissions: Vec<_> = recipient_ids
            .iter()
            .filter_map(|id| self.outbound(id, msg, None, None))
            .collect();
        self.tracker
            .post(TrackerCommand::AddSent(transmissions.clone()));
        for transmission in transmissions {
            self.complete(Some(transmission), Outcome::Responded(None));
        }

        Ok(recipient_ids)
    }

    async fn call(
        &self,
        recipient_id: &ClientId,
        msg_tag: &MsgTag,
        msg: &Message,
    ) -> Result<MsgId> {
        let transmission = self.outbound(recipient_id, msg, Some(msg_tag.clone()), None);
        self.record(transmission.as_ref());

        // On success the transmission waits for its routed response.
        self.base
            .call(recipient_id, msg_tag, msg)
            .await
            .inspect_err(|e| self.complete(transmission, Outcome::Failed(e.to_string())))
    }

    async fn call_all(
        &self,
        msg_tag: &MsgTag,
        msg: &Message,
    ) -> Result<FxHashMap<ClientId, MsgId>> {
        // Registered first: responses may arrive before call_all returns.
        let session = SessionId::next();
        self.tracker.post(TrackerCommand::OpenBroadcast {
            msg_tag: msg_tag.clone(),
            session,
        });

        let msg_ids = match self.base.call_all(msg_tag, msg).await {
            Ok(msg_ids) => msg_ids,
            Err(e) => {
                self.tracker.post(TrackerCommand::DiscardBroadcast {
                    msg_tag: msg_tag.clone(),
                    session,
                });
                return Err(e);
            }
        };

        let mut transmissions: Vec<_> = msg_ids
            .iter()
            .filter_map(|(recipient_id, msg_id)| {
                self.outbound(recipient_id, msg, Some(msg_tag.clone()), Some(msg_id.clone()))
            })
            .collect();
        transmissions.sort_by(|a, b| a.receiver().id.cmp(&b.receiver().id));

        self.tracker.post(TrackerCommand::BroadcastSent {
            msg_tag: msg_tag.clone(),
            session,
            transmissions,
        });

        Ok(msg_ids)
    }

    async fn call_and_wait(
        &self,
        recipient_id: &ClientId,
        msg: &Message,
        timeout: Duration,
    ) -> Result<Response> {
        let transmission = self.outbound(
            recipient_id,
            msg,
            Some(MsgTag::synchronous()),
            Some(MsgId::synchronous()),
        );
        self.record(transmission.as_ref());

        match self.base.call_and_wait(recipient_id, msg, timeout).await {
            Ok(response) => {
                self.complete(transmission, Outcome::Responded(Some(response.clone())));
                Ok(response)
            }
            Err(e) => {
                self.complete(transmission, Outcome::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn reply(&self, msg_id: &MsgId, response: &Response) -> Result<()> {
        self.base.reply(msg_id, response).await?;
        self.tracker.post(TrackerCommand::RouteReply {
            msg_id: msg_id.clone(),
            response: response.clone(),
        });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
