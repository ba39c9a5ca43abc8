//! Callable client wrapper that tracks inbound traffic.
//!
//! Installed in place of the application's handler by
//! [`TrackingConnection::set_callable`](super::TrackingConnection).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::{ClientId, MsgId, MsgTag};
use crate::protocol::{Message, Response};
use crate::transport::CallableClient;

use super::connection::SelfClient;
use super::coordinator::{Outcome, TrackerCommand};
use super::core::TrackerInner;
use super::transmission::Transmission;

// ============================================================================
// TrackingCallable
// ============================================================================

/// A [`CallableClient`] that records inbound exchanges before or after
/// delegating to the application's handler.
pub struct TrackingCallable {
    /// Application handler.
    base: Arc<dyn CallableClient>,
    /// Owning tracker.
    tracker: Arc<TrackerInner>,
    /// This client's descriptor.
    self_client: SelfClient,
}

impl TrackingCallable {
    /// Wraps an application handler.
    pub(crate) fn new(
        base: Arc<dyn CallableClient>,
        tracker: Arc<TrackerInner>,
        self_client: SelfClient,
    ) -> Self {
        Self {
            base,
            tracker,
            self_client,
        }
    }

    /// Creates a transmission to this client, if the sender is known.
    fn inbound(
        &self,
        sender_id: &ClientId,
        msg: &Message,
        msg_id: Option<MsgId>,
    ) -> Option<Arc<Transmission>> {
        let sender = self.tracker.lookup(sender_id)?;
        Some(Arc::new(Transmission::new(
            sender,
            self.self_client.get(),
            msg.clone(),
            None,
            msg_id,
        )))
    }
}

#[async_trait]
impl CallableClient for TrackingCallable {
    async fn receive_notification(&self, sender_id: &ClientId, msg: &Message) -> Result<()> {
        self.base.receive_notification(sender_id, msg).await?;

        // No reply will ever follow, so complete it straight away.
        if let Some(transmission) = self.inbound(sender_id, msg, None) {
            self.tracker
                .post(TrackerCommand::AddReceived(Arc::clone(&transmission)));
            self.tracker.post(TrackerCommand::Complete {
                transmission,
                outcome: Outcome::Responded(None),
            });
        }
        Ok(())
    }

    async fn receive_call(
        &self,
        sender_id: &ClientId,
        msg_id: &MsgId,
        msg: &Message,
    ) -> Result<()> {
        let transmission = self.inbound(sender_id, msg, Some(msg_id.clone()));
        if let Some(transmission) = &transmission {
            self.tracker
                .post(TrackerCommand::AddReceived(Arc::clone(transmission)));
        }

        // On success the transmission waits for the local reply.
        let result = self.base.receive_call(sender_id, msg_id, msg).await;
        if let (Err(e), Some(transmission)) = (&result, transmission) {
            self.tracker.post(TrackerCommand::Complete {
                transmission,
                outcome: Outcome::Failed(e.to_string()),
            });
        }
        result
    }

    async fn receive_response(
        &self,
        responder_id: &ClientId,
        msg_tag: &MsgTag,
        response: &Response,
    ) -> Result<()> {
        self.base
            .receive_response(responder_id, msg_tag, response)
            .await?;

        self.tracker.post(TrackerCommand::RouteResponse {
            responder_id: responder_id.clone(),
            msg_tag: msg_tag.clone(),
            response: response.clone(),
        });
        Ok(())
    }
}
