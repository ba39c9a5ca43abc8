//! Hub connection and callable client contracts.
//!
//! The tracker does not talk to a hub itself. It wraps an existing
//! [`HubConnection`] and the [`CallableClient`] installed on it, and
//! implements both traits again so it can sit transparently in between.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::identifiers::{ClientId, MsgId, MsgTag};
use crate::protocol::{Message, Metadata, RegInfo, Response, Subscriptions};

// ============================================================================
// HubConnection
// ============================================================================

/// A registered connection to a hub.
///
/// Outbound operations return once the hub has accepted the message;
/// responses to calls arrive later through the installed
/// [`CallableClient`]. Only [`call_and_wait`](Self::call_and_wait) waits
/// for the response itself.
#[async_trait]
pub trait HubConnection: Send + Sync {
    /// Returns the registration information of this connection.
    fn reg_info(&self) -> &RegInfo;

    /// Checks that the hub is alive.
    async fn ping(&self) -> Result<()>;

    /// Unregisters from the hub.
    async fn unregister(&self) -> Result<()>;

    /// Declares this client's metadata.
    async fn declare_metadata(&self, metadata: &Metadata) -> Result<()>;

    /// Declares this client's subscriptions.
    async fn declare_subscriptions(&self, subscriptions: &Subscriptions) -> Result<()>;

    /// Installs the handler for inbound notifications, calls and responses.
    async fn set_callable(&self, callable: Arc<dyn CallableClient>) -> Result<()>;

    /// Sends a notification to one client.
    async fn notify(&self, recipient_id: &ClientId, msg: &Message) -> Result<()>;

    /// Sends a notification to all subscribed clients.
    ///
    /// Returns the IDs of the clients it was sent to.
    async fn notify_all(&self, msg: &Message) -> Result<Vec<ClientId>>;

    /// Sends a call to one client.
    ///
    /// Returns the hub-assigned message ID.
    async fn call(&self, recipient_id: &ClientId, msg_tag: &MsgTag, msg: &Message)
    -> Result<MsgId>;

    /// Sends a call to all subscribed clients.
    ///
    /// Returns the message ID assigned for each recipient.
    async fn call_all(
        &self,
        msg_tag: &MsgTag,
        msg: &Message,
    ) -> Result<FxHashMap<ClientId, MsgId>>;

    /// Sends a call and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`](crate::Error::Timeout) if no response
    /// arrives within `timeout`.
    async fn call_and_wait(
        &self,
        recipient_id: &ClientId,
        msg: &Message,
        timeout: Duration,
    ) -> Result<Response>;

    /// Replies to a previously received call.
    async fn reply(&self, msg_id: &MsgId, response: &Response) -> Result<()>;
}

// ============================================================================
// CallableClient
// ============================================================================

/// Handler for messages delivered to this client.
///
/// The hub side invokes these from whatever task it reads on; an error
/// is reported back to the hub by the caller.
#[async_trait]
pub trait CallableClient: Send + Sync {
    /// Receives a notification. No reply is expected.
    async fn receive_notification(&self, sender_id: &ClientId, msg: &Message) -> Result<()>;

    /// Receives a call. The reply is sent later with
    /// [`HubConnection::reply`] quoting `msg_id`.
    async fn receive_call(&self, sender_id: &ClientId, msg_id: &MsgId, msg: &Message)
    -> Result<()>;

    /// Receives the response to a call this client made with `msg_tag`.
    async fn receive_response(
        &self,
        responder_id: &ClientId,
        msg_tag: &MsgTag,
        response: &Response,
    ) -> Result<()>;
}
