//! Coordinator task owning all tracking state.
//!
//! Transport callbacks arrive on arbitrary tasks. Rather than share the
//! collections and broadcast sessions behind locks, every bookkeeping
//! step is posted as a [`TrackerCommand`] to one coordinator task, which
//! applies them strictly in post order. A transmission's append is thus
//! always observed before its completion.
//!
//! # Event Loop
//!
//! The coordinator handles:
//!
//! - Appends to the sent and received lists
//! - Completion of individual transmissions
//! - Broadcast session open/activate/discard
//! - Routing of inbound responses and outbound replies
//! - Flush and introspection queries

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::error::Result;
use crate::identifiers::{ClientId, MsgId, MsgTag};
use crate::protocol::Response;

use super::broadcast::{BroadcastSessions, SessionId};
use super::list::TransmissionList;
use super::transmission::Transmission;

// ============================================================================
// Outcome
// ============================================================================

/// Terminal outcome applied to a transmission.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// Responded, with the response if there is one.
    Responded(Option<Response>),
    /// Failed, with the error text.
    Failed(String),
}

// ============================================================================
// TrackerCommand
// ============================================================================

/// Bookkeeping step posted to the coordinator.
pub(crate) enum TrackerCommand {
    /// Append outbound transmissions to the sent list.
    AddSent(Vec<Arc<Transmission>>),
    /// Append an inbound transmission to the received list.
    AddReceived(Arc<Transmission>),
    /// Finalize a transmission.
    Complete {
        transmission: Arc<Transmission>,
        outcome: Outcome,
    },
    /// Register a pending session before a broadcast is sent.
    OpenBroadcast { msg_tag: MsgTag, session: SessionId },
    /// Drop the session of a broadcast that failed to send.
    DiscardBroadcast { msg_tag: MsgTag, session: SessionId },
    /// Append a broadcast's transmissions and activate its session.
    BroadcastSent {
        msg_tag: MsgTag,
        session: SessionId,
        transmissions: Vec<Arc<Transmission>>,
    },
    /// Route a response received for a call this client made.
    RouteResponse {
        responder_id: ClientId,
        msg_tag: MsgTag,
        response: Response,
    },
    /// Route a reply this client sent for a call it received.
    RouteReply { msg_id: MsgId, response: Response },
    /// Report the tags of live broadcast sessions.
    ActiveBroadcasts(oneshot::Sender<Vec<MsgTag>>),
    /// Acknowledge once all earlier commands are applied.
    Flush(oneshot::Sender<()>),
    /// Stop the coordinator.
    Shutdown,
}

impl TrackerCommand {
    /// Returns a short name for logging.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::AddSent(_) => "add_sent",
            Self::AddReceived(_) => "add_received",
            Self::Complete { .. } => "complete",
            Self::OpenBroadcast { .. } => "open_broadcast",
            Self::DiscardBroadcast { .. } => "discard_broadcast",
            Self::BroadcastSent { .. } => "broadcast_sent",
            Self::RouteResponse { .. } => "route_response",
            Self::RouteReply { .. } => "route_reply",
            Self::ActiveBroadcasts(_) => "active_broadcasts",
            Self::Flush(_) => "flush",
            Self::Shutdown => "shutdown",
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Owner of the tracking state.
pub(crate) struct Coordinator {
    /// Tracker label for log lines.
    name: String,
    /// Transmissions this client sent.
    sent: TransmissionList,
    /// Transmissions this client received.
    received: TransmissionList,
    /// Live broadcast sessions.
    broadcasts: BroadcastSessions,
}

impl Coordinator {
    /// Creates a coordinator over the given lists.
    pub(crate) fn new(name: String, sent: TransmissionList, received: TransmissionList) -> Self {
        Self {
            name,
            sent,
            received,
            broadcasts: BroadcastSessions::default(),
        }
    }

    /// Processes commands until shutdown or until every sender is gone.
    pub(crate) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<TrackerCommand>) {
        debug!(tracker = %self.name, "Coordinator started");

        while let Some(command) = command_rx.recv().await {
            if !self.handle(command) {
                debug!(tracker = %self.name, "Shutdown command received");
                break;
            }
        }

        let outstanding = self.broadcasts.len();
        if outstanding > 0 {
            debug!(
                tracker = %self.name,
                sessions = outstanding,
                "Dropping outstanding broadcast sessions"
            );
        }
        debug!(tracker = %self.name, "Coordinator terminated");
    }

    /// Applies one command. Returns `false` on shutdown.
    pub(crate) fn handle(&mut self, command: TrackerCommand) -> bool {
        trace!(tracker = %self.name, command = command.name(), "Applying command");

        let result = match command {
            TrackerCommand::AddSent(transmissions) => {
                for transmission in transmissions {
                    self.sent.append(transmission);
                }
                Ok(())
            }

            TrackerCommand::AddReceived(transmission) => {
                self.received.append(transmission);
                Ok(())
            }

            TrackerCommand::Complete {
                transmission,
                outcome,
            } => match outcome {
                Outcome::Responded(response) => transmission.set_response(response),
                Outcome::Failed(failure) => transmission.fail(failure),
            },

            TrackerCommand::OpenBroadcast { msg_tag, session } => {
                self.broadcasts.open(msg_tag, session);
                Ok(())
            }

            TrackerCommand::DiscardBroadcast { msg_tag, session } => {
                self.broadcasts.discard(&msg_tag, session);
                Ok(())
            }

            TrackerCommand::BroadcastSent {
                msg_tag,
                session,
                transmissions,
            } => {
                for transmission in &transmissions {
                    self.sent.append(Arc::clone(transmission));
                }
                self.broadcasts
                    .set_transmissions(&msg_tag, session, transmissions)
            }

            TrackerCommand::RouteResponse {
                responder_id,
                msg_tag,
                response,
            } => self.route_response(&responder_id, &msg_tag, response),

            TrackerCommand::RouteReply { msg_id, response } => {
                self.route_reply(&msg_id, response)
            }

            TrackerCommand::ActiveBroadcasts(reply_tx) => {
                let _ = reply_tx.send(self.broadcasts.tags());
                Ok(())
            }

            TrackerCommand::Flush(reply_tx) => {
                let _ = reply_tx.send(());
                Ok(())
            }

            TrackerCommand::Shutdown => return false,
        };

        if let Err(e) = result {
            error!(tracker = %self.name, error = %e, "Tracking invariant violated");
        }
        true
    }

    /// Hands a response to its broadcast session or its sent transmission.
    ///
    /// Matching on responder and tag alone is ambiguous if a sender reuses
    /// one tag for a call and a broadcast at once; the broadcast wins.
    fn route_response(
        &mut self,
        responder_id: &ClientId,
        msg_tag: &MsgTag,
        response: Response,
    ) -> Result<()> {
        if self.broadcasts.contains(msg_tag) {
            return self.broadcasts.add_response(msg_tag, responder_id, response);
        }

        let matched = self.sent.find_waiting(|t| {
            t.receiver().id == *responder_id && t.msg_tag() == Some(msg_tag)
        });
        match matched {
            Some(transmission) => transmission.set_response(Some(response)),
            None => {
                warn!(
                    tracker = %self.name,
                    msg_tag = %msg_tag,
                    responder = %responder_id,
                    "Orphan response - possible hub error?"
                );
                Ok(())
            }
        }
    }

    /// Marks the received call answered by a reply.
    fn route_reply(&mut self, msg_id: &MsgId, response: Response) -> Result<()> {
        match self.received.find_waiting(|t| t.msg_id() == Some(msg_id)) {
            Some(transmission) => transmission.set_response(Some(response)),
            None => {
                warn!(
                    tracker = %self.name,
                    msg_id = %msg_id,
                    "Orphan reply - replier programming error?"
                );
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
