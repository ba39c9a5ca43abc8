//! Record of one tracked message exchange.
//!
//! A [`Transmission`] has a fixed identity (sender, receiver, message,
//! tag, ID) and a status that moves exactly once from
//! [`Status::Waiting`] to either [`Status::Responded`] or
//! [`Status::Failed`].
//!
//! # Example
//!
//! ```ignore
//! let tx = Transmission::new(sender, receiver, msg, Some(tag), None);
//! tx.set_response(Some(response))?;
//! assert!(tx.is_done());
//!
//! // A second finalization is rejected.
//! assert!(tx.fail("late").is_err());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::error;

use crate::error::{Error, Result};
use crate::identifiers::{MsgId, MsgTag, TransmissionId};
use crate::protocol::{Client, Message, Response};

// ============================================================================
// Types
// ============================================================================

/// Callback fired once when a transmission reaches a terminal status.
pub type TerminalListener = Box<dyn Fn(&Transmission) + Send + Sync>;

// ============================================================================
// Status
// ============================================================================

/// Progress of a transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Sent or received, outcome not yet known.
    Waiting,
    /// Completed; a response (possibly absent) is recorded.
    Responded,
    /// Completed with a failure.
    Failed,
}

impl Status {
    /// Returns `true` for terminal statuses.
    #[inline]
    #[must_use]
    pub fn is_done(self) -> bool {
        !matches!(self, Self::Waiting)
    }

    /// Returns a short human-readable description.
    #[inline]
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Responded => "responded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// ============================================================================
// TransmissionState
// ============================================================================

/// Mutable part of a transmission.
#[derive(Debug)]
struct TransmissionState {
    status: Status,
    response: Option<Response>,
    failure: Option<String>,
    finished_at: Option<Instant>,
}

// ============================================================================
// Transmission
// ============================================================================

/// One message exchange between two clients.
///
/// Shared as `Arc<Transmission>` between the tracker and its observers.
/// Two transmissions are equal only if they are the same record.
pub struct Transmission {
    /// Tracker-assigned identity.
    id: TransmissionId,
    /// Sending client.
    sender: Arc<Client>,
    /// Receiving client.
    receiver: Arc<Client>,
    /// Message body.
    message: Message,
    /// Sender's tag, for calls.
    msg_tag: Option<MsgTag>,
    /// Hub-assigned ID, for calls.
    msg_id: Option<MsgId>,
    /// Creation time.
    created_at: Instant,
    /// Status and outcome.
    state: Mutex<TransmissionState>,
    /// Terminal-status subscribers.
    listeners: Mutex<Vec<TerminalListener>>,
}

// ============================================================================
// Transmission - Constructor
// ============================================================================

impl Transmission {
    /// Creates a waiting transmission.
    #[must_use]
    pub fn new(
        sender: Arc<Client>,
        receiver: Arc<Client>,
        message: Message,
        msg_tag: Option<MsgTag>,
        msg_id: Option<MsgId>,
    ) -> Self {
        Self {
            id: TransmissionId::next(),
            sender,
            receiver,
            message,
            msg_tag,
            msg_id,
            created_at: Instant::now(),
            state: Mutex::new(TransmissionState {
                status: Status::Waiting,
                response: None,
                failure: None,
                finished_at: None,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

// ============================================================================
// Transmission - Accessors
// ============================================================================

impl Transmission {
    /// Returns the transmission ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransmissionId {
        self.id
    }

    /// Returns the sending client.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> &Arc<Client> {
        &self.sender
    }

    /// Returns the receiving client.
    #[inline]
    #[must_use]
    pub fn receiver(&self) -> &Arc<Client> {
        &self.receiver
    }

    /// Returns the message body.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the message tag, if this was a call.
    #[inline]
    #[must_use]
    pub fn msg_tag(&self) -> Option<&MsgTag> {
        self.msg_tag.as_ref()
    }

    /// Returns the hub-assigned message ID, if known.
    #[inline]
    #[must_use]
    pub fn msg_id(&self) -> Option<&MsgId> {
        self.msg_id.as_ref()
    }

    /// Returns when the transmission was created.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns when the transmission completed, if it has.
    #[inline]
    #[must_use]
    pub fn finished_at(&self) -> Option<Instant> {
        self.state.lock().finished_at
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Returns `true` once a response or failure is recorded.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status().is_done()
    }

    /// Returns the recorded response.
    ///
    /// `None` both while waiting and after a notification completed,
    /// since notifications never carry a response.
    #[must_use]
    pub fn response(&self) -> Option<Response> {
        self.state.lock().response.clone()
    }

    /// Returns the recorded failure text.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.state.lock().failure.clone()
    }
}

// ============================================================================
// Transmission - State Transitions
// ============================================================================

impl Transmission {
    /// Marks the transmission responded.
    ///
    /// Pass `None` for exchanges that never get a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if already terminal; the recorded
    /// outcome is left untouched.
    pub fn set_response(&self, response: Option<Response>) -> Result<()> {
        self.finish(Status::Responded, |state| state.response = response)
    }

    /// Marks the transmission failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if already terminal; the recorded
    /// outcome is left untouched.
    pub fn fail(&self, error: impl fmt::Display) -> Result<()> {
        let failure = error.to_string();
        self.finish(Status::Failed, |state| state.failure = Some(failure))
    }

    /// Registers a callback fired when the transmission completes.
    ///
    /// Callbacks run on whichever task finalizes the transmission and must
    /// not register further callbacks on the same transmission.
    pub fn on_terminal(&self, listener: TerminalListener) {
        self.listeners.lock().push(listener);
    }

    /// Applies a terminal transition and notifies subscribers.
    fn finish(&self, status: Status, apply: impl FnOnce(&mut TransmissionState)) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.status.is_done() {
                return Err(Error::illegal_state(format!(
                    "{} already {}, cannot mark {}",
                    self.id, state.status, status
                )));
            }
            state.status = status;
            apply(&mut state);
            state.finished_at = Some(Instant::now());
        }

        // A panicking listener must not unwind into the coordinator.
        let listeners = self.listeners.lock();
        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(self))).is_err() {
                error!(transmission = %self.id, status = %status, "Terminal listener panicked");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Transmission - Traits
// ============================================================================

impl PartialEq for Transmission {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transmission {}

impl fmt::Debug for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmission")
            .field("id", &self.id)
            .field("sender", &self.sender.id)
            .field("receiver", &self.receiver.id)
            .field("mtype", &self.message.mtype)
            .field("msg_tag", &self.msg_tag)
            .field("msg_id", &self.msg_id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
