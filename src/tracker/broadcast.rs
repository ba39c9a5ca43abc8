//! Correlation of responses to broadcast calls.
//!
//! A broadcast call only reveals its recipients once the hub returns the
//! recipient → message-ID map, but fast recipients may already have
//! responded by then. Each broadcast therefore gets a [`CallAllSession`]
//! before the call is made:
//!
//! ```text
//!  open()           set_transmissions()          last response
//! ────────► Pending ───────────────────► Active ───────────────► retired
//!           (buffer by responder)        (match by responder)
//! ```
//!
//! Responses arriving while pending are buffered by responder ID and
//! replayed once the transmissions are known.
//!
//! Each session also carries a [`SessionId`] so that the transmissions of
//! a broadcast only ever activate the session that broadcast opened, even
//! when a caller reuses a tag before the first broadcast has finished.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ClientId, MsgTag};
use crate::protocol::Response;

use super::transmission::Transmission;

// ============================================================================
// SessionId
// ============================================================================

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one broadcast call, independent of its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(u64);

impl SessionId {
    /// Allocates the next session ID.
    #[inline]
    pub(crate) fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bcast-{}", self.0)
    }
}

// ============================================================================
// CallAllSession
// ============================================================================

/// Response bookkeeping for one broadcast call.
#[derive(Debug)]
pub(crate) struct CallAllSession {
    /// Broadcast this session belongs to.
    id: SessionId,
    /// Tag the broadcast was sent with.
    msg_tag: MsgTag,
    /// Responses received before the recipients were known.
    early: FxHashMap<ClientId, Response>,
    /// Transmissions still waiting, by recipient. `None` while pending.
    outstanding: Option<FxHashMap<ClientId, Arc<Transmission>>>,
}

impl CallAllSession {
    /// Creates a pending session.
    pub(crate) fn new(id: SessionId, msg_tag: MsgTag) -> Self {
        Self {
            id,
            msg_tag,
            early: FxHashMap::default(),
            outstanding: None,
        }
    }

    /// Returns `true` once the recipients are known.
    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Returns `true` once active with nothing left outstanding.
    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        self.outstanding.as_ref().is_some_and(FxHashMap::is_empty)
    }

    /// Returns the number of buffered early responses.
    #[inline]
    pub(crate) fn early_count(&self) -> usize {
        self.early.len()
    }

    /// Supplies the transmissions the broadcast produced, then replays
    /// any buffered responses against them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if called twice, or if a replayed
    /// response hits an already completed transmission. All buffered
    /// responses are replayed regardless.
    pub(crate) fn set_transmissions(&mut self, transmissions: Vec<Arc<Transmission>>) -> Result<()> {
        if self.outstanding.is_some() {
            return Err(Error::illegal_state(format!(
                "transmissions already set for broadcast {}",
                self.msg_tag
            )));
        }
        self.outstanding = Some(
            transmissions
                .into_iter()
                .map(|t| (t.receiver().id.clone(), t))
                .collect(),
        );

        let mut first_error = None;
        for (responder_id, response) in std::mem::take(&mut self.early) {
            if let Err(e) = self.process(&responder_id, response) {
                error!(msg_tag = %self.msg_tag, responder = %responder_id, error = %e, "Replaying early response failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Supplies one response, buffering it if the recipients are not yet known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if the matching transmission has
    /// already completed.
    pub(crate) fn add_response(&mut self, responder_id: &ClientId, response: Response) -> Result<()> {
        if self.is_active() {
            self.process(responder_id, response)
        } else {
            if self.early.insert(responder_id.clone(), response).is_some() {
                warn!(msg_tag = %self.msg_tag, responder = %responder_id, "Duplicate early response replaced");
            }
            Ok(())
        }
    }

    /// Drops the session, logging every buffered response as unmatched.
    fn abandon(self) {
        for responder_id in self.early.keys() {
            warn!(msg_tag = %self.msg_tag, responder = %responder_id, "Orphan response - possible hub error?");
        }
    }

    /// Hands a response to the matching outstanding transmission.
    fn process(&mut self, responder_id: &ClientId, response: Response) -> Result<()> {
        let removed = self
            .outstanding
            .as_mut()
            .and_then(|outstanding| outstanding.remove(responder_id));

        match removed {
            Some(transmission) => transmission.set_response(Some(response)),
            None => {
                warn!(msg_tag = %self.msg_tag, responder = %responder_id, "Orphan response - possible hub error?");
                Ok(())
            }
        }
    }
}

// ============================================================================
// BroadcastSessions
// ============================================================================

/// Registry of live broadcast sessions, keyed by tag.
///
/// A session is present from [`open`](Self::open) until its last
/// outstanding transmission completes.
#[derive(Debug, Default)]
pub(crate) struct BroadcastSessions {
    /// Live sessions by tag.
    sessions: FxHashMap<MsgTag, CallAllSession>,
    /// Sessions replaced by a later broadcast with the same tag.
    superseded: FxHashSet<SessionId>,
}

impl BroadcastSessions {
    /// Registers a pending session for a broadcast about to be sent.
    pub(crate) fn open(&mut self, msg_tag: MsgTag, id: SessionId) {
        let session = CallAllSession::new(id, msg_tag.clone());
        if let Some(previous) = self.sessions.insert(msg_tag.clone(), session) {
            warn!(
                msg_tag = %msg_tag,
                session = %previous.id,
                early = previous.early_count(),
                "Broadcast tag reused while still outstanding; previous session dropped"
            );
            self.superseded.insert(previous.id);
            previous.abandon();
        }
        debug!(msg_tag = %msg_tag, session = %id, "Broadcast session opened");
    }

    /// Drops the session of a broadcast that never went out.
    ///
    /// Leaves a newer session under the same tag untouched.
    pub(crate) fn discard(&mut self, msg_tag: &MsgTag, id: SessionId) -> bool {
        if self.superseded.remove(&id) {
            return false;
        }
        if !self.sessions.get(msg_tag).is_some_and(|s| s.id == id) {
            return false;
        }
        if let Some(session) = self.sessions.remove(msg_tag) {
            debug!(msg_tag = %msg_tag, session = %id, "Broadcast session discarded");
            session.abandon();
        }
        true
    }

    /// Returns `true` if a session exists for `msg_tag`.
    #[inline]
    pub(crate) fn contains(&self, msg_tag: &MsgTag) -> bool {
        self.sessions.contains_key(msg_tag)
    }

    /// Returns the number of live sessions.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns the tags of all live sessions.
    pub(crate) fn tags(&self) -> Vec<MsgTag> {
        self.sessions.keys().cloned().collect()
    }

    /// Activates the session broadcast `id` opened under `msg_tag`.
    ///
    /// A session superseded by tag reuse is not activated; its
    /// transmissions stay uncorrelated and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if the broadcast never opened a
    /// session or already activated it.
    pub(crate) fn set_transmissions(
        &mut self,
        msg_tag: &MsgTag,
        id: SessionId,
        transmissions: Vec<Arc<Transmission>>,
    ) -> Result<()> {
        if self.superseded.remove(&id) {
            warn!(
                msg_tag = %msg_tag,
                session = %id,
                transmissions = transmissions.len(),
                "Broadcast tag reused; responses to the earlier broadcast cannot be correlated"
            );
            return Ok(());
        }
        let session = self
            .sessions
            .get_mut(msg_tag)
            .filter(|s| s.id == id)
            .ok_or_else(|| {
                Error::illegal_state(format!("no broadcast session {id} for tag {msg_tag}"))
            })?;
        let result = session.set_transmissions(transmissions);
        self.retire_if_done(msg_tag);
        result
    }

    /// Routes a response to the session for `msg_tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if no session exists or the
    /// matching transmission already completed.
    pub(crate) fn add_response(
        &mut self,
        msg_tag: &MsgTag,
        responder_id: &ClientId,
        response: Response,
    ) -> Result<()> {
        let session = self.sessions.get_mut(msg_tag).ok_or_else(|| {
            Error::illegal_state(format!("no broadcast session for tag {msg_tag}"))
        })?;
        let result = session.add_response(responder_id, response);
        self.retire_if_done(msg_tag);
        result
    }

    /// Removes the session once nothing is outstanding.
    fn retire_if_done(&mut self, msg_tag: &MsgTag) {
        if self.sessions.get(msg_tag).is_some_and(CallAllSession::is_done) {
            self.sessions.remove(msg_tag);
            debug!(msg_tag = %msg_tag, "Broadcast session retired");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
