//! Type-safe identifiers for bus entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time:
//! a [`MsgTag`] (chosen by the sender) can never be passed where a
//! [`MsgId`] (assigned by the hub) is expected.
//!
//! | Type | Assigned by | Purpose |
//! |------|-------------|---------|
//! | [`ClientId`] | Hub | Registered client identity |
//! | [`MsgTag`] | Sender | Correlates a call with its response |
//! | [`MsgId`] | Hub | Correlates a received call with its reply |
//! | [`TransmissionId`] | Tracker | Identity of a tracked exchange |
//! | [`ListenerId`] | Tracker | Handle for removing a list listener |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Marker used as tag and ID for synchronous calls, which are never
/// routed through the asynchronous response path.
const SYNCHRONOUS_MARKER: &str = "<synchronous>";

/// Counter for transmission IDs.
static NEXT_TRANSMISSION_ID: AtomicU64 = AtomicU64::new(1);

/// Counter for listener IDs.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Public identifier of a client registered with the hub.
    ClientId
);

string_id!(
    /// Sender-chosen tag labelling an asynchronous call.
    ///
    /// Responses come back carrying the tag, so a sender can match them
    /// to what it sent.
    MsgTag
);

string_id!(
    /// Hub-assigned identifier of one delivered call.
    ///
    /// The recipient quotes it when replying.
    MsgId
);

impl MsgTag {
    /// Generates a fresh unique tag.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("tag-{}", Uuid::new_v4()))
    }

    /// Returns the marker tag used for synchronous calls.
    #[inline]
    #[must_use]
    pub fn synchronous() -> Self {
        Self(SYNCHRONOUS_MARKER.to_string())
    }
}

impl MsgId {
    /// Returns the marker ID used for synchronous calls.
    #[inline]
    #[must_use]
    pub fn synchronous() -> Self {
        Self(SYNCHRONOUS_MARKER.to_string())
    }
}

// ============================================================================
// TransmissionId
// ============================================================================

/// Process-unique identity of a tracked transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransmissionId(u64);

impl TransmissionId {
    /// Allocates the next transmission ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TRANSMISSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle returned when registering a list listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates the next listener ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// Tests
// ============================================================================
