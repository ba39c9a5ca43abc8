//! SAMP message tracker - Observable bookkeeping for hub connections.
//!
//! This library wraps a SAMP-style hub connection so that every message
//! a client sends or receives is recorded, and every response or reply is
//! matched back to the exchange it answers.
//!
//! # Architecture
//!
//! The tracker follows a decorator model:
//!
//! - **Outbound**: [`TrackingConnection`] wraps a [`HubConnection`] and
//!   records notifications and calls before delegating them
//! - **Inbound**: [`TrackingCallable`] wraps the application's
//!   [`CallableClient`] and records what the hub delivers to it
//! - **Bookkeeping**: a single coordinator task applies every list append
//!   and status change in the order they were posted
//!
//! Key design principles:
//!
//! - Transport errors always reach the caller unchanged
//! - Tracking never blocks or fails a hub operation
//! - Broadcast responses may arrive before the broadcast call returns
//! - Unmatched responses and replies are logged, never fatal
//!
//! # Quick Start
//!
//! ```no_run
//! use samp_tracker::{ClientRegistry, HubConnection, Message, MessageTracker, MsgTag, Result};
//!
//! async fn run(base: impl HubConnection) -> Result<()> {
//!     let registry = ClientRegistry::new();
//!     let tracker = MessageTracker::builder().registry(registry).build()?;
//!     let connection = tracker.wrap(base);
//!
//!     let msg = Message::new("samp.app.ping");
//!     connection.call_all(&MsgTag::generate(), &msg).await?;
//!
//!     tracker.flush().await?;
//!     for tx in tracker.sent().snapshot() {
//!         println!("{} -> {}: {}", tx.sender().label(), tx.receiver().label(), tx.status());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Message, response and client descriptor types |
//! | [`transport`] | Hub connection contracts and client registry |
//! | [`tracker`] | Transmissions, lists and the tracking wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for clients and messages.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Bus payload types.
///
/// Messages, responses and client descriptors as carried by the hub.
pub mod protocol;

/// Message tracking engine.
///
/// - [`MessageTracker`] - Owns the sent and received lists
/// - [`TrackingConnection`] - Outbound interceptor
/// - [`Transmission`] - Record of one exchange
pub mod tracker;

/// Hub connection contracts.
///
/// Traits the tracker wraps, plus an in-memory client registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, ListenerId, MsgId, MsgTag, TransmissionId};

// Protocol types
pub use protocol::{Client, ErrInfo, Message, Metadata, RegInfo, Response, ResponseStatus, Subscriptions};

// Transport types
pub use transport::{CallableClient, ClientDirectory, ClientRegistry, HubConnection};

// Tracker types
pub use tracker::{
    ListEvent, ListListener, MessageTracker, Status, TerminalListener, TrackerBuilder,
    TrackingCallable, TrackingConnection, Transmission, TransmissionList,
};
