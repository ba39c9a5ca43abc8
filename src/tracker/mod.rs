//! Message tracking engine.
//!
//! This module wraps a hub connection so every message it sends or
//! receives is recorded as a [`Transmission`] in one of two observable
//! lists, and every response or reply is matched back to its
//! transmission.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MessageTracker`] | Owns the lists and the coordinator task |
//! | [`TrackerBuilder`] | Fluent configuration builder |
//! | [`TrackingConnection`] | Outbound interceptor (`HubConnection` wrapper) |
//! | [`TrackingCallable`] | Inbound interceptor (`CallableClient` wrapper) |
//! | [`TransmissionList`] | Observable sent/received collection |
//! | [`Transmission`] | Record of one exchange |
//!
//! # Correlation
//!
//! - Single calls are matched by responder ID and message tag.
//! - Broadcast calls are matched through a per-tag session that buffers
//!   responses arriving before the recipient list is known.
//! - Replies are matched to received calls by message ID.
//! - Anything unmatched is logged as an orphan and otherwise ignored.

// ============================================================================
// Submodules
// ============================================================================

/// Broadcast response correlation.
mod broadcast;

/// Fluent builder for tracker configuration.
pub mod builder;

/// Inbound interceptor.
pub mod callable;

/// Outbound interceptor.
pub mod connection;

/// Coordinator task owning the tracking state.
mod coordinator;

/// Tracker handle.
pub mod core;

/// Observable transmission list.
pub mod list;

/// Transmission record.
pub mod transmission;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TrackerBuilder;
pub use callable::TrackingCallable;
pub use connection::TrackingConnection;
pub use core::MessageTracker;
pub use list::{ListEvent, ListListener, TransmissionList};
pub use transmission::{Status, TerminalListener, Transmission};
