//! Hub-side collaborator contracts.
//!
//! This module describes what the tracker needs from its surroundings:
//! a live hub connection, the inbound message handler installed on it,
//! and a directory of registered clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   outbound    ┌────────────────────┐   outbound    ┌───────────────┐
//! │ Application  │──────────────►│ TrackingConnection │──────────────►│ HubConnection │
//! │              │               │                    │               │  (transport)  │
//! │ CallableClient◄──────────────│ TrackingCallable   │◄──────────────│               │
//! └──────────────┘   inbound     └────────────────────┘   inbound     └───────────────┘
//!                                          │ lookup
//!                                          ▼
//!                                  ClientDirectory
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `hub` | `HubConnection` and `CallableClient` traits |
//! | `registry` | Client directory and its in-memory implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Hub connection and callable client contracts.
pub mod hub;

/// Client registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use hub::{CallableClient, HubConnection};
pub use registry::{ClientDirectory, ClientRegistry};
