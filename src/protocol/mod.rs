//! Bus payload types.
//!
//! The tracker treats these as opaque records: it never inspects a
//! message body or response beyond storing it on a transmission.
//!
//! # Payload Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Message` | Sender → Recipient | Notification or call body |
//! | `Response` | Recipient → Sender | Outcome of a call |
//! | `Metadata` | Client → Hub | Self description |
//! | `Subscriptions` | Client → Hub | MTypes the client accepts |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Client descriptors and registration info |
//! | `message` | Message and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Client descriptor types.
pub mod client;

/// Message and Response payload types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{Client, Metadata, RegInfo, Subscriptions};
pub use message::{ErrInfo, Message, Response, ResponseStatus};
