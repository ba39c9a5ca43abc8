//! Error types for the SAMP message tracker.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use samp_tracker::{Message, Result};
//!
//! async fn example(connection: &impl HubConnection) -> Result<()> {
//!     let msg = Message::new("samp.app.ping");
//!     connection.notify_all(&msg).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Hub | [`Error::Hub`], [`Error::Timeout`] |
//! | Handler | [`Error::Handler`] |
//! | Tracking | [`Error::IllegalState`], [`Error::TrackerClosed`] |
//! | External | [`Error::Json`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when tracker configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Hub Errors
    // ========================================================================
    /// Hub or transport failure.
    ///
    /// Returned by [`HubConnection`](crate::HubConnection) implementations
    /// when the hub rejects or cannot deliver an operation.
    #[error("Hub error: {message}")]
    Hub {
        /// Description of the hub failure.
        message: String,
    },

    /// Synchronous call timeout.
    ///
    /// Returned when a blocking call receives no response in time.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Handler Errors
    // ========================================================================
    /// Inbound message handler failure.
    ///
    /// Returned by [`CallableClient`](crate::CallableClient) implementations
    /// when an incoming call or notification cannot be processed.
    #[error("Handler error: {message}")]
    Handler {
        /// Description of the handler failure.
        message: String,
    },

    // ========================================================================
    // Tracking Errors
    // ========================================================================
    /// Tracking invariant violated.
    ///
    /// Returned when a transmission is finalized twice or a broadcast
    /// session receives its recipient set twice. Always indicates a bug
    /// in the caller, never bad input from a peer.
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Description of the violated invariant.
        message: String,
    },

    /// Tracker coordinator has terminated.
    ///
    /// Returned when querying a tracker after shutdown.
    #[error("Tracker closed")]
    TrackerClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a hub error.
    #[inline]
    pub fn hub(message: impl Into<String>) -> Self {
        Self::Hub {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a handler error.
    #[inline]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Creates an illegal state error.
    #[inline]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error came from the hub side.
    #[inline]
    #[must_use]
    pub fn is_hub_error(&self) -> bool {
        matches!(self, Self::Hub { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this error signals a broken tracking invariant.
    #[inline]
    #[must_use]
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Hub { .. } | Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::hub("no such client");
        assert_eq!(err.to_string(), "Hub error: no such client");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing registry");
        assert_eq!(err.to_string(), "Configuration error: missing registry");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("callAndWait", 5000);
        assert_eq!(err.to_string(), "Timeout after 5000ms: callAndWait");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("callAndWait", 1000);
        let other_err = Error::hub("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_hub_error() {
        assert!(Error::hub("x").is_hub_error());
        assert!(Error::timeout("x", 1).is_hub_error());
        assert!(!Error::handler("x").is_hub_error());
        assert!(!Error::TrackerClosed.is_hub_error());
    }

    #[test]
    fn test_is_illegal_state() {
        assert!(Error::illegal_state("finalized twice").is_illegal_state());
        assert!(!Error::config("x").is_illegal_state());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::timeout("test", 1000).is_recoverable());
        assert!(!Error::illegal_state("test").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
