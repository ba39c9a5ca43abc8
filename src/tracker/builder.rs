//! Builder pattern for tracker configuration.
//!
//! Provides a fluent API for configuring and creating [`MessageTracker`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use samp_tracker::{ClientRegistry, MessageTracker};
//!
//! # async fn example() -> samp_tracker::Result<()> {
//! let tracker = MessageTracker::builder()
//!     .registry(ClientRegistry::new())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::transport::{ClientDirectory, ClientRegistry};

use super::core::MessageTracker;

// ============================================================================
// Constants
// ============================================================================

/// Label used when none is configured.
const DEFAULT_NAME: &str = "tracker";

// ============================================================================
// TrackerBuilder
// ============================================================================

/// Builder for configuring a [`MessageTracker`] instance.
///
/// Use [`MessageTracker::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct TrackerBuilder {
    /// Directory used to resolve client IDs.
    directory: Option<Arc<dyn ClientDirectory>>,
    /// Label for log lines.
    name: Option<String>,
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("directory", &self.directory.is_some())
            .field("name", &self.name)
            .finish()
    }
}

// ============================================================================
// TrackerBuilder Implementation
// ============================================================================

impl TrackerBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client registry used to resolve client IDs.
    #[inline]
    #[must_use]
    pub fn registry(mut self, registry: ClientRegistry) -> Self {
        self.directory = Some(Arc::new(registry));
        self
    }

    /// Sets a custom client directory.
    ///
    /// # Arguments
    ///
    /// * `directory` - Any thread-safe lookup of registered clients
    #[inline]
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn ClientDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the label carried in log lines.
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the tracker and starts its coordinator.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no registry or directory is set
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn build(self) -> Result<MessageTracker> {
        let directory = self.validate_directory()?;
        let name = self.validate_name()?;

        if Handle::try_current().is_err() {
            return Err(Error::config(
                "MessageTracker must be built inside a tokio runtime.",
            ));
        }

        Ok(MessageTracker::new(name, directory))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TrackerBuilder {
    /// Validates the directory configuration.
    fn validate_directory(&self) -> Result<Arc<dyn ClientDirectory>> {
        self.directory.clone().ok_or_else(|| {
            Error::config(
                "Client registry is required. Use .registry() or .directory() to set it.\n\
                 Example: MessageTracker::builder().registry(ClientRegistry::new())",
            )
        })
    }

    /// Validates the name configuration.
    fn validate_name(&self) -> Result<String> {
        match &self.name {
            None => Ok(DEFAULT_NAME.to_string()),
            Some(name) if name.trim().is_empty() => {
                Err(Error::config("Tracker name must not be blank"))
            }
            Some(name) => Ok(name.clone()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = TrackerBuilder::new();
        assert!(builder.directory.is_none());
        assert!(builder.name.is_none());
    }

    #[test]
    fn test_build_without_registry_fails() {
        let result = TrackerBuilder::new().build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = TrackerBuilder::new().registry(ClientRegistry::new()).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = TrackerBuilder::new()
            .registry(ClientRegistry::new())
            .name("  ")
            .validate_name();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let tracker = TrackerBuilder::new()
            .registry(ClientRegistry::new())
            .build()
            .expect("build");
        assert_eq!(tracker.name(), DEFAULT_NAME);
    }

    #[tokio::test]
    async fn test_build_with_name() {
        let tracker = TrackerBuilder::new()
            .directory(Arc::new(ClientRegistry::new()))
            .name("viewer")
            .build()
            .expect("build");
        assert_eq!(tracker.name(), "viewer");
    }
}
