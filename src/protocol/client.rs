//! Client descriptor types.
//!
//! A [`Client`] pairs a hub-assigned [`ClientId`] with whatever
//! [`Metadata`] and [`Subscriptions`] the client has declared.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::ClientId;

// ============================================================================
// Metadata
// ============================================================================

/// Descriptive information a client declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Creates empty metadata.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns an entry.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the `samp.name` entry.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get("samp.name").and_then(Value::as_str)
    }

    /// Returns the `samp.description.text` entry.
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.get("samp.description.text").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// The set of message types a client has subscribed to.
///
/// Keys are MType patterns; values are per-subscription annotations
/// (usually empty maps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subscriptions(Map<String, Value>);

impl Subscriptions {
    /// Creates an empty subscription set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription pattern.
    #[inline]
    #[must_use]
    pub fn add(mut self, pattern: impl Into<String>) -> Self {
        self.0.insert(pattern.into(), Value::Object(Map::new()));
        self
    }

    /// Returns the subscribed patterns.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns `true` if `mtype` matches any subscribed pattern.
    ///
    /// `*` matches everything; `a.b.*` matches `a.b` and anything below it.
    #[must_use]
    pub fn is_subscribed(&self, mtype: &str) -> bool {
        self.patterns().any(|pattern| mtype_matches(pattern, mtype))
    }
}

impl From<Map<String, Value>> for Subscriptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Matches an MType against a subscription pattern.
fn mtype_matches(pattern: &str, mtype: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix(".*") {
        Some(prefix) => {
            mtype == prefix
                || (mtype.starts_with(prefix) && mtype[prefix.len()..].starts_with('.'))
        }
        None => pattern == mtype,
    }
}

// ============================================================================
// Client
// ============================================================================

/// Descriptor of a client registered with the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// Public client ID.
    pub id: ClientId,

    /// Declared metadata, if any.
    pub metadata: Option<Metadata>,

    /// Declared subscriptions, if any.
    pub subscriptions: Option<Subscriptions>,
}

impl Client {
    /// Creates a descriptor with nothing declared yet.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ClientId>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
            subscriptions: None,
        }
    }

    /// Sets the metadata.
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the subscriptions.
    #[inline]
    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: Subscriptions) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    /// Returns the declared name, falling back to the client ID.
    #[must_use]
    pub fn label(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(Metadata::name)
            .unwrap_or_else(|| self.id.as_str())
    }
}

// ============================================================================
// RegInfo
// ============================================================================

/// Registration information for a live hub connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegInfo {
    /// Client ID of the hub itself.
    pub hub_id: ClientId,

    /// Client ID assigned to this connection.
    pub self_id: ClientId,
}

impl RegInfo {
    /// Creates registration info.
    #[inline]
    #[must_use]
    pub fn new(hub_id: impl Into<ClientId>, self_id: impl Into<ClientId>) -> Self {
        Self {
            hub_id: hub_id.into(),
            self_id: self_id.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
