//! Message and Response payload types.
//!
//! Payloads are opaque to the tracker: it records and forwards them
//! without interpreting their contents. These types only validate the
//! mandatory keys of the bus encoding.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ============================================================================
// Message
// ============================================================================

/// A message sent between clients.
///
/// # Format
///
/// ```json
/// {
///   "samp.mtype": "table.load.votable",
///   "samp.params": { "url": "file:///tmp/t.xml" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message type, dot-separated (e.g. `samp.app.ping`).
    #[serde(rename = "samp.mtype")]
    pub mtype: String,

    /// Message parameters.
    #[serde(rename = "samp.params", default)]
    pub params: Map<String, Value>,
}

impl Message {
    /// Creates a message with no parameters.
    #[inline]
    #[must_use]
    pub fn new(mtype: impl Into<String>) -> Self {
        Self {
            mtype: mtype.into(),
            params: Map::new(),
        }
    }

    /// Adds a parameter.
    #[inline]
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter value.
    #[inline]
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Parses a message from a raw map value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `samp.mtype` is
    /// missing or the value is not a map.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Converts the message into its raw map form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("samp.mtype".to_string(), Value::String(self.mtype.clone()));
        map.insert("samp.params".to_string(), Value::Object(self.params.clone()));
        Value::Object(map)
    }
}

// ============================================================================
// ResponseStatus
// ============================================================================

/// Outcome reported in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// Processing succeeded.
    #[serde(rename = "samp.ok")]
    Ok,
    /// Processing succeeded with caveats.
    #[serde(rename = "samp.warning")]
    Warning,
    /// Processing failed.
    #[serde(rename = "samp.error")]
    Error,
}

// ============================================================================
// ErrInfo
// ============================================================================

/// Error details carried by a warning or error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrInfo {
    /// Short description of the error.
    #[serde(rename = "samp.errortxt")]
    pub error_txt: String,

    /// Description suitable for end users.
    #[serde(rename = "samp.usertxt", default, skip_serializing_if = "Option::is_none")]
    pub user_txt: Option<String>,

    /// Debugging detail, e.g. a stack trace.
    #[serde(rename = "samp.debugtxt", default, skip_serializing_if = "Option::is_none")]
    pub debug_txt: Option<String>,

    /// Application-defined error code.
    #[serde(rename = "samp.code", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrInfo {
    /// Creates error info with only the error text set.
    #[inline]
    #[must_use]
    pub fn new(error_txt: impl Into<String>) -> Self {
        Self {
            error_txt: error_txt.into(),
            user_txt: None,
            debug_txt: None,
            code: None,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response to a call.
///
/// # Format
///
/// ```json
/// {
///   "samp.status": "samp.ok",
///   "samp.result": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response status.
    #[serde(rename = "samp.status")]
    pub status: ResponseStatus,

    /// Result data (if ok or warning).
    #[serde(rename = "samp.result", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,

    /// Error details (if warning or error).
    #[serde(rename = "samp.error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrInfo>,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn ok(result: Map<String, Value>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a warning response.
    #[inline]
    #[must_use]
    pub fn warning(result: Map<String, Value>, error: ErrInfo) -> Self {
        Self {
            status: ResponseStatus::Warning,
            result: Some(result),
            error: Some(error),
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn error(error: ErrInfo) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            error: Some(error),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// Gets a string value from the result.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.get(key))
            .and_then(|v| v.as_str())
    }

    /// Parses a response from a raw map value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `samp.status` is
    /// missing or unknown.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Converts the response into its raw map form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_builder() {
        let msg = Message::new("table.load.votable").with_param("url", "file:///t.xml");
        assert_eq!(msg.mtype, "table.load.votable");
        assert_eq!(msg.param("url"), Some(&json!("file:///t.xml")));
        assert_eq!(msg.param("missing"), None);
    }

    #[test]
    fn test_message_from_value() {
        let value = json!({
            "samp.mtype": "samp.app.ping",
            "samp.params": {"x": 1}
        });
        let msg = Message::from_value(value.clone()).expect("parse");
        assert_eq!(msg.mtype, "samp.app.ping");
        assert_eq!(msg.to_value(), value);
    }

    #[test]
    fn test_message_params_default_empty() {
        let msg = Message::from_value(json!({"samp.mtype": "samp.app.ping"})).expect("parse");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_message_without_mtype_rejected() {
        let result = Message::from_value(json!({"samp.params": {}}));
        assert!(matches!(result, Err(crate::Error::Json(_))));
    }

    #[test]
    fn test_ok_response_format() {
        let mut result = Map::new();
        result.insert("status".into(), json!("ok"));
        let response = Response::ok(result);

        let value = response.to_value().expect("serialize");
        assert_eq!(value["samp.status"], json!("samp.ok"));
        assert_eq!(value["samp.result"]["status"], json!("ok"));
        assert!(value.get("samp.error").is_none());
        assert!(response.is_ok());
        assert_eq!(response.get_str("status"), Some("ok"));
    }

    #[test]
    fn test_error_response_parse() {
        let value = json!({
            "samp.status": "samp.error",
            "samp.error": {"samp.errortxt": "bad table", "samp.code": "E1"}
        });
        let response = Response::from_value(value).expect("parse");
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(!response.is_ok());
        assert_eq!(response.get_str("anything"), None);
        let error = response.error.as_ref().expect("error info");
        assert_eq!(error.error_txt, "bad table");
        assert_eq!(error.code.as_deref(), Some("E1"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = Response::from_value(json!({"samp.status": "samp.maybe"}));
        assert!(result.is_err());
    }
}
