//! Lifecycle notifications pushed by the voice platform

use crate::domain::shared::{RelayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One webhook delivery: `{"event": "call_ended", "call": {"call_id": ...}}`.
///
/// The same shape is what observers receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub event: String,
    #[serde(default)]
    pub call: Map<String, Value>,
}

impl WebhookNotification {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(RelayError::Protocol)
    }

    /// Call id from the metadata, `"unknown"` when absent
    pub fn call_id(&self) -> &str {
        self.call
            .get("call_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}
