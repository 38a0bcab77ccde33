//! Session wire protocol
//!
//! Inbound frames from the voice platform are discriminated by
//! `interaction_type`; frames we send back are discriminated by
//! `response_type`.

use crate::domain::shared::{RelayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sequence number carried by the config frame. Fixed, and unrelated to the
/// session's response ids.
pub const CONFIG_RESPONSE_ID: u64 = 1;

/// Capabilities advertised to the platform when a session opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCapabilities {
    pub auto_reconnect: bool,
    pub call_details: bool,
    pub update_only: bool,
    pub transcript_with_tool_calls: bool,
}

impl Default for SessionCapabilities {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            call_details: true,
            update_only: true,
            transcript_with_tool_calls: true,
        }
    }
}

/// Inbound protocol event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "interaction_type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// One-time call setup carrying caller metadata
    CallDetails { call: CallMetadata },
    /// Keepalive; must be echoed back immediately
    PingPong { timestamp: Value },
    /// Live transcript/status delta for observers
    UpdateOnly {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    /// The platform wants the agent to speak
    ResponseRequired(ResponseRequest),
    /// The user has been silent; the agent may nudge
    ReminderRequired(ResponseRequest),
}

impl InboundEvent {
    /// Parse one text frame
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(RelayError::Protocol)
    }

    /// Wire name of the event kind
    pub fn interaction_type(&self) -> &'static str {
        match self {
            InboundEvent::CallDetails { .. } => "call_details",
            InboundEvent::PingPong { .. } => "ping_pong",
            InboundEvent::UpdateOnly { .. } => "update_only",
            InboundEvent::ResponseRequired(_) => "response_required",
            InboundEvent::ReminderRequired(_) => "reminder_required",
        }
    }
}

/// Call metadata delivered with `call_details`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Speaker of a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    User,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

/// Body of `response_required` / `reminder_required`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRequest {
    pub response_id: u64,
    #[serde(default)]
    pub transcript: Vec<Utterance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_with_tool_calls: Option<Value>,
}

/// Outbound protocol event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Config {
        config: SessionCapabilities,
        response_id: u64,
    },
    PingPong {
        timestamp: Value,
    },
    Response {
        response_id: u64,
        content: String,
        content_complete: bool,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        end_call: bool,
    },
}

impl OutboundEvent {
    /// Greeting frame sent once per session
    pub fn config(capabilities: SessionCapabilities) -> Self {
        OutboundEvent::Config {
            config: capabilities,
            response_id: CONFIG_RESPONSE_ID,
        }
    }

    /// Echo of an inbound keepalive
    pub fn pong(timestamp: Value) -> Self {
        OutboundEvent::PingPong { timestamp }
    }

    /// A finished or partial agent utterance
    pub fn response(response_id: u64, content: impl Into<String>, content_complete: bool) -> Self {
        OutboundEvent::Response {
            response_id,
            content: content.into(),
            content_complete,
            end_call: false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(RelayError::Serialization)
    }
}
