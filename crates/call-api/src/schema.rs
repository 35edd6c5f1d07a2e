//! Wire schema for the lift-call gateway.
//!
//! Outbound messages share one envelope (`type`, `buildingId`, `callType`,
//! `groupId`, `payload`). Call payloads use the v2 nested shape, with the call
//! parameters under `payload.call`. Older scripts put those parameters
//! directly under `payload`; such payloads are accepted only through
//! [`migrate_call_payload`].

use crate::error::ClientError;
use crate::types::{iso_timestamp, new_request_id, CallAction, CallRequest, CancelRequest};
use crate::validator::ValidationOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// API identifier carried in every outbound envelope.
pub const API_TYPE: &str = "lift-call-api-v2";

/// Connection id used in locally synthesized responses.
pub const SIMULATED_CONNECTION_ID: &str = "SIMULATED_CONNECTION_ID";

/// Kind of outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Place a call
    Action,
    /// Cancel a call by session id
    Delete,
}

/// Outbound message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    /// Always [`API_TYPE`]
    #[serde(rename = "type")]
    pub api_type: String,
    /// `building:<id>`
    pub building_id: String,
    /// Message kind
    pub call_type: CallType,
    /// Dispatch group
    pub group_id: String,
    /// Kind-specific body
    pub payload: P,
}

/// Body of an `action` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    /// Request identifier
    pub request_id: i32,
    /// Source area
    pub area: i32,
    /// ISO-8601 timestamp
    pub time: String,
    /// Terminal identifier
    pub terminal: i32,
    /// Call parameters
    pub call: CallBody,
}

/// Call parameters nested under `payload.call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallBody {
    /// Action code
    pub action: CallAction,
    /// Destination area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<i32>,
    /// Delay in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    /// Passenger count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<i32>,
}

/// Body of a `delete` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelPayload {
    /// Session being cancelled
    pub session_id: String,
}

/// Building and group every outbound message is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    /// `building:<id>`
    pub building_id: String,
    /// Dispatch group
    pub group_id: String,
}

impl CallTarget {
    /// Target for a raw building id (without the `building:` prefix).
    pub fn new(building_id: &str, group_id: impl Into<String>) -> Self {
        Self {
            building_id: format!("building:{building_id}"),
            group_id: group_id.into(),
        }
    }

    /// Target taken from gateway configuration
    pub fn from_config(gateway: &liftcall_core::GatewayConfig) -> Self {
        Self {
            building_id: gateway.target_building_id(),
            group_id: gateway.group_id.clone(),
        }
    }

    fn envelope<P>(&self, call_type: CallType, payload: P) -> Envelope<P> {
        Envelope {
            api_type: API_TYPE.to_string(),
            building_id: self.building_id.clone(),
            call_type,
            group_id: self.group_id.clone(),
            payload,
        }
    }

    /// `action` message for a request
    pub fn call_message(&self, request: &CallRequest) -> Envelope<CallPayload> {
        self.envelope(
            CallType::Action,
            CallPayload {
                request_id: request.request_id,
                area: request.source_area,
                time: request.timestamp.clone(),
                terminal: request.terminal,
                call: CallBody {
                    action: request.action,
                    destination: request.destination_area,
                    delay: request.delay_seconds,
                    group_size: request.group_size,
                },
            },
        )
    }

    /// `delete` message for a cancel
    pub fn cancel_message(&self, cancel: &CancelRequest) -> Envelope<CancelPayload> {
        self.envelope(
            CallType::Delete,
            CancelPayload {
                session_id: cancel.session_id.clone(),
            },
        )
    }
}

/// Layout a candidate call payload was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Call parameters directly under `payload`
    V1Flat,
    /// Call parameters under `payload.call`
    V2Nested,
}

#[derive(Debug, Deserialize)]
struct AnyCallPayload {
    request_id: Option<i32>,
    area: i32,
    time: Option<String>,
    terminal: i32,
    call: Option<CallBody>,
    action: Option<CallAction>,
    destination: Option<i32>,
    delay: Option<i32>,
    group_size: Option<i32>,
}

impl AnyCallPayload {
    fn has_flat_fields(&self) -> bool {
        self.action.is_some()
            || self.destination.is_some()
            || self.delay.is_some()
            || self.group_size.is_some()
    }
}

/// Turn a candidate payload of either layout into a [`CallRequest`].
///
/// Accepts a full envelope or a bare payload object. Missing `request_id` and
/// `time` are filled in. When both layouts are present the nested one wins.
pub fn migrate_call_payload(value: Value) -> Result<(CallRequest, SchemaVersion), ClientError> {
    let payload = match value {
        Value::Object(mut map) if map.contains_key("payload") => {
            map.remove("payload").unwrap_or(Value::Null)
        }
        other => other,
    };
    let any: AnyCallPayload = serde_json::from_value(payload)
        .map_err(|e| ClientError::Schema(e.to_string()))?;

    let (body, version) = match any.call.clone() {
        Some(body) => {
            if any.has_flat_fields() {
                warn!("call payload mixes v1 and v2 layouts; ignoring the flat fields");
            }
            (body, SchemaVersion::V2Nested)
        }
        None => {
            let action = any
                .action
                .ok_or_else(|| ClientError::Schema("call action missing".to_string()))?;
            warn!("migrating v1 flat call payload to the v2 layout");
            (
                CallBody {
                    action,
                    destination: any.destination,
                    delay: any.delay,
                    group_size: any.group_size,
                },
                SchemaVersion::V1Flat,
            )
        }
    };

    let request = CallRequest {
        request_id: any.request_id.unwrap_or_else(new_request_id),
        source_area: any.area,
        timestamp: any.time.unwrap_or_else(iso_timestamp),
        terminal: any.terminal,
        action: body.action,
        destination_area: body.destination,
        delay_seconds: body.delay,
        group_size: body.group_size,
    };
    Ok((request, version))
}

/// Fields read from inbound gateway messages
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Message body
    #[serde(default)]
    pub data: Option<InboundData>,
}

/// `data` object of an inbound message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundData {
    /// Session id, a string or a number depending on the gateway build
    #[serde(default)]
    pub session_id: Option<Value>,
    /// Allowed call types, reported by some responses
    #[serde(default, rename = "call_types")]
    pub call_types: Option<Value>,
    /// Error text
    #[serde(default)]
    pub error: Option<String>,
    /// Reason a call was cancelled
    #[serde(default)]
    pub cancel_reason: Option<String>,
    /// Server time
    #[serde(default)]
    pub time: Option<String>,
}

/// One inbound text frame, parsed as far as it goes
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Frame text as received
    pub raw: String,
    /// Parsed JSON, when the frame is JSON
    pub json: Option<Value>,
    /// Typed view, when the JSON matches the inbound schema
    pub message: Option<InboundMessage>,
}

impl InboundFrame {
    /// Parse a frame. Non-JSON frames keep only their raw text.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let json: Option<Value> = serde_json::from_str(&raw).ok();
        let message = json
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Self { raw, json, message }
    }

    fn data(&self) -> Option<&InboundData> {
        self.message.as_ref().and_then(|m| m.data.as_ref())
    }

    /// Non-empty session id carried by this frame
    pub fn session_id(&self) -> Option<String> {
        match self.data()?.session_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `data.call_types`, if present
    pub fn call_types(&self) -> Option<&Value> {
        self.data()?.call_types.as_ref()
    }

    /// `data.error`, if present
    pub fn error(&self) -> Option<&str> {
        self.data()?.error.as_deref()
    }

    /// `data.cancelReason`, if present
    pub fn cancel_reason(&self) -> Option<&str> {
        self.data()?.cancel_reason.as_deref()
    }
}

/// Locally fabricated event shaped like a gateway response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedResponse {
    /// Always [`SIMULATED_CONNECTION_ID`]
    pub connection_id: String,
    /// Request the event answers
    pub request_id: i32,
    /// Mirrors the gateway's acknowledgement status
    pub status_code: u16,
    /// Event body
    pub data: SimulatedData,
}

/// Body of a [`SimulatedResponse`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedData {
    /// Time the event was produced
    pub time: String,
    /// Set for rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set for cancellations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl SimulatedResponse {
    /// Event for a refused request; `None` for accepted ones.
    pub fn for_outcome(request_id: i32, outcome: &ValidationOutcome) -> Option<Self> {
        let (error, cancel_reason) = match outcome {
            ValidationOutcome::Accepted(_) => return None,
            ValidationOutcome::Rejected { reason } => (Some(format!("Ignoring call, {reason}")), None),
            ValidationOutcome::Cancelled { reason } => (None, Some(reason.clone())),
        };
        Some(Self {
            connection_id: SIMULATED_CONNECTION_ID.to_string(),
            request_id,
            status_code: 201,
            data: SimulatedData {
                time: iso_timestamp(),
                error,
                cancel_reason,
            },
        })
    }
}
