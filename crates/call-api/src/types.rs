//! Call request types
//!
//! A [`CallRequest`] is an immutable value built fresh for every call attempt.

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Call action code
///
/// Serialized as the bare integer code the gateway uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum CallAction {
    /// Code 0
    Unknown,
    /// Destination call (code 2)
    Destination,
    /// Landing call, upward (code 2001)
    UpDirectional,
    /// Landing call, downward (code 2002)
    DownDirectional,
    /// Any other vendor code
    Other(i32),
}

impl CallAction {
    /// Integer code sent on the wire
    pub fn code(self) -> i32 {
        match self {
            CallAction::Unknown => 0,
            CallAction::Destination => 2,
            CallAction::UpDirectional => 2001,
            CallAction::DownDirectional => 2002,
            CallAction::Other(code) => code,
        }
    }
}

impl From<i32> for CallAction {
    fn from(code: i32) -> Self {
        match code {
            0 => CallAction::Unknown,
            2 => CallAction::Destination,
            2001 => CallAction::UpDirectional,
            2002 => CallAction::DownDirectional,
            other => CallAction::Other(other),
        }
    }
}

impl From<CallAction> for i32 {
    fn from(action: CallAction) -> Self {
        action.code()
    }
}

/// Candidate call for elevator service between two areas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Client-chosen request identifier, echoed by the gateway
    pub request_id: i32,
    /// Area the passenger is standing in
    pub source_area: i32,
    /// ISO-8601 creation time
    pub timestamp: String,
    /// Terminal the call is placed from
    pub terminal: i32,
    /// Requested action
    pub action: CallAction,
    /// Target area, absent for landing calls
    pub destination_area: Option<i32>,
    /// Requested dispatch delay in seconds
    pub delay_seconds: Option<i32>,
    /// Number of passengers travelling together
    pub group_size: Option<i32>,
}

impl CallRequest {
    /// Destination call with the gateway defaults (no delay, a single passenger).
    pub fn destination_call(source_area: i32, destination_area: i32, terminal: i32) -> Self {
        Self {
            request_id: new_request_id(),
            source_area,
            timestamp: iso_timestamp(),
            terminal,
            action: CallAction::Destination,
            destination_area: Some(destination_area),
            delay_seconds: Some(0),
            group_size: Some(1),
        }
    }

    /// Same request with another action
    pub fn with_action(mut self, action: impl Into<CallAction>) -> Self {
        self.action = action.into();
        self
    }

    /// Same request with another delay
    pub fn with_delay(mut self, delay_seconds: Option<i32>) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    /// Same request with another group size
    pub fn with_group_size(mut self, group_size: Option<i32>) -> Self {
        self.group_size = group_size;
        self
    }

    /// Same request with another destination
    pub fn with_destination(mut self, destination_area: Option<i32>) -> Self {
        self.destination_area = destination_area;
        self
    }
}

/// Server-issued correlation token for an in-flight call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Session identifier
    pub session_id: String,
}

/// Request to withdraw a call identified by its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Session identifier of the call to cancel
    pub session_id: String,
}

impl From<SessionHandle> for CancelRequest {
    fn from(handle: SessionHandle) -> Self {
        Self {
            session_id: handle.session_id,
        }
    }
}

/// Random non-negative request id.
pub fn new_request_id() -> i32 {
    rand::thread_rng().gen_range(0..i32::MAX)
}

/// Current UTC time with millisecond precision, `Z` suffixed.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Floor number of an area code.
pub fn floor_of(area: i32) -> i32 {
    area / 1000
}
