//! Completion status codes
//!
//! Every logical call terminates with exactly one status delivery,
//! whether it executed, failed, or was superseded without executing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal status delivered to a call's finalize callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// The exchange completed and the response callback returned cleanly.
    /// Also reported for superseded rate-limited calls that never executed.
    Success,

    /// The transport exchange failed or the endpoint returned a
    /// non-success HTTP status.
    TransportError,

    /// The request payload could not be serialized; no network activity
    /// occurred.
    SerializeError,

    /// The response body could not be deserialized.
    DeserializeError,

    /// The caller's response callback failed.
    ResponseCallbackError,
}

impl StatusCode {
    /// Check whether this status reports successful completion
    pub fn is_success(self) -> bool {
        matches!(self, StatusCode::Success)
    }

    /// Numeric wire code, stable across releases
    pub fn code(self) -> u8 {
        match self {
            StatusCode::Success => 0,
            StatusCode::TransportError => 1,
            StatusCode::SerializeError => 2,
            StatusCode::DeserializeError => 3,
            StatusCode::ResponseCallbackError => 4,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "success",
            StatusCode::TransportError => "transport error",
            StatusCode::SerializeError => "serialize error",
            StatusCode::DeserializeError => "deserialize error",
            StatusCode::ResponseCallbackError => "response callback error",
        };
        write!(f, "{name}")
    }
}

/// Status detail accompanying a [`StatusCode`]: the HTTP status for
/// transport errors, the rendered cause for codec failures, absent on
/// success.
pub type StatusData = Option<serde_json::Value>;
