//! Call error types

use serde_json::Value;
use thiserror::Error;

use crate::status::{StatusCode, StatusData};

/// Errors that can occur while performing one underlying exchange
#[derive(Debug, Error)]
pub enum CallError {
    #[error("failed to serialize request payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to deserialize response payload: {0}")]
    Deserialize(#[source] serde_json::Error),
}

impl CallError {
    /// Map this error to the status code delivered at finalize
    pub fn status_code(&self) -> StatusCode {
        match self {
            CallError::Serialize(_) => StatusCode::SerializeError,
            CallError::Network(_) | CallError::HttpStatus { .. } | CallError::Transport(_) => {
                StatusCode::TransportError
            }
            CallError::Deserialize(_) => StatusCode::DeserializeError,
        }
    }

    /// Status detail delivered alongside the status code
    ///
    /// HTTP failures carry the numeric status; everything else carries
    /// the rendered cause.
    pub fn status_data(&self) -> StatusData {
        match self {
            CallError::HttpStatus { status } => Some(Value::from(*status)),
            other => Some(Value::String(other.to_string())),
        }
    }
}
