//! HTTP POST call to the endpoint
//!
//! The leaf of a scheduler composition: performs one JSON-over-POST
//! exchange per scheduled call. Single attempt, no implicit retry;
//! retry policy, if any, belongs to the caller.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::call::{CallScheduler, FinalizeHandler, Payload, ResponseHandler, deliver_outcome};
use crate::config::HttpConfig;
use crate::error::CallError;

/// Performs one logical call to the endpoint per `schedule`
pub struct HttpCall {
    endpoint: String,
    http: Client,
}

impl HttpCall {
    /// Create a call for an endpoint with default client settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }

    /// Create a call from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, CallError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }

    /// Perform the POST exchange and parse the response body
    async fn exchange(http: Client, endpoint: String, body: Vec<u8>) -> Result<Payload, CallError> {
        let response = http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%endpoint, %status, "HttpCall::exchange: non-success status");
            return Err(CallError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(CallError::Deserialize)
    }
}

#[async_trait]
impl CallScheduler for HttpCall {
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        debug!(endpoint = %self.endpoint, "HttpCall::schedule: called");

        // Serialization failure means no network activity at all
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(err) => {
                deliver_outcome(Err(CallError::Serialize(err)), on_response, on_finalize);
                return;
            }
        };

        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            let outcome = Self::exchange(http, endpoint, body).await;
            deliver_outcome(outcome, on_response, on_finalize);
        });
    }
}
