//! Call scheduler trait and callback plumbing
//!
//! Every component in this crate exposes the same surface: a
//! non-blocking [`CallScheduler::schedule`] that accepts a payload plus
//! optional response and finalize callbacks. Policies compose by
//! wrapping an inner `Arc<dyn CallScheduler>`, so batching can sit on
//! top of queueing, queueing on top of the HTTP leaf, and so on.
//!
//! The completion contract is uniform across the stack: the response
//! handler runs at most once, strictly before finalize, only when the
//! exchange succeeded; the finalize handler runs exactly once per
//! scheduled call, no matter how many underlying exchanges occurred.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CallError;
use crate::status::{StatusCode, StatusData};

/// A JSON value sent to or received from the endpoint
pub type Payload = serde_json::Value;

/// Callback invoked with the response payload when the underlying
/// exchange succeeds. Returning an error folds the call's completion
/// into [`StatusCode::ResponseCallbackError`].
pub type ResponseHandler = Box<dyn FnOnce(Payload) -> eyre::Result<()> + Send>;

/// Terminal callback, invoked exactly once per scheduled call
pub type FinalizeHandler = Box<dyn FnOnce(StatusCode, StatusData) + Send>;

/// A call scheduler: accepts logical calls and controls when and how
/// many underlying exchanges are issued.
#[async_trait]
pub trait CallScheduler: Send + Sync {
    /// Submit one logical call
    ///
    /// Returns as soon as the call has been queued, accumulated, or
    /// dispatched; completion is reported through the callbacks. The
    /// finalize handler fires exactly once per call, including calls
    /// that are superseded before they execute.
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    );
}

/// One logical call held inside a scheduler until it is dispatched or
/// superseded
pub struct CallRequest {
    pub payload: Payload,
    pub on_response: Option<ResponseHandler>,
    pub on_finalize: Option<FinalizeHandler>,
}

impl CallRequest {
    /// Create a new call request
    pub fn new(
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) -> Self {
        Self {
            payload,
            on_response,
            on_finalize,
        }
    }
}

/// Convert any serializable value into a request payload
pub fn to_payload<T: serde::Serialize>(value: &T) -> Result<Payload, CallError> {
    serde_json::to_value(value).map_err(CallError::Serialize)
}

/// Invoke an optional finalize handler
pub(crate) fn issue_finalize(handler: Option<FinalizeHandler>, status: StatusCode, data: StatusData) {
    if let Some(handler) = handler {
        handler(status, data);
    }
}

/// Deliver a finished exchange through the caller's callbacks
///
/// Honors the base-call contract: response at most once, strictly
/// before finalize; a response handler error becomes
/// [`StatusCode::ResponseCallbackError`]; finalize fires exactly once.
pub fn deliver_outcome(
    outcome: Result<Payload, CallError>,
    on_response: Option<ResponseHandler>,
    on_finalize: Option<FinalizeHandler>,
) {
    match outcome {
        Ok(response) => {
            if let Some(handler) = on_response {
                if let Err(err) = handler(response) {
                    debug!(%err, "deliver_outcome: response handler failed");
                    issue_finalize(
                        on_finalize,
                        StatusCode::ResponseCallbackError,
                        Some(Payload::String(err.to_string())),
                    );
                    return;
                }
            }
            issue_finalize(on_finalize, StatusCode::Success, None);
        }
        Err(err) => {
            debug!(%err, "deliver_outcome: exchange failed");
            let status = err.status_code();
            let data = err.status_data();
            issue_finalize(on_finalize, status, data);
        }
    }
}

/// Adapter turning an async exchange function into a [`CallScheduler`]
///
/// The leaf of a scheduler composition when the endpoint is reached by
/// something other than plain HTTP POST: the function performs one
/// exchange per scheduled call and the adapter drives the callback
/// contract around it.
pub struct AdapterCall<F> {
    exchange: Arc<F>,
}

impl<F, Fut> AdapterCall<F>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, CallError>> + Send + 'static,
{
    /// Wrap an exchange function
    pub fn new(exchange: F) -> Self {
        Self {
            exchange: Arc::new(exchange),
        }
    }
}

#[async_trait]
impl<F, Fut> CallScheduler for AdapterCall<F>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, CallError>> + Send + 'static,
{
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        let exchange = Arc::clone(&self.exchange);
        tokio::spawn(async move {
            let outcome = (exchange)(payload).await;
            deliver_outcome(outcome, on_response, on_finalize);
        });
    }
}
