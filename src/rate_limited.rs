//! Rate-limited calls with supersession
//!
//! Enforces a minimum interval between successive dispatch starts. At
//! most one call waits for its start; a newer arrival supersedes it,
//! and the displaced caller is finalized with synthetic success. Only
//! the most recent request of a rapid burst reaches the transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::call::{
    CallRequest, CallScheduler, FinalizeHandler, Payload, ResponseHandler, issue_finalize,
};
use crate::status::StatusCode;

struct RateState {
    slot: Option<CallRequest>,
    in_flight: bool,
    last_dispatch_at: Instant,
}

struct RateShared {
    inner: Arc<dyn CallScheduler>,
    interval: Duration,
    state: Mutex<RateState>,
}

/// Spaces out dispatches and coalesces bursts to the newest call
pub struct RateLimitedScheduler {
    shared: Arc<RateShared>,
}

impl RateLimitedScheduler {
    /// Wrap an inner scheduler with a minimum interval between
    /// dispatch starts
    ///
    /// The interval is anchored at construction, so a burst submitted
    /// right after creation coalesces before the first dispatch too.
    pub fn new(inner: Arc<dyn CallScheduler>, rate_interval: Duration) -> Self {
        Self {
            shared: Arc::new(RateShared {
                inner,
                interval: rate_interval,
                state: Mutex::new(RateState {
                    slot: None,
                    in_flight: false,
                    last_dispatch_at: Instant::now(),
                }),
            }),
        }
    }
}

#[async_trait]
impl CallScheduler for RateLimitedScheduler {
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        let request = CallRequest::new(payload, on_response, on_finalize);
        let (superseded, start) = {
            let mut state = self.shared.state.lock();
            let superseded = state.slot.replace(request);
            let start = if state.in_flight {
                false
            } else {
                state.in_flight = true;
                true
            };
            (superseded, start)
        };

        if let Some(old) = superseded {
            // The displaced call never executes; it is reported as
            // having completed successfully, not as an error. Its
            // response handler is dropped unused.
            debug!("RateLimitedScheduler::schedule: superseding pending call");
            issue_finalize(old.on_finalize, StatusCode::Success, None);
        }
        if start {
            Arc::clone(&self.shared).arm_dispatch();
        }
    }
}

impl RateShared {
    /// Arm the next dispatch, honoring the minimum interval since the
    /// previous dispatch start
    fn arm_dispatch(self: Arc<Self>) {
        let delay = {
            let state = self.state.lock();
            self.interval.saturating_sub(state.last_dispatch_at.elapsed())
        };
        debug!(?delay, "RateLimitedScheduler: arming dispatch");
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.dispatch().await;
        });
    }

    /// Take the pending call out of the slot and issue it
    async fn dispatch(self: Arc<Self>) {
        let request = {
            let mut state = self.state.lock();
            match state.slot.take() {
                Some(request) => {
                    state.last_dispatch_at = Instant::now();
                    request
                }
                None => {
                    state.in_flight = false;
                    return;
                }
            }
        };

        let CallRequest {
            payload,
            on_response,
            on_finalize,
        } = request;

        let shared = Arc::clone(&self);
        let limited_finalize: FinalizeHandler = Box::new(move |status, data| {
            let rearm = {
                let mut state = shared.state.lock();
                if state.slot.is_some() {
                    true
                } else {
                    state.in_flight = false;
                    false
                }
            };
            if rearm {
                // A call arrived while this one was executing
                Arc::clone(&shared).arm_dispatch();
            }
            // Executed calls get the true underlying status; only
            // superseded calls get synthesized success
            issue_finalize(on_finalize, status, data);
        });

        self.inner.schedule(payload, on_response, Some(limited_finalize)).await;
    }
}
