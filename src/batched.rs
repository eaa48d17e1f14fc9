//! Time-windowed call batching
//!
//! Calls arriving within `batch_interval` of the first are collected
//! and dispatched as one aggregate exchange carrying an ordered array
//! of payloads. The endpoint must answer with an equally long,
//! index-aligned array, which is demultiplexed back to the individual
//! callers. Calls arriving while an aggregate is in flight form the
//! next batch; batches are never merged or split.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{bail, ensure};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::call::{CallRequest, CallScheduler, FinalizeHandler, Payload, ResponseHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchPhase {
    Idle,
    AwaitingDispatch,
    InFlight,
}

struct BatchState {
    accumulator: Vec<CallRequest>,
    phase: BatchPhase,
    first_call_at: Instant,
}

struct BatchShared {
    inner: Arc<dyn CallScheduler>,
    interval: Duration,
    state: Mutex<BatchState>,
}

/// Collects a time window of calls into one aggregate array exchange
pub struct BatchedScheduler {
    shared: Arc<BatchShared>,
}

impl BatchedScheduler {
    /// Wrap an inner scheduler, batching calls over `batch_interval`
    ///
    /// The inner scheduler must reach an endpoint that accepts an array
    /// of payloads and answers with an index-aligned array of responses.
    pub fn new(inner: Arc<dyn CallScheduler>, batch_interval: Duration) -> Self {
        Self {
            shared: Arc::new(BatchShared {
                inner,
                interval: batch_interval,
                state: Mutex::new(BatchState {
                    accumulator: Vec::new(),
                    phase: BatchPhase::Idle,
                    first_call_at: Instant::now(),
                }),
            }),
        }
    }
}

#[async_trait]
impl CallScheduler for BatchedScheduler {
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        let request = CallRequest::new(payload, on_response, on_finalize);
        let arm = {
            let mut state = self.shared.state.lock();
            if state.accumulator.is_empty() {
                state.first_call_at = Instant::now();
            }
            state.accumulator.push(request);
            debug!(
                accumulated = state.accumulator.len(),
                phase = ?state.phase,
                "BatchedScheduler::schedule: call joined batch"
            );
            if state.phase == BatchPhase::Idle {
                state.phase = BatchPhase::AwaitingDispatch;
                Some(state.first_call_at)
            } else {
                None
            }
        };
        if let Some(first_call_at) = arm {
            Arc::clone(&self.shared).arm_dispatch(first_call_at);
        }
    }
}

impl BatchShared {
    /// Arm a delayed dispatch for the remainder of the batch window
    fn arm_dispatch(self: Arc<Self>, first_call_at: Instant) {
        let delay = self.interval.saturating_sub(first_call_at.elapsed());
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.issue().await;
        });
    }

    /// Swap the accumulator out and issue the aggregate call
    async fn issue(self: Arc<Self>) {
        let batch = {
            let mut state = self.state.lock();
            state.phase = BatchPhase::InFlight;
            std::mem::take(&mut state.accumulator)
        };

        let mut payloads = Vec::with_capacity(batch.len());
        let mut response_handlers = Vec::with_capacity(batch.len());
        let mut finalize_handlers = Vec::with_capacity(batch.len());
        for request in batch {
            payloads.push(request.payload);
            response_handlers.push(request.on_response);
            finalize_handlers.push(request.on_finalize);
        }
        debug!(batch_len = payloads.len(), "BatchedScheduler: dispatching aggregate call");

        // Demultiplex the aggregate response by index. A malformed
        // aggregate is a protocol violation surfaced through the
        // aggregate call's own completion status.
        let expected = response_handlers.len();
        let aggregate_response: ResponseHandler = Box::new(move |aggregate| {
            let responses = match aggregate {
                Payload::Array(responses) => responses,
                other => bail!("aggregate response is not an array: {other}"),
            };
            ensure!(
                responses.len() == expected,
                "aggregate response has {} elements, expected {}",
                responses.len(),
                expected
            );
            for (handler, response) in response_handlers.into_iter().zip(responses) {
                if let Some(handler) = handler {
                    handler(response)?;
                }
            }
            Ok(())
        });

        let shared = Arc::clone(&self);
        let aggregate_finalize: FinalizeHandler = Box::new(move |status, data| {
            let rearm = {
                let mut state = shared.state.lock();
                if state.accumulator.is_empty() {
                    state.phase = BatchPhase::Idle;
                    None
                } else {
                    // Calls landed while this batch was in flight
                    state.phase = BatchPhase::AwaitingDispatch;
                    Some(state.first_call_at)
                }
            };
            if let Some(first_call_at) = rearm {
                Arc::clone(&shared).arm_dispatch(first_call_at);
            }

            // Every member of the batch gets the same status and data.
            // A misbehaving finalize must not rob its siblings of
            // delivery.
            for handler in finalize_handlers {
                let Some(handler) = handler else { continue };
                let data = data.clone();
                let delivered = catch_unwind(AssertUnwindSafe(move || handler(status, data)));
                if delivered.is_err() {
                    warn!(%status, "BatchedScheduler: finalize handler panicked, continuing fan-out");
                }
            }
        });

        self.inner
            .schedule(
                Payload::Array(payloads),
                Some(aggregate_response),
                Some(aggregate_finalize),
            )
            .await;
    }
}
