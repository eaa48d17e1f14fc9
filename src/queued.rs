//! Serialized call queueing
//!
//! At most one underlying call in flight at a time; the rest wait in
//! FIFO order. Dispatch follows submission order strictly, and a call
//! never starts before every earlier call has finalized.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::call::{
    CallRequest, CallScheduler, FinalizeHandler, Payload, ResponseHandler, issue_finalize,
};

struct QueuedState {
    pending: VecDeque<CallRequest>,
    in_flight: bool,
}

struct QueuedShared {
    inner: Arc<dyn CallScheduler>,
    state: Mutex<QueuedState>,
}

/// Serializes calls through the wrapped scheduler
pub struct QueuedScheduler {
    shared: Arc<QueuedShared>,
}

impl QueuedScheduler {
    /// Wrap an inner scheduler with FIFO queueing
    pub fn new(inner: Arc<dyn CallScheduler>) -> Self {
        Self {
            shared: Arc::new(QueuedShared {
                inner,
                state: Mutex::new(QueuedState {
                    pending: VecDeque::new(),
                    in_flight: false,
                }),
            }),
        }
    }
}

#[async_trait]
impl CallScheduler for QueuedScheduler {
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        let request = CallRequest::new(payload, on_response, on_finalize);
        let head = {
            let mut state = self.shared.state.lock();
            state.pending.push_back(request);
            if state.in_flight {
                debug!(
                    queued = state.pending.len(),
                    "QueuedScheduler::schedule: call in flight, enqueued"
                );
                None
            } else {
                state.in_flight = true;
                state.pending.pop_front()
            }
        };
        if let Some(head) = head {
            Arc::clone(&self.shared).dispatch(head).await;
        }
    }
}

impl QueuedShared {
    /// Issue one request through the inner scheduler
    ///
    /// The wrapped finalize dequeues and dispatches the next pending
    /// request (or clears the in-flight flag) before the original
    /// caller's finalize is invoked, so reentrant `schedule` calls from
    /// inside a finalize observe consistent state.
    fn dispatch(
        self: Arc<Self>,
        request: CallRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
        let CallRequest {
            payload,
            on_response,
            on_finalize,
        } = request;

        let shared = Arc::clone(&self);
        let queued_finalize: FinalizeHandler = Box::new(move |status, data| {
            let next = {
                let mut state = shared.state.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.in_flight = false;
                }
                next
            };
            if let Some(next) = next {
                debug!("QueuedScheduler: dispatching next queued call");
                tokio::spawn(shared.dispatch(next));
            }
            issue_finalize(on_finalize, status, data);
        });

        self.inner.schedule(payload, on_response, Some(queued_finalize)).await;
        })
    }
}
