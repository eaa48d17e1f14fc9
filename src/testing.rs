//! Test doubles shared by the scheduler unit tests

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::call::{CallScheduler, FinalizeHandler, Payload, ResponseHandler, deliver_outcome};
use crate::error::CallError;
use crate::status::{StatusCode, StatusData};

type Responder = Box<dyn Fn(&Payload) -> Result<Payload, CallError> + Send + Sync>;
type HeldCall = (Option<ResponseHandler>, Option<FinalizeHandler>);

/// Inner-call double: records every dispatched payload and either
/// completes synchronously through a responder or holds the callbacks
/// until the test releases them.
pub(crate) struct MockCall {
    dispatched: Mutex<Vec<(Instant, Payload)>>,
    respond: Option<Responder>,
    held: Mutex<Vec<HeldCall>>,
}

impl MockCall {
    /// Complete each call synchronously with `respond(payload)`
    pub fn immediate<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&Payload) -> Result<Payload, CallError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            dispatched: Mutex::new(Vec::new()),
            respond: Some(Box::new(respond)),
            held: Mutex::new(Vec::new()),
        })
    }

    /// Echo the request payload back as the response
    pub fn echo() -> Arc<Self> {
        Self::immediate(|payload| Ok(payload.clone()))
    }

    /// Hold every call open until [`MockCall::release`]
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            dispatched: Mutex::new(Vec::new()),
            respond: None,
            held: Mutex::new(Vec::new()),
        })
    }

    /// Payloads dispatched so far, in dispatch order
    pub fn dispatched(&self) -> Vec<Payload> {
        self.dispatched.lock().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Dispatch timestamps, in dispatch order
    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.dispatched.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Number of calls currently held open
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Complete the oldest held call with the given outcome
    pub fn release(&self, outcome: Result<Payload, CallError>) {
        let (on_response, on_finalize) = self.held.lock().remove(0);
        deliver_outcome(outcome, on_response, on_finalize);
    }
}

#[async_trait]
impl CallScheduler for MockCall {
    async fn schedule(
        &self,
        payload: Payload,
        on_response: Option<ResponseHandler>,
        on_finalize: Option<FinalizeHandler>,
    ) {
        self.dispatched.lock().push((Instant::now(), payload.clone()));
        match &self.respond {
            Some(respond) => deliver_outcome(respond(&payload), on_response, on_finalize),
            None => self.held.lock().push((on_response, on_finalize)),
        }
    }
}

/// Shared log of finalize deliveries
pub(crate) type FinalizeLog = Arc<Mutex<Vec<(StatusCode, StatusData)>>>;

/// Shared log of response deliveries
pub(crate) type ResponseLog = Arc<Mutex<Vec<Payload>>>;

/// Finalize handler that appends deliveries to a shared log
pub(crate) fn recording_finalize(log: &FinalizeLog) -> FinalizeHandler {
    let log = Arc::clone(log);
    Box::new(move |status, data| log.lock().push((status, data)))
}

/// Response handler that appends payloads to a shared log
pub(crate) fn recording_response(log: &ResponseLog) -> ResponseHandler {
    let log = Arc::clone(log);
    Box::new(move |payload| {
        log.lock().push(payload);
        Ok(())
    })
}

/// Yield until spawned dispatch chains have settled
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
