//! rpcsched - Composable schedulers for asynchronous JSON RPC calls
//!
//! rpcsched controls *when* and *how many* underlying exchanges are
//! issued against a single trusted endpoint, while preserving a uniform
//! completion contract: every scheduled call receives exactly one
//! finalize notification with a [`StatusCode`], whether it executed,
//! failed, or was superseded without ever reaching the transport.
//!
//! Each component exposes the same surface ([`CallScheduler::schedule`])
//! so policies compose by wrapping one another:
//!
//! - [`HttpCall`] - the leaf: one JSON-over-POST exchange per call
//! - [`AdapterCall`] - the leaf for non-HTTP transports
//! - [`QueuedScheduler`] - serializes calls, one in flight, FIFO order
//! - [`BatchedScheduler`] - collects a time window of calls into one
//!   aggregate array exchange and demultiplexes the response by index
//! - [`RateLimitedScheduler`] - enforces a minimum interval between
//!   dispatch starts; bursts coalesce to the newest call
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rpcsched::{BatchedScheduler, CallScheduler, HttpCall, QueuedScheduler};
//! use serde_json::json;
//!
//! # async fn demo() {
//! // Batch lookups into one array POST every 50ms, with at most one
//! // aggregate exchange in flight at a time.
//! let endpoint = Arc::new(HttpCall::new("https://api.example.com/lookup-batched"));
//! let queued = Arc::new(QueuedScheduler::new(endpoint));
//! let batched = BatchedScheduler::new(queued, Duration::from_millis(50));
//!
//! batched
//!     .schedule(
//!         json!({"key": "user:42"}),
//!         Some(Box::new(|response| {
//!             println!("got {response}");
//!             Ok(())
//!         })),
//!         Some(Box::new(|status, _data| {
//!             println!("call finished: {status}");
//!         })),
//!     )
//!     .await;
//! # }
//! ```

pub mod batched;
pub mod call;
pub mod config;
pub mod error;
pub mod http;
pub mod queued;
pub mod rate_limited;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use batched::BatchedScheduler;
pub use call::{
    AdapterCall, CallRequest, CallScheduler, FinalizeHandler, Payload, ResponseHandler,
    deliver_outcome, to_payload,
};
pub use config::{HttpConfig, ScheduleConfig};
pub use error::CallError;
pub use http::HttpCall;
pub use queued::QueuedScheduler;
pub use rate_limited::RateLimitedScheduler;
pub use status::{StatusCode, StatusData};
