//! # Async Task Polling
//!
//! Submits long-running backend jobs and follows them to a terminal status.
//! [`HttpTaskClient`] talks to the REST backend, [`TaskPoller`] runs the
//! sequential fetch/sleep chain on top of any [`TaskBackend`].

pub mod client;
pub mod poller;
pub mod registry;
pub mod status;
pub mod trace;

pub use client::{HttpTaskClient, TaskBackend};
pub use poller::TaskPoller;
pub use registry::{InFlightRegistry, RegionGuard};
pub use status::{ProgressEntry, SubmittedTask, TaskProgress, TaskStatus};
pub use trace::{PollOutcome, PollStep, PollTrace};
