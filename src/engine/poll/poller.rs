//! # Task Poller
//!
//! Drives one backend task to a terminal status. Each chain fetches the
//! status, inspects the latest progress entry and sleeps for the configured
//! interval before the next fetch, so fetches never overlap.
//!
//! A chain stops when:
//! - the latest entry is `completed`, `failed` or `error`
//! - a status fetch fails (no retry)
//! - the cancellation token fires
//! - the optional attempt ceiling or deadline is exceeded

use crate::engine::config::PollConfig;
use crate::engine::error::{FormflowError, Result};
use crate::engine::poll::client::TaskBackend;
use crate::engine::poll::registry::InFlightRegistry;
use crate::engine::poll::status::{ProgressEntry, TaskStatus};
use crate::engine::poll::trace::{PollOutcome, PollStep, PollTrace};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct TaskPoller<B: TaskBackend> {
    backend: Arc<B>,
    config: PollConfig,
    cancel: CancellationToken,
    regions: InFlightRegistry,
}

impl<B: TaskBackend> Clone for TaskPoller<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
            regions: self.regions.clone(),
        }
    }
}

impl<B: TaskBackend> TaskPoller<B> {
    pub fn new(backend: B, config: PollConfig) -> Result<Self> {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    pub fn with_shared_backend(backend: Arc<B>, config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            cancel: CancellationToken::new(),
            regions: InFlightRegistry::new(),
        })
    }

    /// Use an externally owned token, e.g. a child of a component's lifetime token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Share region bookkeeping with other pollers
    pub fn with_registry(mut self, regions: InFlightRegistry) -> Self {
        self.regions = regions;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.regions
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop every chain driven by this poller and its clones
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Poll `task_id` until it completes and deserialize its result
    pub async fn poll<T: DeserializeOwned>(&self, task_id: &str) -> Result<T> {
        let mut trace = PollTrace::new(task_id);
        let value = self.run_chain(task_id, |_| {}, &mut trace).await?;
        decode_result(task_id, value)
    }

    /// Like [`poll`](Self::poll), but also returns the record of every status check.
    ///
    /// The trace is returned on failure too, with the error as the result.
    pub async fn poll_traced<T: DeserializeOwned>(&self, task_id: &str) -> (Result<T>, PollTrace) {
        let mut trace = PollTrace::new(task_id);
        let result = self
            .run_chain(task_id, |_| {}, &mut trace)
            .await
            .and_then(|value| decode_result(task_id, value));
        (result, trace)
    }

    /// Poll `task_id`, handing every observed latest entry to `on_progress`
    pub async fn poll_with_progress<T, F>(&self, task_id: &str, on_progress: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut(&ProgressEntry) + Send,
    {
        let mut trace = PollTrace::new(task_id);
        let value = self.run_chain(task_id, on_progress, &mut trace).await?;
        decode_result(task_id, value)
    }

    /// Submit a job and poll the returned task to completion
    pub async fn submit_and_poll<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let task_id = self.backend.submit(path, body).await?;
        self.poll(&task_id).await
    }

    /// Submit and poll while holding `region`; fails with `Busy` if the
    /// region already has a job in flight
    pub async fn run_exclusive<T: DeserializeOwned>(
        &self,
        region: &str,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let _guard = self.regions.try_acquire(region)?;
        self.submit_and_poll(path, body).await
    }

    async fn run_chain<F>(
        &self,
        task_id: &str,
        mut on_progress: F,
        trace: &mut PollTrace,
    ) -> Result<Value>
    where
        F: FnMut(&ProgressEntry) + Send,
    {
        let deadline = self.config.timeout().map(|timeout| Instant::now() + timeout);
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled(task_id, trace));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    trace.finish(PollOutcome::TimedOut);
                    return Err(FormflowError::Timeout(format!(
                        "task {task_id} did not finish within {}ms",
                        self.config.timeout_ms.unwrap_or_default()
                    )));
                }
            }

            attempt += 1;
            debug!("Polling task {task_id}, attempt {attempt}");
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(cancelled(task_id, trace)),
                fetched = self.backend.fetch_progress(task_id) => fetched,
            };
            let progress = match fetched {
                Ok(progress) => progress,
                Err(e) => {
                    warn!("Status fetch for task {task_id} failed: {e}");
                    trace.finish(PollOutcome::Aborted);
                    return Err(e);
                }
            };

            let latest = progress.latest();
            trace.add_step(PollStep::observed(attempt, latest));

            if let Some(entry) = latest {
                on_progress(entry);
                match entry.status {
                    TaskStatus::Completed => {
                        info!("Task {task_id} completed after {attempt} check(s)");
                        trace.finish(PollOutcome::Completed);
                        return Ok(entry.result.clone().unwrap_or(Value::Null));
                    }
                    TaskStatus::Failed => {
                        let message = entry_message(entry, "Task failed");
                        warn!("Task {task_id} failed: {message}");
                        trace.finish(PollOutcome::Failed);
                        return Err(FormflowError::TaskFailed {
                            task_id: task_id.to_string(),
                            message,
                        });
                    }
                    TaskStatus::Error => {
                        let message = entry_message(entry, "Task errored");
                        warn!("Task {task_id} errored: {message}");
                        trace.finish(PollOutcome::Errored);
                        return Err(FormflowError::TaskErrored {
                            task_id: task_id.to_string(),
                            message,
                        });
                    }
                    TaskStatus::Running | TaskStatus::Other => {}
                }
            }

            if let Some(max_attempts) = self.config.max_attempts {
                if attempt >= max_attempts {
                    trace.finish(PollOutcome::TimedOut);
                    return Err(FormflowError::Timeout(format!(
                        "task {task_id} still running after {attempt} check(s)"
                    )));
                }
            }

            let mut wait = self.config.interval();
            if let Some(deadline) = deadline {
                wait = wait.min(deadline.saturating_duration_since(Instant::now()));
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(cancelled(task_id, trace)),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

fn cancelled(task_id: &str, trace: &mut PollTrace) -> FormflowError {
    debug!("Polling of task {task_id} cancelled");
    trace.finish(PollOutcome::Cancelled);
    FormflowError::Cancelled(format!("polling of task {task_id} was cancelled"))
}

fn entry_message(entry: &ProgressEntry, fallback: &str) -> String {
    entry
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn decode_result<T: DeserializeOwned>(task_id: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        FormflowError::Deserialization(format!("Unexpected result for task {task_id}: {e}"))
    })
}
