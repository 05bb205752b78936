// crates/dataspace-edr-core/src/polling.rs
// ============================================================================
// Module: Polling Jobs
// Description: Fixed-delay polling of an action into a TTL-bounded future.
// Purpose: Turn remote state checks into awaitable results with timeouts.
// Dependencies: futures, tokio, tracing
// ============================================================================

//! ## Overview
//! A [`PollingJob`] repeatedly runs an async action until it yields a value,
//! fails, or its time-to-live elapses. Scheduling a job on a
//! [`PollingScheduler`] returns a [`PollingTask`] future for the outcome.
//! Invariants:
//! - The first run happens immediately, later runs after `poll_interval`.
//! - The first `Ok(Some(_))` or `Err(_)` resolves the task and stops the
//!   schedule; no action runs after that.
//! - The TTL is checked before every run; a resolved task never times out.
//! - Dropping the [`PollingTask`] stops the schedule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::error::EdcClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Poll interval used when a job does not set one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of a single action run: a value, keep polling, or a failure.
pub type PollOutcome<T> = Result<Option<T>, EdcClientError>;

/// Boxed polling action.
type PollAction<T> = Box<dyn FnMut() -> BoxFuture<'static, PollOutcome<T>> + Send>;

// ============================================================================
// SECTION: Polling Job
// ============================================================================

/// Recurring action with a time-to-live.
///
/// # Invariants
/// - `poll_interval` is non-zero.
pub struct PollingJob<T> {
    /// Action run on every tick.
    action: PollAction<T>,
    /// Maximum lifetime of the job.
    time_to_live: Option<Duration>,
    /// Delay between the end of one run and the start of the next.
    poll_interval: Duration,
    /// Human-readable description of the awaited event.
    description: String,
}

impl<T: Send + 'static> PollingJob<T> {
    /// Starts building a polling job.
    #[must_use]
    pub fn builder() -> PollingJobBuilder<T> {
        PollingJobBuilder {
            action: None,
            time_to_live: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            description: String::from("polling"),
        }
    }

    /// Schedules the job and returns its task.
    #[must_use]
    pub fn schedule(self, scheduler: &PollingScheduler) -> PollingTask<T> {
        scheduler.spawn(self)
    }

    /// Drives the job until it resolves or the receiver is dropped.
    async fn run(mut self, mut sender: oneshot::Sender<Result<T, EdcClientError>>) {
        let started = Instant::now();
        loop {
            if let Some(ttl) = self.time_to_live
                && started.elapsed() >= ttl
            {
                warn!(description = %self.description, ttl_ms = ttl_millis(ttl), "polling job timed out");
                let _ = sender.send(Err(EdcClientError::Timeout {
                    description: self.description.clone(),
                    ttl_ms: ttl_millis(ttl),
                }));
                return;
            }

            let outcome = tokio::select! {
                () = sender.closed() => return,
                outcome = (self.action)() => outcome,
            };
            match outcome {
                Ok(Some(value)) => {
                    debug!(description = %self.description, "polling job resolved");
                    let _ = sender.send(Ok(value));
                    return;
                }
                Err(err) => {
                    debug!(description = %self.description, error = %err, "polling job failed");
                    let _ = sender.send(Err(err));
                    return;
                }
                Ok(None) => {}
            }

            tokio::select! {
                () = sender.closed() => return,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Builder for [`PollingJob`].
pub struct PollingJobBuilder<T> {
    /// Action run on every tick.
    action: Option<PollAction<T>>,
    /// Maximum lifetime of the job.
    time_to_live: Option<Duration>,
    /// Delay between runs.
    poll_interval: Duration,
    /// Description of the awaited event.
    description: String,
}

impl<T: Send + 'static> PollingJobBuilder<T> {
    /// Sets the action run on every tick.
    #[must_use]
    pub fn action<F, Fut>(mut self, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = PollOutcome<T>> + Send + 'static,
    {
        self.action = Some(Box::new(move || action().boxed()));
        self
    }

    /// Sets the time-to-live.
    #[must_use]
    pub const fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the description used in logs and timeout errors.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builds the job.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::IllegalState`] when no action was set or the
    /// poll interval is zero.
    pub fn build(self) -> Result<PollingJob<T>, EdcClientError> {
        let action = self.action.ok_or_else(|| {
            EdcClientError::IllegalState(format!("polling job '{}' has no action", self.description))
        })?;
        if self.poll_interval.is_zero() {
            return Err(EdcClientError::IllegalState(format!(
                "polling job '{}' has a zero poll interval",
                self.description
            )));
        }
        Ok(PollingJob {
            action,
            time_to_live: self.time_to_live,
            poll_interval: self.poll_interval,
            description: self.description,
        })
    }
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Shared scheduler driving polling jobs on a tokio runtime.
///
/// # Invariants
/// - Each job is one lightweight task; no thread is dedicated to a job.
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    /// Runtime the jobs are spawned on.
    handle: Handle,
}

impl PollingScheduler {
    /// Creates a scheduler on the given runtime.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
        }
    }

    /// Creates a scheduler on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::IllegalState`] outside a tokio runtime.
    pub fn current() -> Result<Self, EdcClientError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| EdcClientError::IllegalState(format!("no tokio runtime: {err}")))
    }

    /// Returns the runtime handle jobs are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a job and returns its task.
    #[must_use]
    pub fn spawn<T: Send + 'static>(&self, job: PollingJob<T>) -> PollingTask<T> {
        let (sender, receiver) = oneshot::channel();
        let description = job.description.clone();
        debug!(
            description = %description,
            interval_ms = ttl_millis(job.poll_interval),
            "scheduling polling job"
        );
        let handle = self.handle.spawn(job.run(sender));
        PollingTask {
            receiver,
            handle,
            description,
        }
    }
}

// ============================================================================
// SECTION: Polling Task
// ============================================================================

/// Future resolving with the outcome of a scheduled [`PollingJob`].
///
/// # Invariants
/// - Dropping the task aborts the job.
pub struct PollingTask<T> {
    /// Outcome channel.
    receiver: oneshot::Receiver<Result<T, EdcClientError>>,
    /// Handle of the spawned job.
    handle: JoinHandle<()>,
    /// Description of the awaited event.
    description: String,
}

impl<T> PollingTask<T> {
    /// Stops the job; the task then resolves as interrupted.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl<T> Future for PollingTask<T> {
    type Output = Result<T, EdcClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                Poll::Ready(Err(EdcClientError::Interrupted(self.description.clone())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for PollingTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a duration to whole milliseconds, saturating.
fn ttl_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
