//! A spawned task raced against a deadline.
//!
//! Used for the best-effort notification step: the caller waits at most
//! `deadline`, and what happens to the task afterwards is an explicit
//! [`TimeoutDisposition`] rather than whatever a dropped future does.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

/// What to do with the task once the deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutDisposition {
    /// Let it keep running in the background; its result is discarded.
    #[default]
    Detached,
    /// Abort it.
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    Completed(T),
    TimedOut(TimeoutDisposition),
    /// The task panicked or was cancelled before finishing.
    Aborted(String),
}

impl<T> DeadlineOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, DeadlineOutcome::Completed(_))
    }
}

#[derive(Debug)]
pub struct DeadlineTask<T> {
    label: &'static str,
    deadline: Duration,
    on_timeout: TimeoutDisposition,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> DeadlineTask<T> {
    /// Spawn `fut` on the current runtime. The deadline is measured from
    /// the call to [`wait`](Self::wait).
    pub fn spawn<F>(label: &'static str, deadline: Duration, fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            label,
            deadline,
            on_timeout: TimeoutDisposition::Detached,
            handle: tokio::spawn(fut),
        }
    }

    pub fn on_timeout(mut self, disposition: TimeoutDisposition) -> Self {
        self.on_timeout = disposition;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Wait for the task, at most until the deadline.
    pub async fn wait(mut self) -> DeadlineOutcome<T> {
        match tokio::time::timeout(self.deadline, &mut self.handle).await {
            Ok(Ok(value)) => DeadlineOutcome::Completed(value),
            Ok(Err(join_err)) => {
                warn!(task = self.label, error = %join_err, "deadline task aborted");
                DeadlineOutcome::Aborted(join_err.to_string())
            }
            Err(_) => {
                warn!(
                    task = self.label,
                    deadline_ms = self.deadline.as_millis() as u64,
                    disposition = ?self.on_timeout,
                    "deadline task timed out"
                );
                if self.on_timeout == TimeoutDisposition::Canceled {
                    self.handle.abort();
                }
                DeadlineOutcome::TimedOut(self.on_timeout)
            }
        }
    }
}
