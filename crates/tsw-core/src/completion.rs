//! Completion routing.
//!
//! Every submission attempt ends with exactly one notification to the
//! scheduler: `on_attempt_complete` (possibly with an empty retry set) or,
//! for an escalation, `on_fatal`. The scheduler uses that single call to
//! free the in-flight slot. [`CompletionHandle`] is consumed by value, so a
//! second completion does not type-check.

use std::sync::Arc;

use tracing::{debug, error};
use tsw_common::AttemptId;

use crate::error::SinkError;

/// Final decision for one submission attempt.
#[derive(Debug)]
pub enum Disposition<T> {
    /// `retry` re-enters the scheduler's buffer; `dropped` is terminal.
    Settled { retry: Vec<T>, dropped: Vec<T> },
    /// Stop the pipeline. Neither set is reported.
    Fatal(SinkError),
}

impl<T> Disposition<T> {
    pub fn success() -> Self {
        Disposition::Settled {
            retry: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub fn retry_all(batch: Vec<T>) -> Self {
        Disposition::Settled {
            retry: batch,
            dropped: Vec::new(),
        }
    }

    pub fn drop_entries(dropped: Vec<T>) -> Self {
        Disposition::Settled {
            retry: Vec::new(),
            dropped,
        }
    }

    pub fn fatal(err: impl Into<SinkError>) -> Self {
        Disposition::Fatal(err.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Disposition::Fatal(_))
    }
}

/// Scheduler-side callbacks for attempt outcomes.
pub trait AttemptListener<T>: Send + Sync {
    /// Entries permanently dropped. Invoked at most once per attempt, before
    /// `on_attempt_complete`, and only with a non-empty set.
    fn on_dropped(&self, entries: Vec<T>);

    /// The attempt has concluded; `retry` re-enters the buffer.
    fn on_attempt_complete(&self, retry: Vec<T>);

    /// Escalation: the pipeline should stop accepting submissions.
    fn on_fatal(&self, error: SinkError);
}

/// One-shot completion token for a single attempt.
///
/// While the wire call is in flight the handle holds the batch. Dropping the
/// handle without completing it (a panicking task, or a runtime shutting down
/// before the task ran) hands the held batch back for retry.
pub struct CompletionHandle<T> {
    attempt: AttemptId,
    listener: Option<Arc<dyn AttemptListener<T>>>,
    held: Vec<T>,
}

impl<T> CompletionHandle<T> {
    pub fn new(attempt: AttemptId, listener: Arc<dyn AttemptListener<T>>) -> Self {
        Self {
            attempt,
            listener: Some(listener),
            held: Vec::new(),
        }
    }

    pub fn attempt(&self) -> &AttemptId {
        &self.attempt
    }

    /// Keep `batch` as the retry set if the handle is abandoned.
    pub fn hold(&mut self, batch: Vec<T>) {
        self.held = batch;
    }

    /// Take back the held batch once the attempt has an outcome.
    pub fn release(&mut self) -> Vec<T> {
        std::mem::take(&mut self.held)
    }

    /// Report the disposition. Drop callback first, then completion.
    pub fn complete(mut self, disposition: Disposition<T>) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        match disposition {
            Disposition::Settled { retry, dropped } => {
                debug!(
                    attempt = %self.attempt,
                    retry = retry.len(),
                    dropped = dropped.len(),
                    "attempt settled"
                );
                if !dropped.is_empty() {
                    listener.on_dropped(dropped);
                }
                listener.on_attempt_complete(retry);
            }
            Disposition::Fatal(err) => {
                error!(attempt = %self.attempt, error = %err, "attempt escalated to fatal");
                listener.on_fatal(err);
            }
        }
    }
}

impl<T> Drop for CompletionHandle<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            let retry = std::mem::take(&mut self.held);
            error!(
                attempt = %self.attempt,
                retry = retry.len(),
                "attempt dropped without a disposition; retrying held entries"
            );
            listener.on_attempt_complete(retry);
        }
    }
}

impl<T> std::fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("attempt", &self.attempt)
            .field("completed", &self.listener.is_none())
            .field("held", &self.held.len())
            .finish()
    }
}
