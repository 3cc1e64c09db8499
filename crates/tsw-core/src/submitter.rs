//! Batch submitter: one write attempt per call to [`BatchSubmitter::submit`].
//!
//! `submit` converts the batch, starts the wire call and returns. The
//! completion is awaited on a runtime task, which classifies any failure,
//! applies the failure policy and reports a single [`Disposition`] through a
//! [`CompletionHandle`].
//!
//! The handle holds the batch while the call is in flight, so an attempt whose
//! task never finishes still hands its entries back for retry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use tsw_common::{AttemptId, RejectedRecord, RequestShape, WriteRecordsRequest};

use crate::classify::{classify, innermost};
use crate::completion::{AttemptListener, CompletionHandle, Disposition};
use crate::converter::{BatchConverter, ConvertedBatch};
use crate::error::SinkError;
use crate::metrics::{MetricsSink, NoopMetrics, UNKNOWN_EXCEPTION};
use crate::policy::{Decision, DropScope, FailurePolicy};
use crate::rejection::{rejected_entry_indices, split_rejected};
use crate::wire::{rejected_records, WriteClient, WriteError, WriteOutcome};

/// Submits batches of `T` and routes each attempt's outcome to a listener.
///
/// Concurrent calls to `submit` share nothing but the metrics sink.
pub struct BatchSubmitter<T> {
    converter: Arc<dyn BatchConverter<T>>,
    client: Arc<dyn WriteClient>,
    policy: FailurePolicy,
    metrics: Arc<dyn MetricsSink>,
    listener: Arc<dyn AttemptListener<T>>,
    runtime: Handle,
}

impl<T> Clone for BatchSubmitter<T> {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
            client: Arc::clone(&self.client),
            policy: self.policy,
            metrics: Arc::clone(&self.metrics),
            listener: Arc::clone(&self.listener),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: Send + 'static> BatchSubmitter<T> {
    /// Build a submitter on the current tokio runtime.
    pub fn new(
        converter: Arc<dyn BatchConverter<T>>,
        client: Arc<dyn WriteClient>,
        policy: FailurePolicy,
        listener: Arc<dyn AttemptListener<T>>,
    ) -> Result<Self, SinkError> {
        let runtime = Handle::try_current().map_err(|_| SinkError::NoRuntime)?;
        Ok(Self {
            converter,
            client,
            policy,
            metrics: Arc::new(NoopMetrics),
            listener,
            runtime,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Drive completions on `runtime` instead of the one captured by `new`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Start one write attempt for `batch`.
    ///
    /// Returns once the wire call has been initiated. The listener hears
    /// about the attempt exactly once, later, from a runtime task.
    pub fn submit(&self, batch: Vec<T>) -> AttemptId {
        let attempt = AttemptId::new();
        let mut handle = CompletionHandle::new(attempt.clone(), Arc::clone(&self.listener));
        let span = info_span!("write_attempt", attempt = %attempt, entries = batch.len());
        let entered = span.enter();

        let converted = match self.converter.convert(&batch) {
            Ok(converted) => converted,
            Err(err) => {
                self.retry_unexpected(handle, batch, "conversion", &err);
                return attempt;
            }
        };

        self.metrics.pre_write(RequestShape::of(&converted.request));
        trace!(request = ?converted.request, "submitting write request");

        let ConvertedBatch { request, origins } = converted;
        let request = Arc::new(request);
        let pending = match self.client.write_records(Arc::clone(&request)) {
            Ok(pending) => pending,
            Err(err) => {
                self.metrics.exception(err.name());
                self.retry_unexpected(handle, batch, "initiation", &err);
                return attempt;
            }
        };

        let completion = Completion {
            request,
            origins,
            policy: self.policy,
            metrics: Arc::clone(&self.metrics),
        };
        handle.hold(batch);
        drop(entered);
        self.runtime.spawn(
            async move {
                let result = AssertUnwindSafe(pending).catch_unwind().await;
                let batch = handle.release();
                let disposition = match result {
                    Ok(result) => completion.route(WriteOutcome::from_result(result), batch),
                    Err(payload) => completion.retry_after_panic(panic_message(&*payload), batch),
                };
                handle.complete(disposition);
            }
            .instrument(span),
        );
        attempt
    }

    /// Compatibility fallback for failures before the wire call is in flight:
    /// the whole batch goes back for another attempt.
    fn retry_unexpected(
        &self,
        handle: CompletionHandle<T>,
        batch: Vec<T>,
        stage: &'static str,
        err: &dyn std::error::Error,
    ) {
        error!(
            stage,
            error = %err,
            entries = batch.len(),
            "unexpected failure before the write was in flight; retrying entire batch"
        );
        self.metrics.retried(batch.len());
        handle.complete(Disposition::retry_all(batch));
    }
}

/// Everything the completion task needs besides the batch.
struct Completion {
    request: Arc<WriteRecordsRequest>,
    origins: Vec<usize>,
    policy: FailurePolicy,
    metrics: Arc<dyn MetricsSink>,
}

impl Completion {
    fn route<T>(&self, outcome: WriteOutcome, batch: Vec<T>) -> Disposition<T> {
        match outcome {
            WriteOutcome::Success(response) => {
                let written = self.request.records.len();
                debug!(
                    records = written,
                    ingested = ?response.records_ingested,
                    "write succeeded"
                );
                self.metrics.write_succeeded(written);
                Disposition::success()
            }
            WriteOutcome::PartialRejection(err) | WriteOutcome::Error(err) => {
                self.route_failure(err, batch)
            }
        }
    }

    /// The wire future panicked: same fallback as a failure before the call
    /// was in flight.
    fn retry_after_panic<T>(&self, message: &str, batch: Vec<T>) -> Disposition<T> {
        error!(
            panic = message,
            entries = batch.len(),
            "write call panicked; retrying entire batch"
        );
        self.metrics.exception(UNKNOWN_EXCEPTION);
        self.metrics.retried(batch.len());
        Disposition::retry_all(batch)
    }

    fn route_failure<T>(&self, err: WriteError, batch: Vec<T>) -> Disposition<T> {
        let classification = classify(&err);
        self.metrics.exception(err.name());
        for record in rejected_records(&err).unwrap_or(&[]) {
            warn!(
                record_index = record.record_index,
                reason = %record.reason,
                existing_version = ?record.existing_version,
                "record rejected"
            );
        }

        let decision = self.policy.decide(classification.kind);
        if let Some((flag, value)) = self.policy.governing_flag(classification.kind) {
            info!(
                kind = %classification.kind,
                flag,
                value,
                ?decision,
                "applying failure policy"
            );
        }

        match decision {
            Decision::RetryAll => {
                self.log_retryable(&err);
                self.metrics.retried(batch.len());
                Disposition::retry_all(batch)
            }
            Decision::EscalateFatal => {
                self.log_request_if_enabled();
                Disposition::fatal(err)
            }
            Decision::DropAndContinue(DropScope::EntireBatch) => {
                self.log_request_if_enabled();
                warn!(
                    kind = %classification.kind,
                    error = %err,
                    entries = batch.len(),
                    "dropping entire batch"
                );
                self.metrics.dropped(batch.len(), self.request.records.len());
                Disposition::drop_entries(batch)
            }
            Decision::DropAndContinue(DropScope::RejectedOnly) => {
                self.drop_rejected(&err, batch)
            }
        }
    }

    fn drop_rejected<T>(&self, err: &WriteError, batch: Vec<T>) -> Disposition<T> {
        let rejected: &[RejectedRecord] = rejected_records(err).unwrap_or(&[]);
        self.log_request_if_enabled();

        let indices = match rejected_entry_indices(&self.origins, batch.len(), rejected) {
            Ok(indices) => indices,
            Err(map_err) => {
                error!(error = %map_err, "cannot attribute rejected records to entries");
                return Disposition::fatal(map_err);
            }
        };
        let (dropped, _accepted) = split_rejected(batch, &indices);
        self.metrics
            .dropped(dropped.len(), self.request.records.len());
        Disposition::drop_entries(dropped)
    }

    fn log_retryable(&self, err: &WriteError) {
        match innermost(err).as_service() {
            Some(service) => error!(
                error = %err,
                status_code = ?service.status_code,
                request_id = ?service.request_id,
                "retryable service error; resubmitting batch"
            ),
            None => error!(error = %err, "retryable error; resubmitting batch"),
        }
    }

    fn log_request_if_enabled(&self) {
        if self.policy.log_full_request() {
            info!(request = ?self.request, "failed write request");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
