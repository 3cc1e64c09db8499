//! Batched write submission and failure classification for a time-series sink.
//!
//! A batch of entries goes through one write attempt:
//! - [`converter`] builds the provider request
//! - [`submitter`] starts the asynchronous wire call
//! - [`classify`] sorts any failure into an [`ExceptionKind`]
//! - [`policy`] turns the kind into retry, drop or escalate
//! - [`rejection`] maps per-record rejections back to entries
//! - [`completion`] reports the outcome to the scheduler exactly once

pub mod classify;
pub mod completion;
pub mod converter;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod rejection;
pub mod replay;
pub mod submitter;
pub mod wire;

pub use classify::{classify, Classification, ExceptionKind, ServiceFault};
pub use completion::{AttemptListener, CompletionHandle, Disposition};
pub use converter::{BatchConverter, ConvertError, ConvertedBatch, FnBatchConverter, RecordBatchConverter};
pub use error::SinkError;
pub use metrics::{MetricsSink, MetricsSnapshot, NoopMetrics, SinkMetrics};
pub use policy::{Decision, DropScope, FailurePolicy};
pub use rejection::{map_rejected, RejectionMapError};
pub use submitter::BatchSubmitter;
pub use wire::{ServiceError, ServiceErrorKind, WriteClient, WriteError, WriteOutcome};
