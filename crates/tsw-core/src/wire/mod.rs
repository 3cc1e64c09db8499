//! Wire client seam.
//!
//! The client performs the network call; this crate only needs a way to start
//! a write and a future that completes exactly once with its result.

pub mod error;
pub mod scripted;

use std::sync::Arc;

use futures::future::BoxFuture;
use tsw_common::{RejectedRecord, WriteRecordsRequest, WriteResponse};

use crate::classify::innermost;
pub use error::{ServiceError, ServiceErrorKind, WriteError};
pub use scripted::{ScriptedOutcome, ScriptedWriteClient};

/// Pending completion of one write call.
pub type WriteFuture = BoxFuture<'static, Result<WriteResponse, WriteError>>;

/// Asynchronous write client.
///
/// `write_records` must not block on I/O. The outer `Err` reports a failure
/// to even start the call; the returned future reports how the call ended.
pub trait WriteClient: Send + Sync + 'static {
    fn write_records(&self, request: Arc<WriteRecordsRequest>) -> Result<WriteFuture, WriteError>;
}

impl<C: WriteClient + ?Sized> WriteClient for Arc<C> {
    fn write_records(&self, request: Arc<WriteRecordsRequest>) -> Result<WriteFuture, WriteError> {
        (**self).write_records(request)
    }
}

/// How one write call ended.
#[derive(Debug)]
pub enum WriteOutcome {
    Success(WriteResponse),
    /// Some records were rejected by index; the rest were written.
    PartialRejection(WriteError),
    Error(WriteError),
}

impl WriteOutcome {
    /// Interpret a completed call, removing one layer of async-completion wrapping.
    pub fn from_result(result: Result<WriteResponse, WriteError>) -> Self {
        match result {
            Ok(response) => WriteOutcome::Success(response),
            Err(err) => {
                let err = match err {
                    WriteError::Completion { source } => *source,
                    other => other,
                };
                if rejected_records(&err).is_some() {
                    WriteOutcome::PartialRejection(err)
                } else {
                    WriteOutcome::Error(err)
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Success(_))
    }
}

/// Rejected records reported by a partial rejection, looking through wrappers.
pub fn rejected_records(err: &WriteError) -> Option<&[RejectedRecord]> {
    match innermost(err) {
        WriteError::Service(se) if se.kind == ServiceErrorKind::RejectedRecords => {
            Some(&se.rejected_records)
        }
        _ => None,
    }
}
