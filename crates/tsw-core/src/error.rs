//! Errors delivered on the fatal channel.

use thiserror::Error;

use crate::rejection::RejectionMapError;
use crate::wire::WriteError;

#[derive(Debug, Error)]
pub enum SinkError {
    /// A write failure escalated by the failure policy. The wire error is
    /// passed through unmodified, cause chain included.
    #[error("write failed: {0}")]
    Write(#[source] WriteError),

    /// The rejection report did not match the request that was sent.
    #[error("rejection report inconsistent with request: {0}")]
    RejectionMapping(#[from] RejectionMapError),

    #[error("no tokio runtime available to drive write attempts")]
    NoRuntime,
}

impl From<WriteError> for SinkError {
    fn from(err: WriteError) -> Self {
        SinkError::Write(err)
    }
}

impl SinkError {
    pub fn write_error(&self) -> Option<&WriteError> {
        match self {
            SinkError::Write(err) => Some(err),
            _ => None,
        }
    }
}
