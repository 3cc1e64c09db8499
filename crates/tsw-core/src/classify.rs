//! Exception classification.
//!
//! Maps any [`WriteError`] to a retry verdict and an [`ExceptionKind`]. The
//! function is total and pure: no logging, no state, no panics.
//!
//! Client and endpoint-discovery wrappers are looked through (bounded by
//! [`MAX_UNWRAP_DEPTH`]); the kind is taken from the innermost error while
//! retryable signals are honoured at every level of the chain.

use serde::Serialize;
use std::fmt;

use crate::wire::{ServiceErrorKind, WriteError};

/// Maximum number of wrapper layers followed before giving up.
///
/// Boxed chains cannot cycle, so the bound only changes the result for very
/// deep nesting: an error buried past it classifies as `Unknown` and is not
/// retried, which escalates under the default policy.
pub const MAX_UNWRAP_DEPTH: usize = 32;

/// Service error codes that indicate a transient failure.
pub const RETRYABLE_ERROR_CODES: &[&str] = &[
    "InternalFailure",
    "ServiceUnavailable",
    "RequestTimeout",
    "RequestTimeoutException",
    "PriorRequestNotComplete",
];

/// Service error codes that indicate throttling.
pub const THROTTLING_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "SlowDown",
];

/// HTTP statuses that are always retried.
pub const RETRYABLE_STATUS_CODES: &[u16] = &[500, 502, 503, 509];

/// Non-retryable service faults handled by the default failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFault {
    AccessDenied,
    Conflict,
    ResourceNotFound,
    ServiceQuotaExceeded,
    InvalidEndpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "fault", rename_all = "snake_case")]
pub enum ExceptionKind {
    RetryableTransient,
    /// The aggregate request was rejected as malformed.
    ValidationFailure,
    /// Individual records were rejected by index.
    PartialRejectionFailure,
    KnownServiceFault(ServiceFault),
    Unknown,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::RetryableTransient => write!(f, "retryable_transient"),
            ExceptionKind::ValidationFailure => write!(f, "validation_failure"),
            ExceptionKind::PartialRejectionFailure => write!(f, "partial_rejection_failure"),
            ExceptionKind::KnownServiceFault(fault) => write!(f, "known_service_fault:{fault:?}"),
            ExceptionKind::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub retryable: bool,
    pub kind: ExceptionKind,
}

/// Classify a failed write.
///
/// Partial rejections are never retryable: the per-record verdicts are final
/// and resubmitting the same records would be rejected again.
pub fn classify(error: &WriteError) -> Classification {
    let inner = innermost(error);
    let base = kind_of(inner);

    if base == ExceptionKind::PartialRejectionFailure {
        return Classification {
            retryable: false,
            kind: base,
        };
    }

    if is_retryable(error) {
        Classification {
            retryable: true,
            kind: ExceptionKind::RetryableTransient,
        }
    } else {
        Classification {
            retryable: false,
            kind: base,
        }
    }
}

/// Follow recognised wrappers to the innermost error.
pub fn innermost(error: &WriteError) -> &WriteError {
    let mut current = error;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match unwrap_once(current) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

fn unwrap_once(error: &WriteError) -> Option<&WriteError> {
    match error {
        WriteError::Client {
            source: Some(source),
            ..
        }
        | WriteError::EndpointDiscovery {
            source: Some(source),
            ..
        } => Some(source),
        WriteError::Completion { source } => Some(source),
        _ => None,
    }
}

fn kind_of(error: &WriteError) -> ExceptionKind {
    let Some(se) = error.as_service() else {
        return ExceptionKind::Unknown;
    };
    match se.kind {
        ServiceErrorKind::InternalServer | ServiceErrorKind::Throttling => {
            ExceptionKind::RetryableTransient
        }
        ServiceErrorKind::Validation => ExceptionKind::ValidationFailure,
        ServiceErrorKind::RejectedRecords => ExceptionKind::PartialRejectionFailure,
        ServiceErrorKind::AccessDenied => ExceptionKind::KnownServiceFault(ServiceFault::AccessDenied),
        ServiceErrorKind::Conflict => ExceptionKind::KnownServiceFault(ServiceFault::Conflict),
        ServiceErrorKind::ResourceNotFound => {
            ExceptionKind::KnownServiceFault(ServiceFault::ResourceNotFound)
        }
        ServiceErrorKind::ServiceQuotaExceeded => {
            ExceptionKind::KnownServiceFault(ServiceFault::ServiceQuotaExceeded)
        }
        ServiceErrorKind::InvalidEndpoint => {
            ExceptionKind::KnownServiceFault(ServiceFault::InvalidEndpoint)
        }
        ServiceErrorKind::Other => ExceptionKind::Unknown,
    }
}

/// Whether any level of the wrapper chain carries a retryable signal.
fn is_retryable(error: &WriteError) -> bool {
    let mut current = Some(error);
    for _ in 0..=MAX_UNWRAP_DEPTH {
        let Some(err) = current else {
            return false;
        };
        if has_retryable_signal(err) {
            return true;
        }
        current = unwrap_once(err);
    }
    false
}

fn has_retryable_signal(error: &WriteError) -> bool {
    match error {
        WriteError::Service(se) => {
            matches!(
                se.kind,
                ServiceErrorKind::InternalServer | ServiceErrorKind::Throttling
            ) || se.error_code.as_deref().is_some_and(|code| {
                RETRYABLE_ERROR_CODES.contains(&code) || THROTTLING_ERROR_CODES.contains(&code)
            }) || se
                .status_code
                .is_some_and(|status| RETRYABLE_STATUS_CODES.contains(&status))
        }
        WriteError::Io { .. }
        | WriteError::Http { .. }
        | WriteError::ApiCallTimeout { .. }
        | WriteError::ApiCallAttemptTimeout { .. }
        | WriteError::Interrupted { .. }
        | WriteError::SocketTimeout { .. }
        | WriteError::Socket { .. }
        | WriteError::Timeout { .. }
        | WriteError::Retryable { .. } => true,
        WriteError::Client {
            retryable, source, ..
        }
        | WriteError::Other {
            retryable, source, ..
        } => *retryable || caused_by_timeout(source.as_deref()),
        WriteError::EndpointDiscovery { source, .. } => caused_by_timeout(source.as_deref()),
        WriteError::Completion { .. } => false,
    }
}

fn caused_by_timeout(source: Option<&WriteError>) -> bool {
    matches!(source, Some(WriteError::Timeout { .. }))
}
