//! Error values surfaced by the wire client.
//!
//! Client-side failures frequently arrive wrapped: a client error around a
//! transport failure around a socket failure. The wrappers keep the inner
//! error as `source` so the classifier can walk the chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tsw_common::RejectedRecord;

/// Fault categories reported by the write service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    InternalServer,
    Throttling,
    Validation,
    RejectedRecords,
    AccessDenied,
    Conflict,
    ResourceNotFound,
    ServiceQuotaExceeded,
    InvalidEndpoint,
    Other,
}

impl ServiceErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceErrorKind::InternalServer => "internal_server",
            ServiceErrorKind::Throttling => "throttling",
            ServiceErrorKind::Validation => "validation",
            ServiceErrorKind::RejectedRecords => "rejected_records",
            ServiceErrorKind::AccessDenied => "access_denied",
            ServiceErrorKind::Conflict => "conflict",
            ServiceErrorKind::ResourceNotFound => "resource_not_found",
            ServiceErrorKind::ServiceQuotaExceeded => "service_quota_exceeded",
            ServiceErrorKind::InvalidEndpoint => "invalid_endpoint",
            ServiceErrorKind::Other => "service",
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault returned by the service for a whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Populated for `RejectedRecords` only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_records: Vec<RejectedRecord>,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            error_code: None,
            status_code: None,
            request_id: None,
            message: message.into(),
            rejected_records: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(status) = self.status_code {
            write!(f, " (status {})", status)?;
        }
        if let Some(code) = &self.error_code {
            write!(f, " [{}]", code)?;
        }
        Ok(())
    }
}

/// Every error value the wire client can complete with.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WriteError {
    #[error("service error: {0}")]
    Service(ServiceError),

    /// Client-side wrapper. `retryable` is the client's own verdict.
    #[error("client error: {message}")]
    Client {
        #[serde(default)]
        message: String,
        #[serde(default)]
        retryable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Box<WriteError>>,
    },

    #[error("endpoint discovery failed: {message}")]
    EndpointDiscovery {
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Box<WriteError>>,
    },

    /// Wrapper added by the async completion machinery.
    #[error("async completion failed: {source}")]
    Completion { source: Box<WriteError> },

    #[error("I/O error: {message}")]
    Io {
        #[serde(default)]
        message: String,
    },

    #[error("HTTP transport error: {message}")]
    Http {
        #[serde(default)]
        message: String,
    },

    #[error("API call timed out: {message}")]
    ApiCallTimeout {
        #[serde(default)]
        message: String,
    },

    #[error("API call attempt timed out: {message}")]
    ApiCallAttemptTimeout {
        #[serde(default)]
        message: String,
    },

    #[error("operation interrupted: {message}")]
    Interrupted {
        #[serde(default)]
        message: String,
    },

    #[error("socket timed out: {message}")]
    SocketTimeout {
        #[serde(default)]
        message: String,
    },

    #[error("socket error: {message}")]
    Socket {
        #[serde(default)]
        message: String,
    },

    #[error("timed out: {message}")]
    Timeout {
        #[serde(default)]
        message: String,
    },

    #[error("retryable client failure: {message}")]
    Retryable {
        #[serde(default)]
        message: String,
    },

    #[error("{message}")]
    Other {
        #[serde(default)]
        message: String,
        #[serde(default)]
        retryable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Box<WriteError>>,
    },
}

impl WriteError {
    pub fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        WriteError::Service(ServiceError::new(kind, message))
    }

    /// A partial rejection carrying the rejected records.
    pub fn rejected(records: Vec<RejectedRecord>) -> Self {
        let mut err = ServiceError::new(
            ServiceErrorKind::RejectedRecords,
            format!("{} records rejected", records.len()),
        );
        err.status_code = Some(419);
        err.rejected_records = records;
        WriteError::Service(err)
    }

    pub fn client(message: impl Into<String>, source: Option<WriteError>) -> Self {
        WriteError::Client {
            message: message.into(),
            retryable: false,
            source: source.map(Box::new),
        }
    }

    pub fn endpoint_discovery(message: impl Into<String>, source: Option<WriteError>) -> Self {
        WriteError::EndpointDiscovery {
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    pub fn completion(source: WriteError) -> Self {
        WriteError::Completion {
            source: Box::new(source),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        WriteError::Other {
            message: message.into(),
            retryable: false,
            source: None,
        }
    }

    /// Short stable name, used as the per-exception metric label.
    pub fn name(&self) -> &'static str {
        match self {
            WriteError::Service(se) => se.kind.as_str(),
            WriteError::Client { .. } => "client",
            WriteError::EndpointDiscovery { .. } => "endpoint_discovery",
            WriteError::Completion { .. } => "completion",
            WriteError::Io { .. } => "io",
            WriteError::Http { .. } => "http",
            WriteError::ApiCallTimeout { .. } => "api_call_timeout",
            WriteError::ApiCallAttemptTimeout { .. } => "api_call_attempt_timeout",
            WriteError::Interrupted { .. } => "interrupted",
            WriteError::SocketTimeout { .. } => "socket_timeout",
            WriteError::Socket { .. } => "socket",
            WriteError::Timeout { .. } => "timeout",
            WriteError::Retryable { .. } => "retryable",
            WriteError::Other { .. } => "other",
        }
    }

    /// The directly wrapped error, if any.
    pub fn cause(&self) -> Option<&WriteError> {
        match self {
            WriteError::Client { source, .. }
            | WriteError::EndpointDiscovery { source, .. }
            | WriteError::Other { source, .. } => source.as_deref(),
            WriteError::Completion { source } => Some(source),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            WriteError::Service(se) => Some(se),
            _ => None,
        }
    }
}

impl From<ServiceError> for WriteError {
    fn from(err: ServiceError) -> Self {
        WriteError::Service(err)
    }
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            std::io::ErrorKind::TimedOut => WriteError::SocketTimeout { message },
            std::io::ErrorKind::Interrupted => WriteError::Interrupted { message },
            _ => WriteError::Io { message },
        }
    }
}
