//! Sink configuration types.

use serde::{Deserialize, Serialize};

/// Per-category fail-fast switches consulted when a write fails.
///
/// Each `fail_on_*` flag turns the matching failure category into a fatal
/// pipeline abort. With a flag cleared, the affected entries are dropped
/// and processing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FailurePolicyConfig {
    /// Access denied, conflict, not found, quota exceeded, bad endpoint, and
    /// anything unrecognised.
    pub fail_on_default_fault: bool,
    /// The whole request was rejected as malformed.
    pub fail_on_validation_failure: bool,
    /// Some records in the request were rejected (e.g. timestamp outside the
    /// retention window).
    pub fail_on_partial_rejection: bool,
    /// Log request payloads when a write fails.
    ///
    /// This prints record data, which may be sensitive.
    pub log_full_request_on_failure: bool,
}

impl Default for FailurePolicyConfig {
    fn default() -> Self {
        Self {
            fail_on_default_fault: true,
            fail_on_validation_failure: true,
            fail_on_partial_rejection: true,
            log_full_request_on_failure: false,
        }
    }
}

impl FailurePolicyConfig {
    /// Drop-and-continue on every non-retryable category.
    ///
    /// Mainly meant for test environments.
    pub fn lenient() -> Self {
        Self {
            fail_on_default_fault: false,
            fail_on_validation_failure: false,
            fail_on_partial_rejection: false,
            log_full_request_on_failure: false,
        }
    }
}

/// Settings handed to the wire client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteClientConfig {
    pub region: String,
    pub max_concurrency: u32,
    pub request_timeout_ms: u64,
    pub max_error_retry: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_override: Option<String>,
}

impl Default for WriteClientConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            max_concurrency: 5000,
            request_timeout_ms: 20_000,
            max_error_retry: 10,
            endpoint_override: None,
        }
    }
}

/// Top-level sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    /// Records per write request. The service caps this at 100.
    pub max_batch_size: usize,
    /// Estimated bytes per write request; unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size_in_bytes: Option<u64>,
    pub max_in_flight_requests: usize,
    pub max_buffered_requests: usize,
    pub max_time_in_buffer_ms: u64,
    pub emit_metrics: bool,
    pub write_client: WriteClientConfig,
    pub failure_policy: FailurePolicyConfig,
}

impl SinkConfig {
    /// Provider limit on records per write request.
    pub const MAX_RECORDS_PER_REQUEST: usize = 100;
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_batch_size_in_bytes: None,
            max_in_flight_requests: 100,
            max_buffered_requests: 10 * 100,
            max_time_in_buffer_ms: 15 * 1000,
            emit_metrics: false,
            write_client: WriteClientConfig::default(),
            failure_policy: FailurePolicyConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_defaults_fail_closed() {
        let policy = FailurePolicyConfig::default();
        assert!(policy.fail_on_default_fault);
        assert!(policy.fail_on_validation_failure);
        assert!(policy.fail_on_partial_rejection);
        assert!(!policy.log_full_request_on_failure);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SinkConfig = serde_json::from_str(
            r#"{"max_batch_size": 25, "failure_policy": {"fail_on_partial_rejection": false}}"#,
        )
        .unwrap();
        assert_eq!(cfg.max_batch_size, 25);
        assert_eq!(cfg.max_in_flight_requests, 100);
        assert!(!cfg.failure_policy.fail_on_partial_rejection);
        assert!(cfg.failure_policy.fail_on_default_fault);
        assert_eq!(cfg.write_client.max_error_retry, 10);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = serde_json::from_str::<SinkConfig>(r#"{"max_batch_sz": 25}"#);
        assert!(err.is_err());
    }
}
