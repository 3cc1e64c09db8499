//! Semantic validation for sink configuration.
//!
//! Deserialization already enforces types and rejects unknown keys; this
//! checks the relationships between values. All problems are collected so a
//! single run reports everything that needs fixing.

use serde::Serialize;
use thiserror::Error;

use crate::sink::SinkConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("{field} must be non-zero")]
    Zero { field: &'static str },

    #[error("max_buffered_requests ({buffered}) must be >= max_batch_size ({batch})")]
    BufferSmallerThanBatch { buffered: usize, batch: usize },

    #[error("endpoint_override must start with http:// or https://, got {0:?}")]
    InvalidEndpoint(String),

    #[error("write_client.region must not be empty")]
    EmptyRegion,
}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

pub fn validate_config(config: &SinkConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.max_batch_size == 0 || config.max_batch_size > SinkConfig::MAX_RECORDS_PER_REQUEST {
        errors.push(ValidationError::OutOfRange {
            field: "max_batch_size",
            min: 1,
            max: SinkConfig::MAX_RECORDS_PER_REQUEST as u64,
            value: config.max_batch_size as u64,
        });
    }
    if config.max_batch_size_in_bytes == Some(0) {
        errors.push(ValidationError::Zero {
            field: "max_batch_size_in_bytes",
        });
    }
    if config.max_in_flight_requests == 0 {
        errors.push(ValidationError::Zero {
            field: "max_in_flight_requests",
        });
    }
    if config.max_buffered_requests < config.max_batch_size {
        errors.push(ValidationError::BufferSmallerThanBatch {
            buffered: config.max_buffered_requests,
            batch: config.max_batch_size,
        });
    }

    let client = &config.write_client;
    if client.region.trim().is_empty() {
        errors.push(ValidationError::EmptyRegion);
    }
    if client.max_concurrency == 0 {
        errors.push(ValidationError::Zero {
            field: "write_client.max_concurrency",
        });
    }
    if client.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "write_client.request_timeout_ms",
        });
    }
    if let Some(endpoint) = &client.endpoint_override {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(ValidationError::InvalidEndpoint(endpoint.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&SinkConfig::default()).is_ok());
    }

    #[test]
    fn batch_size_over_provider_cap() {
        let cfg = SinkConfig {
            max_batch_size: 101,
            ..Default::default()
        };
        let errors = validate_config(&cfg).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::OutOfRange { field: "max_batch_size", .. })));
    }

    #[test]
    fn collects_every_problem() {
        let mut cfg = SinkConfig {
            max_batch_size: 50,
            max_in_flight_requests: 0,
            max_buffered_requests: 10,
            ..Default::default()
        };
        cfg.write_client.region = " ".into();
        cfg.write_client.endpoint_override = Some("ingest.local:443".into());
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.contains(&ValidationError::EmptyRegion));
        assert!(errors.contains(&ValidationError::BufferSmallerThanBatch {
            buffered: 10,
            batch: 50
        }));
    }

    #[test]
    fn zero_byte_cap_rejected() {
        let cfg = SinkConfig {
            max_batch_size_in_bytes: Some(0),
            ..Default::default()
        };
        assert_eq!(
            validate_config(&cfg).unwrap_err(),
            vec![ValidationError::Zero {
                field: "max_batch_size_in_bytes"
            }]
        );
    }

    #[test]
    fn https_endpoint_accepted() {
        let mut cfg = SinkConfig::default();
        cfg.write_client.endpoint_override = Some("https://ingest-cell1.timestream.us-east-1.amazonaws.com".into());
        assert!(validate_config(&cfg).is_ok());
    }
}
