//! Failure policy: what to do with a batch once its failure is classified.
//!
//! | kind                      | flag set       | flag clear              |
//! |---------------------------|----------------|-------------------------|
//! | RetryableTransient        | retry all      | retry all               |
//! | ValidationFailure         | escalate       | drop entire batch       |
//! | PartialRejectionFailure   | escalate       | drop rejected entries   |
//! | KnownServiceFault/Unknown | escalate       | drop entire batch       |
//!
//! Non-partial faults carry no per-entry attribution, so nothing smaller
//! than the whole batch can be dropped; retrying them would never converge.

use serde::Serialize;
use tsw_config::FailurePolicyConfig;

use crate::classify::ExceptionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropScope {
    EntireBatch,
    RejectedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "scope", rename_all = "snake_case")]
pub enum Decision {
    RetryAll,
    DropAndContinue(DropScope),
    EscalateFatal,
}

/// Decide the fate of a failed attempt.
pub fn decide(kind: ExceptionKind, config: &FailurePolicyConfig) -> Decision {
    match kind {
        ExceptionKind::RetryableTransient => Decision::RetryAll,
        ExceptionKind::ValidationFailure => {
            drop_unless(config.fail_on_validation_failure, DropScope::EntireBatch)
        }
        ExceptionKind::PartialRejectionFailure => {
            drop_unless(config.fail_on_partial_rejection, DropScope::RejectedOnly)
        }
        ExceptionKind::KnownServiceFault(_) | ExceptionKind::Unknown => {
            drop_unless(config.fail_on_default_fault, DropScope::EntireBatch)
        }
    }
}

fn drop_unless(fail_fast: bool, scope: DropScope) -> Decision {
    if fail_fast {
        Decision::EscalateFatal
    } else {
        Decision::DropAndContinue(scope)
    }
}

/// An immutable policy, holding the flags consulted by [`decide`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    config: FailurePolicyConfig,
}

impl FailurePolicy {
    pub fn new(config: FailurePolicyConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, kind: ExceptionKind) -> Decision {
        decide(kind, &self.config)
    }

    pub fn config(&self) -> &FailurePolicyConfig {
        &self.config
    }

    pub fn log_full_request(&self) -> bool {
        self.config.log_full_request_on_failure
    }

    /// The config flag (name, value) that governs `kind`, if any.
    pub fn governing_flag(&self, kind: ExceptionKind) -> Option<(&'static str, bool)> {
        match kind {
            ExceptionKind::RetryableTransient => None,
            ExceptionKind::ValidationFailure => Some((
                "fail_on_validation_failure",
                self.config.fail_on_validation_failure,
            )),
            ExceptionKind::PartialRejectionFailure => Some((
                "fail_on_partial_rejection",
                self.config.fail_on_partial_rejection,
            )),
            ExceptionKind::KnownServiceFault(_) | ExceptionKind::Unknown => {
                Some(("fail_on_default_fault", self.config.fail_on_default_fault))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ServiceFault;

    const ALL_KINDS: [ExceptionKind; 5] = [
        ExceptionKind::RetryableTransient,
        ExceptionKind::ValidationFailure,
        ExceptionKind::PartialRejectionFailure,
        ExceptionKind::KnownServiceFault(ServiceFault::ResourceNotFound),
        ExceptionKind::Unknown,
    ];

    #[test]
    fn retryable_always_retries() {
        for config in [FailurePolicyConfig::default(), FailurePolicyConfig::lenient()] {
            assert_eq!(
                decide(ExceptionKind::RetryableTransient, &config),
                Decision::RetryAll
            );
        }
    }

    #[test]
    fn defaults_escalate_everything_else() {
        let config = FailurePolicyConfig::default();
        for kind in &ALL_KINDS[1..] {
            assert_eq!(decide(*kind, &config), Decision::EscalateFatal, "{kind}");
        }
    }

    #[test]
    fn lenient_drops_with_scope() {
        let config = FailurePolicyConfig::lenient();
        assert_eq!(
            decide(ExceptionKind::ValidationFailure, &config),
            Decision::DropAndContinue(DropScope::EntireBatch)
        );
        assert_eq!(
            decide(ExceptionKind::PartialRejectionFailure, &config),
            Decision::DropAndContinue(DropScope::RejectedOnly)
        );
        assert_eq!(
            decide(ExceptionKind::Unknown, &config),
            Decision::DropAndContinue(DropScope::EntireBatch)
        );
    }

    #[test]
    fn flags_are_independent() {
        let config = FailurePolicyConfig {
            fail_on_partial_rejection: false,
            ..Default::default()
        };
        assert_eq!(
            decide(ExceptionKind::PartialRejectionFailure, &config),
            Decision::DropAndContinue(DropScope::RejectedOnly)
        );
        assert_eq!(
            decide(ExceptionKind::ValidationFailure, &config),
            Decision::EscalateFatal
        );
        assert_eq!(
            decide(
                ExceptionKind::KnownServiceFault(ServiceFault::AccessDenied),
                &config
            ),
            Decision::EscalateFatal
        );
    }

    #[test]
    fn governing_flag_names() {
        let policy = FailurePolicy::new(FailurePolicyConfig::lenient());
        assert_eq!(policy.governing_flag(ExceptionKind::RetryableTransient), None);
        assert_eq!(
            policy.governing_flag(ExceptionKind::Unknown),
            Some(("fail_on_default_fault", false))
        );
    }
}
