//! Scripted replay: drive the submitter against a [`ScriptedWriteClient`].
//!
//! A tiny stand-in for the buffering scheduler. Pending entries are cut into
//! batches of at most `max_batch_size` records (and `max_batch_size_in_bytes`
//! estimated bytes, when set), up to `max_in_flight_requests` batches are
//! submitted per round, and retried entries rejoin the queue for the next
//! round. The run ends when nothing is pending, a fatal error arrives, or the
//! attempt budget is spent.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tsw_common::{record_size_in_bytes, Record};
use tsw_config::{FailurePolicyConfig, SinkConfig};

use crate::completion::AttemptListener;
use crate::converter::RecordBatchConverter;
use crate::error::SinkError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::policy::FailurePolicy;
use crate::submitter::BatchSubmitter;
use crate::wire::{ScriptedOutcome, ScriptedWriteClient};

pub const DEFAULT_MAX_ATTEMPTS: usize = 32;

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

/// A replay input: records to write and the wire client's scripted answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub database: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_attributes: Option<Record>,
    pub records: Vec<Record>,
    /// Consumed one per write call; calls beyond the script succeed.
    #[serde(default)]
    pub outcomes: Vec<ScriptedOutcome>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Overrides the configured failure policy for this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicyConfig>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        if scenario.max_attempts == 0 {
            return Err(ReplayError::InvalidScenario(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(scenario)
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<ReplayError> for tsw_common::Error {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Sink(e) => tsw_common::Error::Submission(e.to_string()),
            other => tsw_common::Error::InvalidInput(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub attempts: usize,
    pub written: u64,
    pub dropped: usize,
    /// Entries still waiting for a retry when the run stopped.
    pub pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
    pub metrics: MetricsSnapshot,
}

impl ReplaySummary {
    pub fn is_settled(&self) -> bool {
        self.fatal.is_none() && self.pending == 0
    }
}

#[derive(Debug)]
enum AttemptEvent<T> {
    Dropped(Vec<T>),
    Complete(Vec<T>),
    Fatal(SinkError),
}

/// Forwards attempt callbacks onto a channel.
struct ChannelListener<T> {
    tx: mpsc::UnboundedSender<AttemptEvent<T>>,
}

impl<T: Send> AttemptListener<T> for ChannelListener<T> {
    fn on_dropped(&self, entries: Vec<T>) {
        let _ = self.tx.send(AttemptEvent::Dropped(entries));
    }

    fn on_attempt_complete(&self, retry: Vec<T>) {
        let _ = self.tx.send(AttemptEvent::Complete(retry));
    }

    fn on_fatal(&self, error: SinkError) {
        let _ = self.tx.send(AttemptEvent::Fatal(error));
    }
}

/// Replay `scenario` with the batching and policy settings from `config`.
pub async fn run_scenario(
    scenario: Scenario,
    config: &SinkConfig,
) -> Result<ReplaySummary, ReplayError> {
    let Scenario {
        database,
        table,
        common_attributes,
        records,
        outcomes,
        max_attempts,
        failure_policy,
    } = scenario;

    let mut converter = RecordBatchConverter::new(database, table);
    if let Some(common) = common_attributes {
        converter = converter.with_common_attributes(common);
    }
    let policy = FailurePolicy::new(failure_policy.unwrap_or(config.failure_policy));
    let client = Arc::new(ScriptedWriteClient::new(outcomes));
    let metrics = Arc::new(SinkMetrics::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<AttemptEvent<Record>>();

    let submitter = BatchSubmitter::<Record>::new(
        Arc::new(converter),
        client,
        policy,
        Arc::new(ChannelListener { tx }),
    )?
    .with_metrics(metrics.clone());

    let batch_size = config.max_batch_size.max(1);
    let max_in_flight = config.max_in_flight_requests.max(1);
    let mut pending: VecDeque<Record> = records.into();
    let mut attempts = 0usize;
    let mut dropped = 0usize;
    let mut fatal: Option<SinkError> = None;

    while !pending.is_empty() && attempts < max_attempts && fatal.is_none() {
        let mut in_flight = 0usize;
        while !pending.is_empty() && in_flight < max_in_flight && attempts < max_attempts {
            let batch = next_batch(&mut pending, batch_size, config.max_batch_size_in_bytes);
            let entries = batch.len();
            let attempt = submitter.submit(batch);
            debug!(%attempt, entries, "submitted batch");
            attempts += 1;
            in_flight += 1;
        }

        while in_flight > 0 {
            let Some(event) = rx.recv().await else {
                break;
            };
            match event {
                AttemptEvent::Dropped(entries) => dropped += entries.len(),
                AttemptEvent::Complete(retry) => {
                    in_flight -= 1;
                    pending.extend(retry);
                }
                AttemptEvent::Fatal(err) => {
                    in_flight -= 1;
                    if fatal.is_none() {
                        fatal = Some(err);
                    } else {
                        warn!(error = %err, "additional fatal error after pipeline abort");
                    }
                }
            }
        }
    }

    let summary = ReplaySummary {
        attempts,
        written: metrics.snapshot().records_success,
        dropped,
        pending: pending.len(),
        fatal: fatal.map(|err| err.to_string()),
        metrics: metrics.snapshot(),
    };
    info!(
        attempts = summary.attempts,
        written = summary.written,
        dropped = summary.dropped,
        pending = summary.pending,
        fatal = summary.fatal.is_some(),
        "replay finished"
    );
    Ok(summary)
}

/// Cut the next batch off the front of `pending`.
///
/// A record larger than the byte cap still goes out alone.
fn next_batch(
    pending: &mut VecDeque<Record>,
    max_records: usize,
    max_bytes: Option<u64>,
) -> Vec<Record> {
    let mut batch = Vec::new();
    let mut bytes = 0u64;
    while batch.len() < max_records {
        let Some(next) = pending.front() else {
            break;
        };
        let size = record_size_in_bytes(next);
        if let Some(cap) = max_bytes {
            if !batch.is_empty() && bytes + size > cap {
                break;
            }
        }
        bytes += size;
        if let Some(record) = pending.pop_front() {
            batch.push(record);
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsw_common::MeasureValueType;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::scalar("cpu", i.to_string(), MeasureValueType::Double))
            .collect()
    }

    #[test]
    fn scenario_defaults() {
        let scenario = Scenario::from_json(
            r#"{"database": "db", "table": "t", "records": []}"#,
        )
        .unwrap();
        assert_eq!(scenario.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(scenario.outcomes.is_empty());
        assert!(scenario.failure_policy.is_none());
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = Scenario::from_json(
            r#"{"database": "db", "table": "t", "records": [], "max_attempts": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidScenario(_)));
    }

    #[tokio::test]
    async fn splits_into_batches() {
        let config = SinkConfig {
            max_batch_size: 2,
            ..Default::default()
        };
        let scenario = Scenario {
            database: "db".into(),
            table: "t".into(),
            common_attributes: None,
            records: records(5),
            outcomes: vec![],
            max_attempts: 10,
            failure_policy: None,
        };
        let summary = run_scenario(scenario, &config).await.unwrap();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.written, 5);
        assert!(summary.is_settled());
    }

    #[test]
    fn byte_cap_cuts_batches_early() {
        let mut pending: VecDeque<Record> = records(5).into();
        let size = record_size_in_bytes(&pending[0]);
        let batch = next_batch(&mut pending, 100, Some(size * 2));
        assert_eq!(batch.len(), 2);
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn oversized_record_goes_out_alone() {
        let mut pending: VecDeque<Record> = records(2).into();
        let batch = next_batch(&mut pending, 100, Some(1));
        assert_eq!(batch.len(), 1);
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn byte_cap_applies_to_replay() {
        let first = records(1).remove(0);
        let config = SinkConfig {
            max_batch_size_in_bytes: Some(record_size_in_bytes(&first)),
            ..Default::default()
        };
        let scenario = Scenario {
            database: "db".into(),
            table: "t".into(),
            common_attributes: None,
            records: records(3),
            outcomes: vec![],
            max_attempts: 10,
            failure_policy: None,
        };
        let summary = run_scenario(scenario, &config).await.unwrap();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.written, 3);
    }
}
