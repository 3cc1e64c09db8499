//! End-to-end attempts through the submitter against a scripted wire client.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tsw_common::{MeasureValueType, Record, RejectedRecord, WriteRecordsRequest, WriteResponse};
use tsw_config::FailurePolicyConfig;
use tsw_core::completion::AttemptListener;
use tsw_core::converter::{BatchConverter, ConvertError, ConvertedBatch, FnBatchConverter};
use tsw_core::metrics::{SinkMetrics, UNKNOWN_EXCEPTION};
use tsw_core::wire::{ScriptedOutcome, ScriptedWriteClient, ServiceError, WriteClient, WriteFuture};
use tsw_core::{BatchSubmitter, FailurePolicy, ServiceErrorKind, SinkError, WriteError};

#[derive(Debug)]
enum Event {
    Dropped(Vec<u32>),
    Complete(Vec<u32>),
    Fatal(SinkError),
}

struct Recorder {
    tx: mpsc::UnboundedSender<Event>,
}

impl AttemptListener<u32> for Recorder {
    fn on_dropped(&self, entries: Vec<u32>) {
        let _ = self.tx.send(Event::Dropped(entries));
    }
    fn on_attempt_complete(&self, retry: Vec<u32>) {
        let _ = self.tx.send(Event::Complete(retry));
    }
    fn on_fatal(&self, error: SinkError) {
        let _ = self.tx.send(Event::Fatal(error));
    }
}

fn one_record_per_entry() -> Arc<dyn BatchConverter<u32>> {
    Arc::new(FnBatchConverter(
        |entries: &[u32]| -> Result<ConvertedBatch, ConvertError> {
            let mut request = WriteRecordsRequest::new("metrics", "cpu");
            request.records = entries
                .iter()
                .map(|v| Record::scalar("load", v.to_string(), MeasureValueType::Double))
                .collect();
            Ok(ConvertedBatch::one_to_one(request))
        },
    ))
}

struct Harness {
    submitter: BatchSubmitter<u32>,
    client: Arc<ScriptedWriteClient>,
    metrics: Arc<SinkMetrics>,
    rx: mpsc::UnboundedReceiver<Event>,
}

fn harness(outcomes: Vec<ScriptedOutcome>, policy: FailurePolicyConfig) -> Harness {
    harness_with(one_record_per_entry(), outcomes, policy)
}

fn harness_with(
    converter: Arc<dyn BatchConverter<u32>>,
    outcomes: Vec<ScriptedOutcome>,
    policy: FailurePolicyConfig,
) -> Harness {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = Arc::new(ScriptedWriteClient::new(outcomes).with_latency(Duration::from_millis(5)));
    let metrics = Arc::new(SinkMetrics::new());
    let submitter = BatchSubmitter::new(
        converter,
        client.clone(),
        FailurePolicy::new(policy),
        Arc::new(Recorder { tx }),
    )
    .unwrap()
    .with_metrics(metrics.clone());
    Harness {
        submitter,
        client,
        metrics,
        rx,
    }
}

fn fail(error: WriteError) -> ScriptedOutcome {
    ScriptedOutcome::Error { error }
}

/// Collect events until the attempt concludes, then check nothing follows.
async fn settle(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("attempt did not conclude")
            .expect("listener channel closed");
        let done = matches!(event, Event::Complete(_) | Event::Fatal(_));
        events.push(event);
        if done {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rx.try_recv().is_err(), "extra callback after conclusion");
    events
}

#[tokio::test]
async fn throttled_batch_is_retried_whole() {
    let mut h = harness(
        vec![fail(WriteError::service(ServiceErrorKind::Throttling, "rate exceeded"))],
        FailurePolicyConfig::default(),
    );
    h.submitter.submit(vec![10, 11, 12]);

    let events = settle(&mut h.rx).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::Complete(retry) if retry == &vec![10, 11, 12]));

    let snap = h.metrics.snapshot();
    assert_eq!(snap.writes_retried, 1);
    assert_eq!(snap.exception_count("throttling"), 1);
    assert_eq!(snap.records_dropped, 0);
}

#[tokio::test]
async fn partial_rejection_drops_only_rejected_entries() {
    let rejected = WriteError::rejected(vec![
        RejectedRecord::new(1, "timestamp outside retention window"),
        RejectedRecord::new(3, "duplicate with higher version"),
    ]);
    let policy = FailurePolicyConfig {
        fail_on_partial_rejection: false,
        ..Default::default()
    };
    let mut h = harness(vec![fail(rejected)], policy);
    h.submitter.submit(vec![10, 11, 12, 13, 14]);

    let events = settle(&mut h.rx).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Dropped(d) if d == &vec![11, 13]));
    assert!(matches!(&events[1], Event::Complete(retry) if retry.is_empty()));

    let snap = h.metrics.snapshot();
    assert_eq!(snap.records_dropped, 2);
    assert_eq!(snap.records_success, 3);
    assert_eq!(snap.writes_success, 1);
    assert_eq!(snap.exception_count("rejected_records"), 1);
}

#[tokio::test]
async fn partial_rejection_escalates_when_fail_fast() {
    let rejected = WriteError::rejected(vec![RejectedRecord::new(0, "too old")]);
    let mut h = harness(vec![fail(rejected.clone())], FailurePolicyConfig::default());
    h.submitter.submit(vec![10, 11]);

    let events = settle(&mut h.rx).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Fatal(err) => assert_eq!(err.write_error(), Some(&rejected)),
        other => panic!("expected fatal, got {other:?}"),
    }
}

#[tokio::test]
async fn default_fault_drops_entire_batch_when_lenient() {
    let policy = FailurePolicyConfig {
        fail_on_default_fault: false,
        ..Default::default()
    };
    let mut h = harness(
        vec![fail(WriteError::service(
            ServiceErrorKind::ResourceNotFound,
            "table cpu does not exist",
        ))],
        policy,
    );
    h.submitter.submit(vec![1, 2, 3, 4]);

    let events = settle(&mut h.rx).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Dropped(d) if d == &vec![1, 2, 3, 4]));
    assert!(matches!(&events[1], Event::Complete(retry) if retry.is_empty()));

    let snap = h.metrics.snapshot();
    assert_eq!(snap.records_dropped, 4);
    assert_eq!(snap.records_success, 0);
    assert_eq!(snap.writes_success, 0);
}

#[tokio::test]
async fn success_completes_with_empty_retry() {
    let mut h = harness(vec![ScriptedOutcome::Success], FailurePolicyConfig::default());
    h.submitter.submit(vec![7, 8]);

    let events = settle(&mut h.rx).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::Complete(retry) if retry.is_empty()));

    let snap = h.metrics.snapshot();
    assert_eq!(snap.writes_success, 1);
    assert_eq!(snap.records_success, 2);
    assert_eq!(snap.records_per_request, 2);
    assert_eq!(snap.total_exceptions(), 0);
    assert_eq!(h.client.requests().len(), 1);
}

#[tokio::test]
async fn validation_failure_escalates_by_default() {
    let mut h = harness(
        vec![fail(WriteError::service(ServiceErrorKind::Validation, "bad measure"))],
        FailurePolicyConfig::default(),
    );
    h.submitter.submit(vec![1]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[..], [Event::Fatal(SinkError::Write(_))]));
}

#[tokio::test]
async fn validation_failure_drops_batch_when_lenient() {
    let mut h = harness(
        vec![fail(WriteError::service(ServiceErrorKind::Validation, "bad measure"))],
        FailurePolicyConfig::lenient(),
    );
    h.submitter.submit(vec![1, 2]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[0], Event::Dropped(d) if d == &vec![1, 2]));
    assert!(matches!(&events[1], Event::Complete(retry) if retry.is_empty()));
}

#[tokio::test]
async fn completion_wrapped_transient_is_retried() {
    let wrapped = WriteError::completion(WriteError::client(
        "request failed",
        Some(WriteError::SocketTimeout {
            message: "read timed out".into(),
        }),
    ));
    let mut h = harness(vec![fail(wrapped)], FailurePolicyConfig::default());
    h.submitter.submit(vec![5, 6]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[..], [Event::Complete(retry)] if retry == &vec![5, 6]));
    assert_eq!(h.metrics.snapshot().exception_count("client"), 1);
}

#[tokio::test]
async fn retryable_status_overrides_fault_kind() {
    let err = WriteError::from(
        ServiceError::new(ServiceErrorKind::AccessDenied, "overloaded").with_status(503),
    );
    let mut h = harness(vec![fail(err)], FailurePolicyConfig::default());
    h.submitter.submit(vec![1]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[..], [Event::Complete(retry)] if retry == &vec![1]));
}

#[tokio::test]
async fn initiation_failure_retries_whole_batch() {
    let mut h = harness(
        vec![ScriptedOutcome::InitiationError {
            error: WriteError::other("client already closed"),
        }],
        FailurePolicyConfig::default(),
    );
    h.submitter.submit(vec![1, 2, 3]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[..], [Event::Complete(retry)] if retry == &vec![1, 2, 3]));
    let snap = h.metrics.snapshot();
    assert_eq!(snap.writes_retried, 1);
    assert_eq!(snap.exception_count(UNKNOWN_EXCEPTION), 1);
}

/// Wire client whose in-flight call panics.
struct PanickingClient;

impl WriteClient for PanickingClient {
    fn write_records(&self, _request: Arc<WriteRecordsRequest>) -> Result<WriteFuture, WriteError> {
        Ok(
            futures::future::lazy(|_| -> Result<WriteResponse, WriteError> {
                panic!("wire call blew up")
            })
            .boxed(),
        )
    }
}

#[tokio::test]
async fn panicking_write_call_retries_whole_batch() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let metrics = Arc::new(SinkMetrics::new());
    let submitter = BatchSubmitter::new(
        one_record_per_entry(),
        Arc::new(PanickingClient),
        FailurePolicy::default(),
        Arc::new(Recorder { tx }),
    )
    .unwrap()
    .with_metrics(metrics.clone());
    submitter.submit(vec![1, 2, 3]);

    let events = settle(&mut rx).await;
    assert!(matches!(&events[..], [Event::Complete(retry)] if retry == &vec![1, 2, 3]));
    let snap = metrics.snapshot();
    assert_eq!(snap.writes_retried, 1);
    assert_eq!(snap.exception_count(UNKNOWN_EXCEPTION), 1);
    assert_eq!(snap.records_dropped, 0);
}

#[test]
fn runtime_shutdown_hands_batch_back() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let submitter = {
        let _guard = runtime.enter();
        BatchSubmitter::new(
            one_record_per_entry(),
            Arc::new(ScriptedWriteClient::new(vec![ScriptedOutcome::Success])),
            FailurePolicy::default(),
            Arc::new(Recorder { tx }),
        )
        .unwrap()
    };
    submitter.submit(vec![4, 5]);
    // The completion task was never polled.
    drop(runtime);

    match rx.try_recv() {
        Ok(Event::Complete(retry)) => assert_eq!(retry, vec![4, 5]),
        other => panic!("expected retry of held batch, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn conversion_failure_retries_whole_batch() {
    let converter: Arc<dyn BatchConverter<u32>> = Arc::new(FnBatchConverter(
        |_: &[u32]| -> Result<ConvertedBatch, ConvertError> {
            Err(ConvertError::Failed("schema lookup failed".into()))
        },
    ));
    let mut h = harness_with(converter, vec![], FailurePolicyConfig::default());
    h.submitter.submit(vec![9]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(&events[..], [Event::Complete(retry)] if retry == &vec![9]));
    assert!(h.client.requests().is_empty());
}

#[tokio::test]
async fn rejection_index_out_of_range_is_fatal() {
    let rejected = WriteError::rejected(vec![RejectedRecord::new(9, "bogus")]);
    let mut h = harness(vec![fail(rejected)], FailurePolicyConfig::lenient());
    h.submitter.submit(vec![1, 2]);

    let events = settle(&mut h.rx).await;
    assert!(matches!(
        &events[..],
        [Event::Fatal(SinkError::RejectionMapping(_))]
    ));
}

#[tokio::test]
async fn concurrent_attempts_each_conclude_once() {
    let outcomes = vec![
        fail(WriteError::service(ServiceErrorKind::Throttling, "slow down")),
        ScriptedOutcome::Success,
        ScriptedOutcome::Success,
    ];
    let mut h = harness(outcomes, FailurePolicyConfig::default());
    h.submitter.submit(vec![1]);
    h.submitter.submit(vec![2]);
    h.submitter.submit(vec![3]);

    let mut completions = Vec::new();
    while completions.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(5), h.rx.recv()).await {
            Ok(Some(Event::Complete(retry))) => completions.push(retry),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    completions.sort();
    assert_eq!(completions, vec![vec![], vec![], vec![1]]);
    assert_eq!(h.metrics.snapshot().writes_success, 2);
}
