//! Scripted in-memory client for replay runs and tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tsw_common::{RecordsIngested, WriteRecordsRequest, WriteResponse};

use super::{WriteClient, WriteError, WriteFuture};

/// One scripted reaction to a write call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptedOutcome {
    Success,
    /// The call starts, then completes with this error.
    Error { error: WriteError },
    /// The call fails before any future is handed out.
    InitiationError { error: WriteError },
}

/// Client that answers each call with the next scripted outcome.
///
/// Once the script runs out every call succeeds.
#[derive(Debug, Default)]
pub struct ScriptedWriteClient {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    requests: Mutex<Vec<Arc<WriteRecordsRequest>>>,
    latency: Option<Duration>,
}

impl ScriptedWriteClient {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Delay every completion, so calls finish after `write_records` returns.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, outcome: ScriptedOutcome) {
        self.script.lock().push_back(outcome);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<Arc<WriteRecordsRequest>> {
        self.requests.lock().clone()
    }
}

impl WriteClient for ScriptedWriteClient {
    fn write_records(&self, request: Arc<WriteRecordsRequest>) -> Result<WriteFuture, WriteError> {
        let records = request.records.len() as u64;
        self.requests.lock().push(request);

        let next = self.script.lock().pop_front();
        let result = match next {
            None | Some(ScriptedOutcome::Success) => Ok(WriteResponse {
                records_ingested: Some(RecordsIngested {
                    total: records,
                    memory_store: records,
                    magnetic_store: 0,
                }),
            }),
            Some(ScriptedOutcome::Error { error }) => Err(error),
            Some(ScriptedOutcome::InitiationError { error }) => return Err(error),
        };

        let latency = self.latency;
        Ok(async move {
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed())
    }
}
