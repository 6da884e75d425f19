//! Invocation Recording
//!
//! Captures the input and output of each tool invocation for host
//! observability, independent of whether the underlying call succeeds.
//!
//! # Exactly One Terminal Event
//! [`InvocationRecorder::begin`] hands out an [`InvocationHandle`] that the
//! terminal methods consume by value, so each invocation ends in exactly
//! one of `complete`/`fail` — the type system rules out zero or two.
//!
//! Recorders are explicit dependencies passed into the execution path, not
//! global state. [`NoopRecorder`] is the default; [`TracingRecorder`] emits
//! structured events on the `tracing` subscriber (stderr in the CLI);
//! [`MemoryRecorder`] captures records for tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::{classify_error, Severity};
use crate::error::{RailError, Result};

/// In-flight invocation token
///
/// Created by [`InvocationRecorder::begin`] and consumed by exactly one of
/// [`InvocationRecorder::complete`] / [`InvocationRecorder::fail`].
#[derive(Debug)]
pub struct InvocationHandle {
    id: u64,
    started_at: DateTime<Utc>,
    input: Value,
}

impl InvocationHandle {
    /// Invocation id (unique per recorder)
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Error description captured in an invocation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedError {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Classification verdict
    pub severity: Severity,
}

/// Terminal outcome of one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationOutcome {
    /// Operation produced output
    Output(Value),
    /// Operation failed
    Error(RecordedError),
}

/// A finalized invocation record: input, outcome, timestamps
#[derive(Debug, Clone, Serialize)]
pub struct InvocationRecord {
    /// Invocation id
    pub id: u64,
    /// Caller payload
    pub input: Value,
    /// Terminal outcome (exactly one per invocation)
    pub outcome: InvocationOutcome,
    /// When the invocation began
    pub started_at: DateTime<Utc>,
    /// When the terminal event was recorded
    pub finished_at: DateTime<Utc>,
}

/// Observer of tool invocations
pub trait InvocationRecorder: Send + Sync {
    /// Record the start of an invocation
    fn begin(&self, input: &Value) -> InvocationHandle;

    /// Record successful completion
    fn complete(&self, handle: InvocationHandle, output: &Value);

    /// Record failure
    fn fail(&self, handle: InvocationHandle, error: &RailError);
}

/// Shared id counter so handles are distinguishable in logs
fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

fn new_handle(counter: &AtomicU64, input: &Value) -> InvocationHandle {
    InvocationHandle { id: next_id(counter), started_at: Utc::now(), input: input.clone() }
}

fn finalize(handle: InvocationHandle, outcome: InvocationOutcome) -> InvocationRecord {
    InvocationRecord {
        id: handle.id,
        input: handle.input,
        outcome,
        started_at: handle.started_at,
        finished_at: Utc::now(),
    }
}

fn recorded_error(error: &RailError) -> RecordedError {
    RecordedError {
        code: error.error_code().to_string(),
        message: error.message(),
        severity: classify_error(error),
    }
}

/// Recorder that drops everything (the default)
#[derive(Debug, Default)]
pub struct NoopRecorder {
    counter: AtomicU64,
}

impl InvocationRecorder for NoopRecorder {
    fn begin(&self, input: &Value) -> InvocationHandle {
        new_handle(&self.counter, input)
    }

    fn complete(&self, _handle: InvocationHandle, _output: &Value) {}

    fn fail(&self, _handle: InvocationHandle, _error: &RailError) {}
}

/// Recorder that emits structured `tracing` events
///
/// Events go to the active subscriber; the CLI routes them to stderr so
/// stdout stays JSON-only.
#[derive(Debug, Default)]
pub struct TracingRecorder {
    counter: AtomicU64,
}

impl InvocationRecorder for TracingRecorder {
    fn begin(&self, input: &Value) -> InvocationHandle {
        let handle = new_handle(&self.counter, input);
        debug!(invocation = handle.id, input = %handle.input, "tool invocation started");
        handle
    }

    fn complete(&self, handle: InvocationHandle, output: &Value) {
        info!(invocation = handle.id, output = %output, "tool invocation completed");
    }

    fn fail(&self, handle: InvocationHandle, error: &RailError) {
        let recorded = recorded_error(error);
        warn!(
            invocation = handle.id,
            code = recorded.code,
            severity = %recorded.severity,
            message = recorded.message,
            "tool invocation failed"
        );
    }
}

/// Recorder that keeps finalized records in memory
///
/// Used by tests to assert the exactly-one-terminal-event invariant.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    counter: AtomicU64,
    records: Mutex<Vec<InvocationRecord>>,
}

impl MemoryRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all finalized records
    #[must_use]
    pub fn records(&self) -> Vec<InvocationRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl InvocationRecorder for MemoryRecorder {
    fn begin(&self, input: &Value) -> InvocationHandle {
        new_handle(&self.counter, input)
    }

    fn complete(&self, handle: InvocationHandle, output: &Value) {
        let record = finalize(handle, InvocationOutcome::Output(output.clone()));
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    fn fail(&self, handle: InvocationHandle, error: &RailError) {
        let record = finalize(handle, InvocationOutcome::Error(recorded_error(error)));
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Run an operation with begin/terminal recording around it
///
/// Guarantees exactly one terminal event even when the operation fails
/// mid-flight; the operation's result passes through unchanged.
pub async fn record_invocation<R, F, Fut, T>(recorder: &R, input: Value, operation: F) -> Result<T>
where
    R: InvocationRecorder + ?Sized,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    T: Serialize,
{
    let handle = recorder.begin(&input);

    match operation().await {
        Ok(output) => {
            let payload = serde_json::to_value(&output).unwrap_or(Value::Null);
            recorder.complete(handle, &payload);
            Ok(output)
        }
        Err(err) => {
            recorder.fail(handle, &err);
            Err(err)
        }
    }
}
