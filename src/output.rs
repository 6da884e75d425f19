//! JSON Output Envelope Types
//!
//! Structured JSON output for the host/agent surface. Every operation
//! returns either a `SuccessEnvelope` or an `ErrorEnvelope`.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...",
//!   "error": {"code": "...", "message": "...", "severity": "..."}}`
//!
//! The `severity` field carries the classifier's verdict so the host can
//! decide between halting the workflow (`critical`) and surfacing a normal
//! failed-tool-call result (`ordinary`) without re-parsing the message.

use serde::{Deserialize, Serialize};

use crate::classify::{classify_error, Severity};
use crate::error::RailError;

/// Success envelope for operation results
///
/// Generic over the data type to support different operation return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed (retrieve, exec)
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Command that was attempted (retrieve, exec)
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create error envelope from a `RailError`, classifying it
    pub fn from_error(command: impl Into<String>, err: &RailError) -> Self {
        Self {
            ok: false,
            command: command.into(),
            error: ErrorInfo {
                code: err.error_code().to_string(),
                message: err.message(),
                severity: classify_error(err),
            },
        }
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "INVALID_IDENTIFIER", "QUERY_FAILED")
    pub code: String,

    /// Human-readable error message (agent-appropriate, no sensitive data)
    pub message: String,

    /// Whether the calling workflow should halt (`critical`) or may retry
    /// with different input (`ordinary`)
    pub severity: Severity,
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (None for statements without a result set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    /// Create new metadata with just execution time
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None }
    }

    /// Create new metadata with execution time and row count
    #[must_use]
    pub const fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned) }
    }
}
