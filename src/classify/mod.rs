//! Error Classification
//!
//! Decides whether a failure is critical (the calling workflow should halt)
//! or ordinary (a failed tool call an agent can reason about and retry with
//! different input).
//!
//! Classification is a pure function over the error: policy for what to do
//! with a `Critical` verdict lives in the caller, not here. Nothing in this
//! module retries anything.

use serde::{Deserialize, Serialize};

use crate::error::RailError;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unrecoverable: the calling workflow should halt
    Critical,
    /// Recoverable: surface as a normal failed-tool-call result
    Ordinary,
}

impl Severity {
    /// Get the severity name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Ordinary => "ordinary",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message patterns denoting unrecoverable conditions
///
/// Matched case-insensitively as substrings. The catalogue is fixed:
/// missing relation/column/database/role, permission and authentication
/// failures, unreachable server, host-based-auth and SSL mismatches, and
/// invalid identifiers.
const CRITICAL_PATTERNS: &[&str] = &[
    "does not exist",
    "permission denied",
    "password authentication failed",
    "authentication failed",
    "connection refused",
    "could not connect",
    "connection timed out",
    "timeout expired",
    "could not translate host name",
    "no pg_hba.conf entry",
    "server does not support ssl",
    "ssl required",
    "invalid identifier",
];

/// Classify a raw error message
///
/// Any catalogued substring match is `Critical`; everything else is
/// `Ordinary`.
#[must_use]
pub fn classify_message(message: &str) -> Severity {
    let message = message.to_lowercase();
    if CRITICAL_PATTERNS.iter().any(|p| message.contains(p)) {
        Severity::Critical
    } else {
        Severity::Ordinary
    }
}

/// Classify a pgrail error
///
/// Input-validation failures and connection failures are always `Critical`:
/// retrying the identical configuration cannot succeed. Query execution
/// failures are classified by their driver message.
#[must_use]
pub fn classify_error(error: &RailError) -> Severity {
    match error {
        RailError::QueryFailed(message) => classify_message(message),
        RailError::ConnectionFailed(_) => Severity::Critical,
        _ if error.is_validation() => Severity::Critical,
        _ => Severity::Ordinary,
    }
}
