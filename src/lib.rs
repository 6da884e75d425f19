//! pgrail - Role-Scoped PostgreSQL Query Execution for AI Agents
//!
//! pgrail is a safety layer for executing parameterized SQL against a
//! PostgreSQL-compatible database on behalf of an AI agent or workflow
//! step. Queries may run under a restricted database role and are never
//! vulnerable to identifier or value injection.
//!
//! # Core Principles
//! - Validation before I/O (identifiers, roles, limits checked first)
//! - Role scoping via `SET LOCAL ROLE` inside a single transaction
//! - Closed distance-operator set (no operator injection surface)
//! - Failures classified as critical (halt the workflow) or ordinary
//! - No automatic retries (retry policy belongs to the host)
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`output`] - JSON output envelope types
//! - [`sanitize`] - Identifier and role name validation
//! - [`query`] - Retrieval query building and custom SQL preparation
//! - [`executor`] - Role-scoped transactional execution
//! - [`classify`] - Critical vs ordinary error classification
//! - [`recorder`] - Tool invocation observability
//! - [`config`] - Typed connection configuration
//!
//! # Public API
//! This library exports the execution surface used by both the CLI and
//! embedding hosts: [`execute_role_scoped`], [`build_retrieval_query`],
//! [`prepare_custom_query`], [`quote_identifier`], [`validate_role`],
//! [`classify_error`], and the recorder types.

pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod query;
pub mod recorder;
pub mod sanitize;

// Re-export commonly used types for convenience
pub use classify::{classify_error, classify_message, Severity};
pub use config::{connect, ConnectionConfig};
pub use error::{RailError, Result};
pub use executor::{execute_role_scoped, run_query, ExecutionContext, QueryResult, SqlSession};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use query::custom::{prepare_custom_query, DEFAULT_PLACEHOLDER};
pub use query::{
    build_retrieval_query, ColumnMapping, DistanceMetric, PgVector, QuerySpec, SqlParam,
    MAX_RETRIEVAL_LIMIT,
};
pub use recorder::{
    record_invocation, InvocationRecord, InvocationRecorder, MemoryRecorder, NoopRecorder,
    TracingRecorder,
};
pub use sanitize::{quote_identifier, validate_role};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        // Verify that key types are accessible
        let _columns = ColumnMapping::default();
        let _metric = DistanceMetric::Cosine;
        let _recorder = NoopRecorder::default();

        assert_eq!(MAX_RETRIEVAL_LIMIT, 1000);
        assert_eq!(DEFAULT_PLACEHOLDER, "$1");
    }
}
