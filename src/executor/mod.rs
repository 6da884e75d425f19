//! Role-Scoped Query Execution
//!
//! This module wraps an arbitrary database operation in an optional
//! transaction that temporarily narrows the session to a named role.
//!
//! # Role Scoping
//! `SET LOCAL ROLE` confines the role to the current transaction, so it
//! cannot outlive the call even if the connection is later reused. The
//! sequence is strictly `BEGIN` / `SET LOCAL ROLE "<role>"` / operation /
//! `COMMIT`, with exactly one of COMMIT or ROLLBACK issued per invocation.
//! When no role is requested the operation runs directly on the session
//! with no transaction wrapper at all.
//!
//! # Failure Semantics
//! - Structural errors (invalid role) are raised before any statement.
//! - Any failure after `BEGIN` triggers one ROLLBACK attempt. A failed
//!   rollback never masks the original error; it is logged, and the
//!   session must then be discarded rather than returned to a pool, since
//!   its state is no longer trustworthy.
//! - Nothing is retried here. Retry policy belongs to the host.

pub mod rows;

use serde::Serialize;
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::{debug, warn};

use crate::error::{RailError, Result};
use crate::query::{QuerySpec, SqlParam};
use crate::sanitize::validate_role;

/// Minimal session surface the role-scoped executor needs
///
/// Implemented for `tokio_postgres::Client`; faked in tests to observe the
/// exact statements issued.
pub trait SqlSession {
    /// Execute one or more statements, discarding any result rows
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl SqlSession for Client {
    async fn batch_execute(&self, sql: &str) -> Result<()> {
        Client::batch_execute(self, sql).await.map_err(|e| RailError::query_failed(e.to_string()))
    }
}

/// One invocation's execution context: a session plus an optional role
///
/// Owned for the duration of one query and never shared across
/// invocations. The same session object must be used for the entire
/// transaction.
pub struct ExecutionContext<'a, S: SqlSession> {
    session: &'a S,
    role: Option<String>,
}

impl<'a, S: SqlSession> ExecutionContext<'a, S> {
    /// Create an execution context
    ///
    /// `None` or an empty/whitespace role means unrestricted execution.
    pub fn new(session: &'a S, role: Option<String>) -> Self {
        Self { session, role }
    }

    /// Run `operation`, under a role-scoped transaction when a role is set
    ///
    /// Without a role the operation is invoked directly, with no
    /// transaction statements issued at all. With a role the operation
    /// runs between `BEGIN`/`SET LOCAL ROLE` and `COMMIT`; on failure a
    /// single ROLLBACK is attempted and the original error propagates.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&'a S) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let role = match self.role.as_deref() {
            Some(role) if !role.trim().is_empty() => validate_role(role)?,
            _ => return operation(self.session).await,
        };

        self.session.batch_execute("BEGIN").await?;
        debug!(role, "transaction opened with role scope");

        let set_role = format!("SET LOCAL ROLE \"{role}\"");
        let outcome = match self.session.batch_execute(&set_role).await {
            Ok(()) => operation(self.session).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                // COMMIT either commits or aborts server-side; it is the
                // one terminal statement for the success path
                self.session.batch_execute("COMMIT").await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.session.batch_execute("ROLLBACK").await {
                    // Session state is untrustworthy now; it must be
                    // discarded, not returned to a pool
                    warn!(
                        error = %rollback_err,
                        "rollback failed after query error; discard this connection"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Execute an operation under an optional role scope
///
/// Convenience wrapper over [`ExecutionContext::run`].
pub async fn execute_role_scoped<'a, S, F, Fut, T>(
    session: &'a S,
    role: Option<&str>,
    operation: F,
) -> Result<T>
where
    S: SqlSession,
    F: FnOnce(&'a S) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    ExecutionContext::new(session, role.map(str::to_string)).run(operation).await
}

/// Query execution result
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Result rows, each a column-name -> value mapping in column order
    pub rows: Vec<serde_json::Map<String, Value>>,

    /// Number of rows affected (for non-SELECT statements)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

/// Execute a prepared [`QuerySpec`] and collect its rows
///
/// Statements that return no columns (INSERT, UPDATE, DDL in custom mode)
/// yield an empty row set with `rows_affected` populated instead.
pub async fn run_query(client: &Client, spec: &QuerySpec) -> Result<QueryResult> {
    let stmt = client
        .prepare(&spec.sql)
        .await
        .map_err(|e| RailError::query_failed(e.to_string()))?;

    let params: Vec<&(dyn ToSql + Sync)> = spec.params.iter().map(SqlParam::as_sql).collect();

    if stmt.columns().is_empty() {
        let rows_affected = client
            .execute(&stmt, &params)
            .await
            .map_err(|e| RailError::query_failed(e.to_string()))?;

        return Ok(QueryResult { rows: Vec::new(), rows_affected: Some(rows_affected) });
    }

    let pg_rows = client
        .query(&stmt, &params)
        .await
        .map_err(|e| RailError::query_failed(e.to_string()))?;

    let rows = pg_rows.iter().map(rows::row_to_map).collect::<Result<Vec<_>>>()?;

    Ok(QueryResult { rows, rows_affected: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Session fake that records every statement and can be told to fail
    /// on statements containing a given substring
    struct FakeSession {
        statements: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeSession {
        fn new() -> Self {
            Self { statements: Mutex::new(Vec::new()), fail_on: None }
        }

        fn failing_on(fragment: &'static str) -> Self {
            Self { statements: Mutex::new(Vec::new()), fail_on: Some(fragment) }
        }

        fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    impl SqlSession for FakeSession {
        async fn batch_execute(&self, sql: &str) -> Result<()> {
            self.statements.lock().unwrap().push(sql.to_string());
            if let Some(fragment) = self.fail_on {
                if sql.contains(fragment) {
                    return Err(RailError::query_failed(format!("forced failure on: {sql}")));
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_role_issues_no_transaction_statements() {
        let session = FakeSession::new();

        let result =
            execute_role_scoped(&session, None, |_| async { Ok::<_, RailError>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert!(session.statements().is_empty());
    }

    #[tokio::test]
    async fn test_empty_role_treated_as_absent() {
        let session = FakeSession::new();

        for role in ["", "   "] {
            let result =
                execute_role_scoped(&session, Some(role), |_| async { Ok::<_, RailError>(()) })
                    .await;
            assert!(result.is_ok());
        }
        assert!(session.statements().is_empty());
    }

    #[tokio::test]
    async fn test_role_scoped_success_commits() {
        let session = FakeSession::new();

        let result =
            execute_role_scoped(&session, Some("app_reader"), |_| async { Ok::<_, RailError>(7) })
                .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(
            session.statements(),
            vec!["BEGIN", "SET LOCAL ROLE \"app_reader\"", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn test_operation_failure_rolls_back_with_original_error() {
        let session = FakeSession::new();

        let result = execute_role_scoped(&session, Some("app_reader"), |_| async {
            Err::<(), _>(RailError::query_failed("permission denied for table docs"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.message().contains("permission denied for table docs"));
        assert_eq!(
            session.statements(),
            vec!["BEGIN", "SET LOCAL ROLE \"app_reader\"", "ROLLBACK"]
        );
    }

    #[tokio::test]
    async fn test_failed_rollback_does_not_mask_original_error() {
        let session = FakeSession::failing_on("ROLLBACK");

        let result = execute_role_scoped(&session, Some("app_reader"), |_| async {
            Err::<(), _>(RailError::query_failed("original failure"))
        })
        .await;

        // The rollback failure is logged, not propagated
        let err = result.unwrap_err();
        assert!(err.message().contains("original failure"));
        assert!(!err.message().contains("ROLLBACK"));
    }

    #[tokio::test]
    async fn test_set_role_failure_rolls_back() {
        let session = FakeSession::failing_on("SET LOCAL ROLE");

        let result = execute_role_scoped(&session, Some("missing_role"), |_| async {
            panic!("operation must not run when SET LOCAL ROLE fails")
        })
        .await
        .map(|()| ());

        assert!(result.is_err());
        assert_eq!(
            session.statements(),
            vec!["BEGIN", "SET LOCAL ROLE \"missing_role\"", "ROLLBACK"]
        );
    }

    #[tokio::test]
    async fn test_invalid_role_fails_before_any_statement() {
        let session = FakeSession::new();

        let result = execute_role_scoped(&session, Some("bad role; --"), |_| async {
            Ok::<_, RailError>(())
        })
        .await;

        assert!(matches!(result.unwrap_err(), RailError::InvalidRole(_)));
        assert!(session.statements().is_empty());
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_statement() {
        // Success path: COMMIT only
        let session = FakeSession::new();
        let _ = execute_role_scoped(&session, Some("r"), |_| async { Ok::<_, RailError>(()) })
            .await;
        let stmts = session.statements();
        let terminals =
            stmts.iter().filter(|s| *s == "COMMIT" || *s == "ROLLBACK").count();
        assert_eq!(terminals, 1);

        // Failure path: ROLLBACK only
        let session = FakeSession::new();
        let _ = execute_role_scoped(&session, Some("r"), |_| async {
            Err::<(), _>(RailError::query_failed("boom"))
        })
        .await;
        let stmts = session.statements();
        let terminals =
            stmts.iter().filter(|s| *s == "COMMIT" || *s == "ROLLBACK").count();
        assert_eq!(terminals, 1);
    }
}
