//! Custom SQL Preparation
//!
//! Caller-supplied SQL with a designated placeholder token marking where
//! the embedding vector goes. Each literal occurrence of the token becomes
//! a sequential positional parameter (`$1`, `$2`, ...) bound to the same
//! embedding, so a query may reference the vector more than once.
//!
//! The raw SQL text itself is intentionally NOT sanitized here: trusting
//! caller-supplied SQL is an explicit capability of this mode, bounded by
//! the execution role and by database-level grants on that role.

use crate::error::{RailError, Result};
use crate::query::{PgVector, QuerySpec, SqlParam};

use std::fmt::Write as _;

/// Default placeholder token for the embedding vector
pub const DEFAULT_PLACEHOLDER: &str = "$1";

/// Prepare caller-supplied SQL for execution
///
/// Replaces the i-th occurrence of `placeholder_token` with `$i` and binds
/// the embedding once per occurrence. Zero occurrences is valid: the query
/// runs with no bound vector parameter (plain SQL mode).
///
/// # Errors
/// Returns [`RailError::EmptyPlaceholder`] if the token is blank.
pub fn prepare_custom_query(
    raw_sql: &str,
    placeholder_token: &str,
    embedding: &PgVector,
) -> Result<QuerySpec> {
    if placeholder_token.trim().is_empty() {
        return Err(RailError::EmptyPlaceholder);
    }

    let mut sql = String::with_capacity(raw_sql.len());
    let mut params = Vec::new();
    let mut rest = raw_sql;

    while let Some(pos) = rest.find(placeholder_token) {
        sql.push_str(&rest[..pos]);
        let _ = write!(sql, "${}", params.len() + 1);
        params.push(SqlParam::Vector(embedding.clone()));
        rest = &rest[pos + placeholder_token.len()..];
    }
    sql.push_str(rest);

    Ok(QuerySpec { sql, params })
}
