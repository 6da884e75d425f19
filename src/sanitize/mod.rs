//! Identifier and Role Name Validation
//!
//! This module is the sole sanitization boundary for caller-supplied SQL
//! identifiers (table, column, schema names) and database role names.
//!
//! # Why not bind parameters?
//! PostgreSQL does not support parameterized identifiers, and role names in
//! `SET LOCAL ROLE` cannot be bound either. Both must be interpolated into
//! SQL text, so validation here is the only defense against injection.
//!
//! # Validation Strategy
//! - Conservative character set: `^[A-Za-z_][A-Za-z0-9_]*$`
//! - Schema qualification: exactly one `.`, both halves validated independently
//! - Length ceiling per part: 63 bytes (PostgreSQL `NAMEDATALEN - 1`)
//! - Accepted identifiers are wrapped in double quotes before use

use crate::error::{RailError, Result};

/// Maximum byte length of a single identifier part (PostgreSQL truncates
/// identifiers at `NAMEDATALEN - 1` = 63 bytes; longer input is rejected
/// rather than silently truncated).
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Check a single identifier part against `^[A-Za-z_][A-Za-z0-9_]*$`
fn is_valid_part(part: &str) -> bool {
    if part.is_empty() || part.len() > MAX_IDENTIFIER_LEN {
        return false;
    }

    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate and quote a SQL identifier
///
/// Accepts a bare identifier (`users`) or a schema-qualified identifier
/// (`app.users`, exactly one `.`). Each part must match
/// `^[A-Za-z_][A-Za-z0-9_]*$`. On success each part is wrapped in double
/// quotes and rejoined with `.`.
///
/// This must be applied to every caller-supplied table/column name before
/// it is embedded into SQL text.
///
/// # Errors
/// Returns [`RailError::InvalidIdentifier`] for anything else: empty
/// strings, quotes, semicolons, leading digits, two dots, overlong parts.
pub fn quote_identifier(identifier: &str) -> Result<String> {
    let mut parts = identifier.split('.');

    // split() always yields at least one element
    let first = parts.next().unwrap_or_default();

    match parts.next() {
        None => {
            if !is_valid_part(first) {
                return Err(RailError::invalid_identifier(identifier));
            }
            Ok(format!("\"{first}\""))
        }
        Some(second) => {
            // A third segment means more than one dot
            if parts.next().is_some() || !is_valid_part(first) || !is_valid_part(second) {
                return Err(RailError::invalid_identifier(identifier));
            }
            Ok(format!("\"{first}\".\"{second}\""))
        }
    }
}

/// Validate a database role name
///
/// Role names are interpolated textually into `SET LOCAL ROLE "<role>"`
/// and must match `^[A-Za-z_][A-Za-z0-9_]*$`. This must run before every
/// use of a caller-supplied role.
///
/// # Errors
/// Returns [`RailError::InvalidRole`] for names containing spaces, hyphens,
/// quotes, or any other SQL metacharacter.
pub fn validate_role(role: &str) -> Result<&str> {
    if is_valid_part(role) {
        Ok(role)
    } else {
        Err(RailError::invalid_role(role))
    }
}
