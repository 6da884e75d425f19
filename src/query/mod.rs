//! Query Construction for Similarity Retrieval
//!
//! This module builds the SELECT statement for similarity-retrieval mode
//! from a table name, a column mapping, a metadata-inclusion flag, and a
//! result limit.
//!
//! # Injection Surface
//! - Identifiers pass through [`crate::sanitize::quote_identifier`] before
//!   any SQL is assembled; building fails first on a bad identifier.
//! - The distance operator is a closed enum ([`DistanceMetric`]), never
//!   caller-supplied text.
//! - The embedding vector and the limit travel as positional bind
//!   parameters (`$1`, `$2`), never as SQL text.
//!
//! # Wire Format
//! Embedding vectors are encoded as the bracketed text literal pgvector
//! accepts (`[0.1,0.2,...]`), sent in text format so the server parses it
//! with the vector input function regardless of the inferred column type.

pub mod custom;

use std::fmt::Write as _;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::{to_sql_checked, Format, IsNull, ToSql, Type};

use crate::error::{RailError, Result};
use crate::sanitize::quote_identifier;

/// Ceiling on the similarity-retrieval result limit
pub const MAX_RETRIEVAL_LIMIT: i64 = 1000;

/// Column mapping for similarity retrieval
///
/// Immutable per invocation. Defaults match the conventional pgvector
/// document-table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Primary key column
    pub id: String,

    /// Vector (embedding) column
    pub vector: String,

    /// Document content column
    pub content: String,

    /// Metadata column (only selected when metadata inclusion is requested)
    pub metadata: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            vector: "embedding".to_string(),
            content: "text".to_string(),
            metadata: "metadata".to_string(),
        }
    }
}

/// Distance operator used in the ORDER BY clause
///
/// A closed set: the operator is an explicit configuration choice, never
/// free text from the caller. Cosine distance is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance, pgvector `<=>` (default)
    #[default]
    Cosine,
    /// Euclidean (L2) distance, pgvector `<->`
    Euclidean,
}

impl DistanceMetric {
    /// The pgvector operator for this metric
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::Euclidean => "<->",
        }
    }

    /// Get the metric name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => {
                Err(format!("unknown distance metric '{other}' (expected 'cosine' or 'euclidean')"))
            }
        }
    }
}

/// Embedding vector bind parameter
///
/// Encodes as the bracketed pgvector text literal (`[0.1,0.2,...]`). The
/// text format lets the server-side input function parse it for whatever
/// parameter type the prepared statement inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PgVector(pub Vec<f32>);

impl PgVector {
    /// Render the bracketed literal form
    #[must_use]
    pub fn to_literal(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 8 + 2);
        out.push('[');
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            // f32 Display round-trips exactly, no precision loss
            let _ = write!(out, "{v}");
        }
        out.push(']');
        out
    }
}

impl ToSql for PgVector {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        out.extend_from_slice(self.to_literal().as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        // The pgvector OID is installation-specific, so accept any type and
        // let the server-side input function validate the literal
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

/// A positional bind parameter in a [`QuerySpec`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// Embedding vector parameter
    Vector(PgVector),
    /// Integer parameter (e.g. LIMIT)
    BigInt(i64),
}

impl SqlParam {
    /// Borrow as a driver-level bind value
    #[must_use]
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Vector(v) => v,
            Self::BigInt(i) => i,
        }
    }
}

/// A fully assembled query: SQL text plus ordered bind parameters
///
/// Produced once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    /// SQL text with `$1, $2, ...` positional parameter references
    pub sql: String,

    /// Bind values, in positional order
    pub params: Vec<SqlParam>,
}

/// Build the SELECT statement for similarity-retrieval mode
///
/// Produces
/// `SELECT "<id>" AS id, "<content>" AS content[, "<metadata>" AS metadata]
/// FROM "<table>" ORDER BY "<vector>" <op> $1 LIMIT $2`
/// with parameters `[embedding, limit]`.
///
/// # Errors
/// - [`RailError::InvalidLimit`] unless `1 <= limit <= MAX_RETRIEVAL_LIMIT`
/// - [`RailError::InvalidIdentifier`] if the table or any mapped column
///   fails validation
///
/// Both checks run before any SQL is assembled.
pub fn build_retrieval_query(
    table: &str,
    columns: &ColumnMapping,
    include_metadata: bool,
    limit: i64,
    metric: DistanceMetric,
    embedding: PgVector,
) -> Result<QuerySpec> {
    if !(1..=MAX_RETRIEVAL_LIMIT).contains(&limit) {
        return Err(RailError::invalid_limit(format!(
            "limit must be between 1 and {MAX_RETRIEVAL_LIMIT}, got {limit}"
        )));
    }

    let table = quote_identifier(table)?;
    let id = quote_identifier(&columns.id)?;
    let content = quote_identifier(&columns.content)?;
    let vector = quote_identifier(&columns.vector)?;
    let metadata =
        if include_metadata { Some(quote_identifier(&columns.metadata)?) } else { None };

    let mut sql = format!("SELECT {id} AS id, {content} AS content");
    if let Some(metadata) = metadata {
        let _ = write!(sql, ", {metadata} AS metadata");
    }
    let _ = write!(sql, " FROM {table} ORDER BY {vector} {} $1 LIMIT $2", metric.operator());

    Ok(QuerySpec { sql, params: vec![SqlParam::Vector(embedding), SqlParam::BigInt(limit)] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            id: "id".to_string(),
            vector: "embedding".to_string(),
            content: "text".to_string(),
            metadata: "meta".to_string(),
        }
    }

    #[test]
    fn test_build_with_metadata() {
        let spec = build_retrieval_query(
            "docs",
            &mapping(),
            true,
            5,
            DistanceMetric::Cosine,
            PgVector(vec![0.1, 0.2]),
        )
        .unwrap();

        assert_eq!(
            spec.sql,
            "SELECT \"id\" AS id, \"text\" AS content, \"meta\" AS metadata \
             FROM \"docs\" ORDER BY \"embedding\" <=> $1 LIMIT $2"
        );
        assert_eq!(
            spec.params,
            vec![SqlParam::Vector(PgVector(vec![0.1, 0.2])), SqlParam::BigInt(5)]
        );
    }

    #[test]
    fn test_build_without_metadata() {
        let spec = build_retrieval_query(
            "docs",
            &mapping(),
            false,
            5,
            DistanceMetric::Cosine,
            PgVector(vec![0.1]),
        )
        .unwrap();

        assert!(!spec.sql.contains("metadata"));
        assert!(!spec.sql.contains("\"meta\""));
        assert_eq!(
            spec.sql,
            "SELECT \"id\" AS id, \"text\" AS content \
             FROM \"docs\" ORDER BY \"embedding\" <=> $1 LIMIT $2"
        );
    }

    #[test]
    fn test_build_euclidean_operator() {
        let spec = build_retrieval_query(
            "docs",
            &mapping(),
            false,
            5,
            DistanceMetric::Euclidean,
            PgVector(vec![0.1]),
        )
        .unwrap();

        assert!(spec.sql.contains("\"embedding\" <-> $1"));
    }

    #[test]
    fn test_build_schema_qualified_table() {
        let spec = build_retrieval_query(
            "app.docs",
            &mapping(),
            false,
            1,
            DistanceMetric::Cosine,
            PgVector(vec![0.1]),
        )
        .unwrap();

        assert!(spec.sql.contains("FROM \"app\".\"docs\""));
    }

    #[test]
    fn test_build_limit_bounds() {
        let build = |limit| {
            build_retrieval_query(
                "docs",
                &mapping(),
                false,
                limit,
                DistanceMetric::Cosine,
                PgVector(vec![0.1]),
            )
        };

        assert!(build(1).is_ok());
        assert!(build(MAX_RETRIEVAL_LIMIT).is_ok());

        assert!(matches!(build(0).unwrap_err(), RailError::InvalidLimit(_)));
        assert!(matches!(build(-3).unwrap_err(), RailError::InvalidLimit(_)));
        assert!(matches!(build(MAX_RETRIEVAL_LIMIT + 1).unwrap_err(), RailError::InvalidLimit(_)));
    }

    #[test]
    fn test_build_rejects_bad_identifiers_before_assembly() {
        let err = build_retrieval_query(
            "docs; DROP TABLE docs",
            &mapping(),
            true,
            5,
            DistanceMetric::Cosine,
            PgVector(vec![0.1]),
        )
        .unwrap_err();
        assert!(matches!(err, RailError::InvalidIdentifier(_)));

        let bad_columns = ColumnMapping { id: "id\"".to_string(), ..mapping() };
        let err = build_retrieval_query(
            "docs",
            &bad_columns,
            true,
            5,
            DistanceMetric::Cosine,
            PgVector(vec![0.1]),
        )
        .unwrap_err();
        assert!(matches!(err, RailError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_default_column_mapping() {
        let columns = ColumnMapping::default();
        assert_eq!(columns.id, "id");
        assert_eq!(columns.vector, "embedding");
        assert_eq!(columns.content, "text");
        assert_eq!(columns.metadata, "metadata");
    }

    #[test]
    fn test_distance_metric_parsing() {
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("euclidean".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_vector_literal_rendering() {
        assert_eq!(PgVector(vec![0.1, 0.2, 0.3]).to_literal(), "[0.1,0.2,0.3]");
        assert_eq!(PgVector(vec![1.0, -2.5]).to_literal(), "[1,-2.5]");
        assert_eq!(PgVector(vec![]).to_literal(), "[]");
    }

    #[test]
    fn test_params_serialize_as_plain_values() {
        let spec = build_retrieval_query(
            "docs",
            &mapping(),
            false,
            5,
            DistanceMetric::Cosine,
            PgVector(vec![1.0, 2.0]),
        )
        .unwrap();

        let json = serde_json::to_value(&spec.params).unwrap();
        assert_eq!(json, serde_json::json!([[1.0, 2.0], 5]));
    }
}
