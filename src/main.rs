//! pgrail CLI Entry Point
//!
//! Thin agent-facing wrapper over the library. Two subcommands:
//! - `retrieve` - similarity retrieval against a pgvector column
//! - `exec` - caller-supplied SQL with vector placeholder substitution
//!
//! All output to stdout is JSON-only (one envelope per invocation). Logs
//! and invocation records go to stderr via `tracing`. Exit codes: 0 on
//! success, 1 on an ordinary failure, 2 on a critical failure that should
//! halt the calling workflow.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use pgrail::{
    build_retrieval_query, connect, prepare_custom_query, record_invocation, run_query,
    ColumnMapping, ConnectionConfig, DistanceMetric, ErrorEnvelope, ErrorInfo, ExecutionContext,
    Metadata, PgVector, QueryResult, QuerySpec, RailError, Severity, SuccessEnvelope,
    TracingRecorder, DEFAULT_PLACEHOLDER,
};

/// pgrail - Role-scoped PostgreSQL query execution for AI agents
#[derive(Parser)]
#[command(name = "pgrail")]
#[command(about = "Role-scoped PostgreSQL query execution guardrail for AI agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection parameters shared by all subcommands
///
/// Values are expected to be pre-validated by the invoking host. The
/// password may be supplied via the PGRAIL_PASSWORD environment variable
/// instead of a flag.
#[derive(Args)]
struct ConnectionArgs {
    /// Database hostname
    #[arg(long)]
    host: String,

    /// Database port
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Database user
    #[arg(long)]
    user: String,

    /// Database password (or set PGRAIL_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Database name
    #[arg(long)]
    database: String,

    /// Database role to scope the query to (SET LOCAL ROLE)
    #[arg(long)]
    role: Option<String>,
}

impl ConnectionArgs {
    fn resolve(&self) -> anyhow::Result<ConnectionConfig> {
        let password = match &self.password {
            Some(password) => password.clone(),
            None => std::env::var("PGRAIL_PASSWORD")
                .context("password required (use --password or PGRAIL_PASSWORD)")?,
        };

        Ok(ConnectionConfig::new(
            self.host.clone(),
            self.port,
            self.user.clone(),
            password,
            self.database.clone(),
        ))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a similarity retrieval query against a pgvector column
    Retrieve {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Table to query (optionally schema-qualified)
        #[arg(long)]
        table: String,

        /// Primary key column
        #[arg(long, default_value = "id")]
        id_column: String,

        /// Vector (embedding) column
        #[arg(long, default_value = "embedding")]
        vector_column: String,

        /// Document content column
        #[arg(long, default_value = "text")]
        content_column: String,

        /// Metadata column
        #[arg(long, default_value = "metadata")]
        metadata_column: String,

        /// Select the metadata column as well
        #[arg(long)]
        include_metadata: bool,

        /// Number of rows to return (1-1000)
        #[arg(long, default_value_t = 4)]
        limit: i64,

        /// Distance metric: cosine or euclidean
        #[arg(long, default_value = "cosine")]
        metric: DistanceMetric,

        /// Query embedding as a JSON array of numbers
        #[arg(long)]
        embedding: String,
    },

    /// Execute caller-supplied SQL with vector placeholder substitution
    Exec {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// SQL text to execute (trusted; bounded only by the role)
        #[arg(long)]
        sql: String,

        /// Placeholder token marking where the embedding goes
        #[arg(long, default_value = DEFAULT_PLACEHOLDER)]
        placeholder: String,

        /// Query embedding as a JSON array of numbers (optional for
        /// plain SQL with no placeholder occurrences)
        #[arg(long)]
        embedding: Option<String>,
    },
}

fn parse_embedding(raw: &str) -> anyhow::Result<PgVector> {
    let values: Vec<f32> =
        serde_json::from_str(raw).context("embedding must be a JSON array of numbers")?;
    Ok(PgVector(values))
}

/// Print an input-level failure that never reached the library
fn print_invalid_input(command: &str, err: &anyhow::Error) -> ExitCode {
    let envelope = ErrorEnvelope {
        ok: false,
        command: command.to_string(),
        error: ErrorInfo {
            code: "INVALID_INPUT".to_string(),
            message: format!("{err:#}"),
            severity: Severity::Critical,
        },
    };
    println!("{}", serde_json::to_string(&envelope).unwrap_or_default());
    ExitCode::from(2)
}

fn print_failure(command: &str, err: &RailError) -> ExitCode {
    let envelope = ErrorEnvelope::from_error(command, err);
    let code = match envelope.error.severity {
        Severity::Critical => 2,
        Severity::Ordinary => 1,
    };
    println!("{}", serde_json::to_string(&envelope).unwrap_or_default());
    ExitCode::from(code)
}

fn print_success(command: &str, result: &QueryResult, execution_ms: u64) -> ExitCode {
    let meta = match result.rows_affected {
        Some(_) => Metadata::new(execution_ms),
        None => Metadata::with_rows(execution_ms, result.rows.len()),
    };
    let envelope = SuccessEnvelope::new(command, result, meta);
    println!("{}", serde_json::to_string(&envelope).unwrap_or_default());
    ExitCode::SUCCESS
}

/// Connect, run the prepared query under the requested role scope, and
/// record the invocation
async fn execute(
    config: &ConnectionConfig,
    role: Option<&str>,
    spec: QuerySpec,
    input: serde_json::Value,
) -> pgrail::Result<QueryResult> {
    let recorder = TracingRecorder::default();
    let client = connect(config).await?;
    let ctx = ExecutionContext::new(&client, role.map(str::to_string));

    record_invocation(&recorder, input, || ctx.run(|client| run_query(client, &spec))).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs to stderr only; stdout carries exactly one JSON envelope
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Retrieve {
            conn,
            table,
            id_column,
            vector_column,
            content_column,
            metadata_column,
            include_metadata,
            limit,
            metric,
            embedding,
        } => {
            let config = match conn.resolve() {
                Ok(config) => config,
                Err(err) => return print_invalid_input("retrieve", &err),
            };
            let embedding = match parse_embedding(&embedding) {
                Ok(embedding) => embedding,
                Err(err) => return print_invalid_input("retrieve", &err),
            };

            let columns = ColumnMapping {
                id: id_column,
                vector: vector_column,
                content: content_column,
                metadata: metadata_column,
            };

            let input = json!({
                "command": "retrieve",
                "table": &table,
                "columns": &columns,
                "include_metadata": include_metadata,
                "limit": limit,
                "metric": metric,
                "role": &conn.role,
            });

            let spec = match build_retrieval_query(
                &table,
                &columns,
                include_metadata,
                limit,
                metric,
                embedding,
            ) {
                Ok(spec) => spec,
                Err(err) => return print_failure("retrieve", &err),
            };

            let start = Instant::now();
            match execute(&config, conn.role.as_deref(), spec, input).await {
                Ok(result) => {
                    print_success("retrieve", &result, start.elapsed().as_millis() as u64)
                }
                Err(err) => print_failure("retrieve", &err),
            }
        }

        Commands::Exec { conn, sql, placeholder, embedding } => {
            let config = match conn.resolve() {
                Ok(config) => config,
                Err(err) => return print_invalid_input("exec", &err),
            };
            let embedding = match embedding.as_deref().map(parse_embedding).transpose() {
                Ok(embedding) => embedding.unwrap_or(PgVector(Vec::new())),
                Err(err) => return print_invalid_input("exec", &err),
            };

            let input = json!({
                "command": "exec",
                "sql": &sql,
                "placeholder": &placeholder,
                "role": &conn.role,
            });

            let spec = match prepare_custom_query(&sql, &placeholder, &embedding) {
                Ok(spec) => spec,
                Err(err) => return print_failure("exec", &err),
            };

            let start = Instant::now();
            match execute(&config, conn.role.as_deref(), spec, input).await {
                Ok(result) => print_success("exec", &result, start.elapsed().as_millis() as u64),
                Err(err) => print_failure("exec", &err),
            }
        }
    }
}
