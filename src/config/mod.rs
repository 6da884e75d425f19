//! Connection Configuration
//!
//! Typed connection parameters and connection establishment.
//!
//! Every field is explicit and required: values arrive from the host's own
//! parameter system already validated, and there is no property-bag lookup
//! or connection-string parsing here.

use serde::{Deserialize, Serialize};
use tokio_postgres::{Client, NoTls};

use crate::error::{RailError, Result};

/// Connection parameters for a `PostgreSQL` database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Hostname
    pub host: String,

    /// Port number
    pub port: u16,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,

    /// Database name
    pub database: String,
}

impl ConnectionConfig {
    /// Create a connection config
    #[must_use]
    pub const fn new(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self { host, port, user, password, database }
    }

    /// Build the driver-level config
    fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database);
        config
    }
}

/// Open a connection and spawn its I/O handler
///
/// The returned client is exclusive to the invocation that requested it.
/// Timeouts are whatever the underlying connection is configured with; no
/// additional timeout is imposed here.
///
/// # Errors
/// Returns [`RailError::ConnectionFailed`] if the connection cannot be
/// established.
pub async fn connect(config: &ConnectionConfig) -> Result<Client> {
    let (client, connection) = config.pg_config().connect(NoTls).await.map_err(|e| {
        RailError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
    })?;

    // Connection errors are not logged to prevent credential leakage
    tokio::spawn(async move {
        let _ = connection.await;
    });

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_round_trips_through_json() {
        let config = ConnectionConfig::new(
            "localhost".to_string(),
            5432,
            "agent".to_string(),
            "secret".to_string(),
            "app".to_string(),
        );

        let json = serde_json::to_string(&config).unwrap();
        let back: ConnectionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.host, "localhost");
        assert_eq!(back.port, 5432);
        assert_eq!(back.user, "agent");
        assert_eq!(back.database, "app");
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_is_connection_failed() {
        // Port 1 on localhost is assumed closed
        let config = ConnectionConfig::new(
            "127.0.0.1".to_string(),
            1,
            "agent".to_string(),
            "secret".to_string(),
            "app".to_string(),
        );

        let err = connect(&config).await.err().expect("connect must fail");
        assert!(matches!(err, RailError::ConnectionFailed(_)));
        assert_eq!(err.error_code(), "CONNECTION_FAILED");
    }
}
