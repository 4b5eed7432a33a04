//! # Database Connections
//!
//! The minimal surface the forking machinery needs from a database handle, plus the
//! [`Connect`] wrapper injected into test dependency structs.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::ops::Deref;
use std::time::Duration;

/// Operations the bootstrapper and migrator run against a live database handle.
#[async_trait]
pub trait Conn: Clone + Send + Sync + 'static {
    /// Execute a single statement, discarding any result rows
    async fn exec(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Round-trip to the server to verify the handle is usable
    async fn ping(&self) -> Result<(), sqlx::Error>;

    /// Close the handle; further use fails
    async fn shutdown(&self);
}

#[async_trait]
impl Conn for PgPool {
    async fn exec(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(self).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.close().await;
    }
}

/// Live connection to one forked database, owned by a single test.
#[derive(Debug, Clone)]
pub struct Connect<C = PgPool>(pub(crate) C);

impl<C> Connect<C> {
    pub fn new(inner: C) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> &C {
        &self.0
    }

    pub fn into_inner(self) -> C {
        self.0
    }
}

impl Connect<PgPool> {
    /// The underlying pool, for passing to `sqlx::query(..).execute(..)`
    pub fn pool(&self) -> &PgPool {
        &self.0
    }
}

impl<C> Deref for Connect<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

/// Opens a database handle from parsed connection options.
#[async_trait]
pub trait Connector<C: Conn>: Send + Sync {
    async fn connect(&self, options: PgConnectOptions) -> Result<C, sqlx::Error>;
}

/// Default connector: a `PgPool` capped at a single connection.
#[derive(Debug, Clone)]
pub struct PoolConnector {
    max_connections: u32,
    acquire_timeout: Duration,
}

impl Default for PoolConnector {
    fn default() -> Self {
        Self {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector<PgPool> for PoolConnector {
    async fn connect(&self, options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_connector_never_drops_below_one_connection() {
        let connector = PoolConnector::new().with_max_connections(0);
        assert_eq!(connector.max_connections, 1);

        let connector = PoolConnector::new().with_max_connections(4);
        assert_eq!(connector.max_connections, 4);
    }

    #[test]
    fn test_connect_derefs_to_inner_handle() {
        let connect = Connect::new(String::from("handle"));
        assert_eq!(connect.len(), 6);
        assert_eq!(connect.inner(), "handle");
        assert_eq!(connect.into_inner(), "handle");
    }
}
