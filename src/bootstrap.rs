//! # Bootstrapper
//!
//! Chooses between a hosted server (when `TASKER_TESTDB_DSN` is set) and a container
//! started on demand, and returns the [`TestDb`] that forks per-test databases.

use crate::backend::{container, hosted, TestDb};
use crate::config::TestDbConfig;
use crate::conn::Conn;
use crate::error::Result;
use crate::inject::Dependencies;
use tracing::debug;

impl<C: Conn> TestDbConfig<C> {
    /// Apply environment overrides (a `.env` file included), then start the backend.
    pub async fn bootstrap<T: Dependencies<C>>(self) -> Result<TestDb<T, C>> {
        dotenvy::dotenv().ok();
        self.bootstrap_with_env(|key| std::env::var(key).ok()).await
    }

    /// Like [`Self::bootstrap`], with environment lookups answered by `lookup`.
    pub async fn bootstrap_with_env<T: Dependencies<C>>(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<TestDb<T, C>> {
        self.with_env(lookup).start().await
    }

    /// Start the backend exactly as configured, without consulting the environment.
    pub async fn start<T: Dependencies<C>>(mut self) -> Result<TestDb<T, C>> {
        debug!(config = ?self, "Bootstrapping test database");

        match self.hosted_dsn.take() {
            Some(dsn) => hosted::bootstrap(self, dsn).await,
            None => container::bootstrap(self).await,
        }
    }
}
