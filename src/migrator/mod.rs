//! # Migrations
//!
//! Every fork replays the full migration set from scratch: there is no version table,
//! no checksum and no transactional wrapping. The default [`PlainMigrator`] reads a
//! directory of SQL files once at bootstrap and executes their statements in order on
//! each fork.
//!
//! Custom strategies plug in through the [`Migrator`] trait (for example to call
//! `sqlx::migrate!` instead).

pub mod plain;
pub mod splitter;

use crate::conn::Conn;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use std::path::Path;

pub use plain::{Migration, PlainMigrator};
pub use splitter::split_statements;

/// Everything a migrator knows about the fork it is migrating.
#[derive(Debug)]
pub struct MigratorConfig<'a, C> {
    pub db: &'a C,
    pub db_name: &'a str,
    pub path: &'a Path,
    pub user_name: &'a str,
    pub password: Option<&'a str>,
    pub options: &'a PgConnectOptions,
}

#[async_trait]
pub trait Migrator<C: Conn>: Send + Sync {
    async fn migrate(&self, config: MigratorConfig<'_, C>) -> Result<()>;
}

/// Migrator for suites without a schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMigrator;

#[async_trait]
impl<C: Conn> Migrator<C> for NoopMigrator {
    async fn migrate(&self, _config: MigratorConfig<'_, C>) -> Result<()> {
        Ok(())
    }
}
