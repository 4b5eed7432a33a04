//! # Plain Directory Migrator
//!
//! Loads every regular file in the migrations directory at bootstrap, ordered by file
//! name, so `0001_init.sql`, `0002_users.sql`, ... apply in the expected order. Files
//! are kept in memory; each fork replays all of them.

use super::{split_statements, Migrator, MigratorConfig};
use crate::conn::Conn;
use crate::error::{Result, TestDbError};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const DEFAULT_EXPECTED_MIGRATIONS: usize = 8;

/// A single migration file and its statements.
#[derive(Debug, Clone)]
pub struct Migration {
    /// File name, used for ordering and logging
    pub name: String,
    pub path: PathBuf,
    pub statements: Vec<String>,
}

impl Migration {
    pub fn from_sql(name: impl Into<String>, sql: &str) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            statements: split_statements(sql),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlainMigrator {
    migrations: Vec<Migration>,
}

impl PlainMigrator {
    /// Read all migration files from `dir`.
    ///
    /// Fails without touching any database when the directory or one of its files can't
    /// be read.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| TestDbError::MigrationsDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::with_capacity(DEFAULT_EXPECTED_MIGRATIONS);
        for entry in entries {
            let entry = entry.map_err(|source| TestDbError::MigrationsDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            files.push(path);
        }
        files.sort();

        let mut migrations = Vec::with_capacity(files.len());
        for path in files {
            let sql = fs::read_to_string(&path).map_err(|source| TestDbError::MigrationFile {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            migrations.push(Migration {
                name,
                statements: split_statements(&sql),
                path,
            });
        }

        debug!(
            path = %dir.display(),
            migrations = migrations.len(),
            "Loaded migrations"
        );

        Ok(Self { migrations })
    }

    pub fn from_migrations(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[async_trait]
impl<C: Conn> Migrator<C> for PlainMigrator {
    async fn migrate(&self, config: MigratorConfig<'_, C>) -> Result<()> {
        for (i, migration) in self.migrations.iter().enumerate() {
            for (j, statement) in migration.statements.iter().enumerate() {
                trace!(
                    database = config.db_name,
                    migration = %migration.name,
                    statement = j,
                    "Executing migration statement"
                );

                config
                    .db
                    .exec(statement)
                    .await
                    .map_err(|source| TestDbError::Statement {
                        migration: i,
                        statement: j,
                        sql: statement.clone(),
                        source,
                    })?;
            }
        }

        debug!(
            database = config.db_name,
            migrations = self.migrations.len(),
            "Applied migrations"
        );

        Ok(())
    }
}
