//! # Test Database Error Types
//!
//! Structured error handling for bootstrap, forking and migration using thiserror.
//! Setup-phase failures are returned to the caller; per-fork failures surface through
//! [`crate::TestDb::try_fork`] (or panic inside [`crate::TestDb::fork`]).

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by container runners
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TestDbError {
    #[error("can't open migration dir {}: {source}", path.display())]
    MigrationsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read migration file {}: {source}", path.display())]
    MigrationFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't execute migration num={migration} and command={statement} {sql}: {source}")]
    Statement {
        migration: usize,
        statement: usize,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database container failed to run: {source}")]
    ContainerStart {
        #[source]
        source: BoxError,
    },

    #[error("can't get connection string: {source}")]
    ConnectionString {
        #[source]
        source: BoxError,
    },

    #[error("can't parse dsn: {source}")]
    ParseDsn {
        #[source]
        source: sqlx::Error,
    },

    #[error("can't create connection to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("hosted db requires namespace prefix")]
    NamespaceRequired,

    #[error("can't create database={database} for user {user}: {source}")]
    CreateDatabase {
        database: String,
        user: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("can't ping database={database}: {source}")]
    Ping {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("fork database name {name} is longer than {max} bytes")]
    ForkNameTooLong { name: String, max: usize },

    /// Failure reported by a custom [`crate::Migrator`]. The built-in migrators report
    /// their own variants; implementations outside this crate wrap theirs in this one.
    #[error("migrator failed for database={database}: {source}")]
    Migration {
        database: String,
        #[source]
        source: BoxError,
    },

    #[error("can't shut down database container: {source}")]
    Shutdown {
        #[source]
        source: BoxError,
    },
}

impl TestDbError {
    /// Whether the error happened before any database connection was attempted
    pub fn is_setup_precondition(&self) -> bool {
        matches!(
            self,
            Self::NamespaceRequired | Self::MigrationsDir { .. } | Self::MigrationFile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TestDbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_names_indices_and_sql() {
        let err = TestDbError::Statement {
            migration: 2,
            statement: 1,
            sql: "CREATE TABLE broken".to_string(),
            source: sqlx::Error::Protocol("syntax error".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("num=2"));
        assert!(message.contains("command=1"));
        assert!(message.contains("CREATE TABLE broken"));
        assert!(message.contains("syntax error"));
    }

    #[test]
    fn test_setup_precondition_classification() {
        assert!(TestDbError::NamespaceRequired.is_setup_precondition());
        assert!(TestDbError::MigrationsDir {
            path: PathBuf::from("missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_setup_precondition());
        assert!(!TestDbError::ParseDsn {
            source: sqlx::Error::Configuration("bad".into()),
        }
        .is_setup_precondition());
    }
}
