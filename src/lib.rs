#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker TestDB
//!
//! Ephemeral PostgreSQL databases for integration tests.
//!
//! ## Overview
//!
//! A suite bootstraps one database server, either a container started on demand or an
//! operator-supplied hosted server, and every test then forks its own database off it.
//! Each fork gets the full migration set replayed and its connection injected into the
//! test's dependency struct, so tests never see each other's rows.
//!
//! ## Module Organization
//!
//! - [`config`] - Options and environment overrides
//! - [`bootstrap`] - Hosted vs. container selection
//! - [`backend`] - Forking, teardown and the two backends
//! - [`migrator`] - Directory-based SQL migrations
//! - [`inject`] - Typed bindings for dependency structs
//! - [`fork`] - Fork naming and DSN handling
//! - [`conn`] - Connection abstraction
//! - [`error`] - Structured error handling
//! - [`logging`] - Test logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tasker_testdb::{Bindings, Connect, Dependencies, TestDbConfig};
//!
//! #[derive(Default)]
//! struct Deps {
//!     db: Option<Connect>,
//! }
//!
//! impl Dependencies for Deps {
//!     fn bindings() -> Bindings<Self> {
//!         Bindings::new().conn("postgres", |deps: &mut Deps, conn| deps.db = Some(conn))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let testdb = TestDbConfig::new()
//!     .with_migrations_path("./migrations")
//!     .with_hosted_db_namespace("ci_")
//!     .bootstrap::<Deps>()
//!     .await?;
//!
//! let fork = testdb.fork(Deps::default()).await;
//! let pool = fork.db.as_ref().unwrap().pool();
//! sqlx::query("SELECT 1").execute(pool).await?;
//!
//! fork.teardown().await;
//! testdb.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment
//!
//! - `TASKER_TESTDB_DSN` - fork on this hosted server instead of starting a container
//! - `TASKER_TESTDB_IMAGE` - container image override (variable name configurable)
//! - `RUST_LOG` - log filter for [`logging::init_test_logging`]

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod conn;
pub mod error;
pub mod fork;
pub mod inject;
pub mod logging;
pub mod migrator;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::container::{ContainerRunner, ContainerSpec, DatabaseContainer, PostgresRunner};
pub use backend::{Fork, TestDb};
pub use config::{TestDbConfig, DEFAULT_IMAGE, DEFAULT_IMAGE_ENV, HOSTED_DSN_ENV};
pub use conn::{Conn, Connect, Connector, PoolConnector};
pub use error::{Result, TestDbError};
pub use inject::{Bindings, Dependencies, Labels, Resources};
pub use logging::init_test_logging;
pub use migrator::{Migrator, MigratorConfig, NoopMigrator, PlainMigrator};
