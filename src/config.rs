//! # Test Database Configuration
//!
//! Options are assembled once, before bootstrap, through consuming `with_*` methods.
//! Two environment variables override what the code says:
//!
//! - the image variable (default `TASKER_TESTDB_IMAGE`, name configurable) replaces the
//!   container image;
//! - `TASKER_TESTDB_DSN` switches to a hosted server instead of starting a container.
//!
//! ```rust,no_run
//! use tasker_testdb::TestDbConfig;
//!
//! let config = TestDbConfig::new()
//!     .with_container_image("postgres:16-alpine")
//!     .with_username("tasker")
//!     .with_password("tasker")
//!     .with_migrations_path("./migrations")
//!     .with_inject_label("db")
//!     .with_hosted_db_namespace("ci_");
//! ```

use crate::backend::container::{ContainerRunner, PostgresRunner};
use crate::conn::{Conn, Connector, PoolConnector};
use crate::error::Result;
use crate::inject::Labels;
use crate::migrator::{Migrator, PlainMigrator};
use sqlx::postgres::PgPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_IMAGE: &str = "postgres:16-alpine";
pub const DEFAULT_IMAGE_ENV: &str = "TASKER_TESTDB_IMAGE";
pub const HOSTED_DSN_ENV: &str = "TASKER_TESTDB_DSN";
pub const DEFAULT_MIGRATIONS_PATH: &str = "migrations";

pub struct TestDbConfig<C: Conn = PgPool> {
    pub(crate) container_image: String,
    pub(crate) image_env_var: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) database: String,
    pub(crate) migrations_path: PathBuf,
    pub(crate) labels: Labels,
    pub(crate) hosted_namespace: String,
    pub(crate) hosted_dsn: Option<String>,
    pub(crate) migrator: Option<Arc<dyn Migrator<C>>>,
    pub(crate) connector: Arc<dyn Connector<C>>,
    pub(crate) runner: Arc<dyn ContainerRunner>,
}

impl TestDbConfig<PgPool> {
    pub fn new() -> Self {
        Self::with_connector(PoolConnector::default())
    }
}

impl Default for TestDbConfig<PgPool> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Conn> TestDbConfig<C> {
    /// Configuration whose connections come from `connector` instead of a `PgPool`
    pub fn with_connector(connector: impl Connector<C> + 'static) -> Self {
        Self {
            container_image: DEFAULT_IMAGE.to_string(),
            image_env_var: DEFAULT_IMAGE_ENV.to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "tasker_test".to_string(),
            migrations_path: PathBuf::from(DEFAULT_MIGRATIONS_PATH),
            labels: Labels::default(),
            hosted_namespace: String::new(),
            hosted_dsn: None,
            migrator: None,
            connector: Arc::new(connector),
            runner: Arc::new(PostgresRunner),
        }
    }

    pub fn with_container_image(mut self, image: impl Into<String>) -> Self {
        self.container_image = image.into();
        self
    }

    /// Name of the environment variable that overrides the container image
    pub fn with_image_env_var(mut self, name: impl Into<String>) -> Self {
        self.image_env_var = name.into();
        self
    }

    pub fn with_username(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Base database; forks are named `{database}_{N}`
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_migrations_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.migrations_path = path.into();
        self
    }

    pub fn with_migrator(mut self, migrator: impl Migrator<C> + 'static) -> Self {
        self.migrator = Some(Arc::new(migrator));
        self
    }

    pub fn with_runner(mut self, runner: impl ContainerRunner + 'static) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Label of the connection binding
    pub fn with_inject_label(mut self, label: impl Into<String>) -> Self {
        self.labels.conn = label.into();
        self
    }

    /// Label of the connection options binding
    pub fn with_inject_label_for_config(mut self, label: impl Into<String>) -> Self {
        self.labels.options = label.into();
        self
    }

    /// Label of the DSN binding
    pub fn with_inject_label_for_dsn(mut self, label: impl Into<String>) -> Self {
        self.labels.dsn = label.into();
        self
    }

    /// Prefix for fork names on a hosted server; required in hosted mode
    pub fn with_hosted_db_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.hosted_namespace = namespace.into();
        self
    }

    /// A namespace unique to this process, for CI runs sharing one hosted server
    pub fn with_random_hosted_db_namespace(self) -> Self {
        let namespace = format!("t{}_", Uuid::new_v4().simple());
        self.with_hosted_db_namespace(namespace)
    }

    /// Use a hosted server without going through the environment
    pub fn with_hosted_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.hosted_dsn = Some(dsn.into());
        self
    }

    /// Apply the image and hosted-DSN overrides found through `lookup`.
    ///
    /// Empty values count as unset.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(image) = non_empty(&self.image_env_var) {
            self.container_image = image;
        }
        if let Some(dsn) = non_empty(HOSTED_DSN_ENV) {
            self.hosted_dsn = Some(dsn);
        }
        self
    }

    pub fn container_image(&self) -> &str {
        &self.container_image
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn migrations_path(&self) -> &Path {
        &self.migrations_path
    }

    pub fn is_hosted(&self) -> bool {
        self.hosted_dsn.is_some()
    }

    /// The configured migrator, or a [`PlainMigrator`] over the migrations path
    pub(crate) fn resolve_migrator(&self) -> Result<Arc<dyn Migrator<C>>> {
        match &self.migrator {
            Some(migrator) => Ok(migrator.clone()),
            None => Ok(Arc::new(PlainMigrator::load(&self.migrations_path)?)),
        }
    }
}

impl<C: Conn> std::fmt::Debug for TestDbConfig<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDbConfig")
            .field("container_image", &self.container_image)
            .field("image_env_var", &self.image_env_var)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("migrations_path", &self.migrations_path)
            .field("labels", &self.labels)
            .field("hosted_namespace", &self.hosted_namespace)
            .field("hosted", &self.hosted_dsn.is_some())
            .field("custom_migrator", &self.migrator.is_some())
            .finish()
    }
}
