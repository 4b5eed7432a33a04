//! # Container Backend
//!
//! Starts a throwaway PostgreSQL container and forks every test's database off its
//! root connection. Data lives on tmpfs; nothing survives the container.

use super::{Mode, TestDb};
use crate::config::TestDbConfig;
use crate::conn::Conn;
use crate::error::{BoxError, Result, TestDbError};
use crate::fork::{check_fork_prefix, Dsn};
use crate::inject::Dependencies;
use async_trait::async_trait;
use testcontainers::core::{IntoContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tracing::{info, warn};
use url::Url;

const POSTGRES_PORT: u16 = 5432;

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ContainerSpec {
    /// `(name, tag)` of the image reference; the tag defaults to `latest`
    pub fn image_name_and_tag(&self) -> (&str, &str) {
        match self.image.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => (name, tag),
            _ => (self.image.as_str(), "latest"),
        }
    }
}

/// A running database container.
#[async_trait]
pub trait DatabaseContainer: Send + Sync {
    /// DSN reaching the container's root database from the host
    async fn connection_string(&self) -> std::result::Result<String, BoxError>;

    /// Stop and remove the container; later calls are no-ops
    async fn terminate(&mut self) -> std::result::Result<(), BoxError>;
}

/// Starts database containers.
#[async_trait]
pub trait ContainerRunner: Send + Sync {
    async fn run(&self, spec: &ContainerSpec)
        -> std::result::Result<Box<dyn DatabaseContainer>, BoxError>;
}

/// Default runner: the official PostgreSQL image through testcontainers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRunner;

#[async_trait]
impl ContainerRunner for PostgresRunner {
    async fn run(
        &self,
        spec: &ContainerSpec,
    ) -> std::result::Result<Box<dyn DatabaseContainer>, BoxError> {
        let (name, tag) = spec.image_name_and_tag();

        let container = GenericImage::new(name, tag)
            .with_exposed_port(POSTGRES_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout(
                "PostgreSQL init process complete; ready for start up.",
            ))
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", &spec.user)
            .with_env_var("POSTGRES_PASSWORD", &spec.password)
            .with_env_var("POSTGRES_DB", &spec.database)
            .with_env_var("PGDATA", "/tmpfs")
            .with_mount(Mount::tmpfs_mount("/tmpfs"))
            .start()
            .await?;

        Ok(Box::new(PostgresContainer {
            inner: Some(container),
            spec: spec.clone(),
        }))
    }
}

pub struct PostgresContainer {
    inner: Option<ContainerAsync<GenericImage>>,
    spec: ContainerSpec,
}

#[async_trait]
impl DatabaseContainer for PostgresContainer {
    async fn connection_string(&self) -> std::result::Result<String, BoxError> {
        let container = self.inner.as_ref().ok_or("container already terminated")?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(POSTGRES_PORT.tcp()).await?;

        let mut url = Url::parse(&format!("postgres://{host}:{port}"))?;
        url.set_username(&self.spec.user)
            .map_err(|_| "container DSN can't carry a username")?;
        url.set_password(Some(&self.spec.password))
            .map_err(|_| "container DSN can't carry a password")?;
        url.set_path(&format!("/{}", self.spec.database));

        Ok(url.to_string())
    }

    async fn terminate(&mut self) -> std::result::Result<(), BoxError> {
        if let Some(container) = self.inner.take() {
            container.rm().await?;
        }
        Ok(())
    }
}

/// Start the container and connect to its root database.
pub(crate) async fn bootstrap<T, C>(config: TestDbConfig<C>) -> Result<TestDb<T, C>>
where
    T: Dependencies<C>,
    C: Conn,
{
    let migrator = config.resolve_migrator()?;

    let spec = ContainerSpec {
        image: config.container_image.clone(),
        user: config.user.clone(),
        password: config.password.clone(),
        database: config.database.clone(),
    };
    let mut container = config
        .runner
        .run(&spec)
        .await
        .map_err(|source| TestDbError::ContainerStart { source })?;

    info!(image = %spec.image, "Database container started");

    // From here on a failure must not leak the container
    match connect_root(&*container, &config).await {
        Ok((dsn, root)) => Ok(TestDb::new(
            config,
            Mode::Container {
                container: parking_lot::Mutex::new(Some(container)),
            },
            dsn,
            root,
            migrator,
        )),
        Err(err) => {
            if let Err(terminate_err) = container.terminate().await {
                warn!(error = %terminate_err, "Can't terminate database container after failed setup");
            }
            Err(err)
        }
    }
}

async fn connect_root<C: Conn>(
    container: &dyn DatabaseContainer,
    config: &TestDbConfig<C>,
) -> Result<(Dsn, C)> {
    let connection_string = container
        .connection_string()
        .await
        .map_err(|source| TestDbError::ConnectionString { source })?;

    let dsn = Dsn::parse(&connection_string)?;
    check_fork_prefix(None, dsn.database())?;

    let root = config
        .connector
        .connect(dsn.options().clone())
        .await
        .map_err(|source| TestDbError::Connect {
            target: "root db".to_string(),
            source,
        })?;

    Ok((dsn, root))
}
