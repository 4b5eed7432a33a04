//! # Hosted Backend
//!
//! Forks on an operator-supplied server. The server is shared with other suites and
//! other CI runs, so every fork name carries a mandatory namespace prefix and every fork
//! is dropped again when its test tears down.

use super::{Mode, TestDb};
use crate::config::TestDbConfig;
use crate::conn::Conn;
use crate::error::{Result, TestDbError};
use crate::fork::{check_fork_prefix, Dsn};
use crate::inject::Dependencies;
use tracing::info;

pub(crate) async fn bootstrap<T, C>(config: TestDbConfig<C>, hosted_dsn: String) -> Result<TestDb<T, C>>
where
    T: Dependencies<C>,
    C: Conn,
{
    if config.hosted_namespace.is_empty() {
        return Err(TestDbError::NamespaceRequired);
    }

    let migrator = config.resolve_migrator()?;

    let dsn = Dsn::parse(&hosted_dsn)?;
    check_fork_prefix(Some(&config.hosted_namespace), dsn.database())?;

    let root = config
        .connector
        .connect(dsn.options().clone())
        .await
        .map_err(|source| TestDbError::Connect {
            target: "hosted db".to_string(),
            source,
        })?;

    info!(
        namespace = %config.hosted_namespace,
        dsn = ?dsn,
        "Connected to hosted database server"
    );

    let namespace = config.hosted_namespace.clone();
    Ok(TestDb::new(config, Mode::Hosted { namespace }, dsn, root, migrator))
}
