//! # Fork Naming
//!
//! Every test gets its own database, named from the base database of the root DSN and a
//! process-lifetime counter: `base_1`, `base_2`, ... Hosted servers are shared, so their
//! forks additionally carry an operator namespace in front: `{namespace}{base}_{N}`.
//! Uniqueness comes solely from the counter; names are never checked for collisions.
//! PostgreSQL truncates identifiers past [`MAX_IDENTIFIER_LEN`] bytes, which would make
//! two counter values collide, so over-long names are refused instead.

use crate::error::{Result, TestDbError};
use percent_encoding::percent_decode_str;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

/// Monotonic fork counter shared by every fork of one backend.
#[derive(Debug, Default)]
pub struct ForkCounter(AtomicU32);

impl ForkCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next fork number, starting at 1
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn issued(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Longest identifier PostgreSQL keeps without truncating (`NAMEDATALEN - 1`)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Name for fork `n` of `base`, optionally prefixed with a hosted namespace.
pub fn fork_name(namespace: Option<&str>, base: &str, n: u32) -> String {
    format!("{}{base}_{n}", namespace.unwrap_or_default())
}

/// [`fork_name`], refusing names PostgreSQL would truncate.
pub fn checked_fork_name(namespace: Option<&str>, base: &str, n: u32) -> Result<String> {
    let name = fork_name(namespace, base, n);
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(TestDbError::ForkNameTooLong {
            name,
            max: MAX_IDENTIFIER_LEN,
        });
    }
    Ok(name)
}

/// Fail at bootstrap when namespace and base leave no room for even the first fork.
pub fn check_fork_prefix(namespace: Option<&str>, base: &str) -> Result<()> {
    checked_fork_name(namespace, base, 1).map(drop)
}

/// Quote an identifier for interpolation into DDL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn create_database_sql(name: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(name))
}

pub fn drop_database_sql(name: &str) -> String {
    format!("DROP DATABASE IF EXISTS {}", quote_ident(name))
}

/// A DSN broken down into the pieces forking needs.
#[derive(Clone)]
pub struct Dsn {
    url: Url,
    options: PgConnectOptions,
    username: String,
    password: Option<String>,
}

impl Dsn {
    pub fn parse(dsn: &str) -> Result<Self> {
        let options =
            PgConnectOptions::from_str(dsn).map_err(|source| TestDbError::ParseDsn { source })?;
        let url = Url::parse(dsn).map_err(|e| TestDbError::ParseDsn {
            source: sqlx::Error::Configuration(Box::new(e)),
        })?;

        let username = decode_credential(url.username())?;
        let password = url.password().map(decode_credential).transpose()?;

        Ok(Self {
            url,
            options,
            username,
            password,
        })
    }

    pub fn options(&self) -> &PgConnectOptions {
        &self.options
    }

    /// Database named in the DSN path; empty when the DSN names none
    pub fn database(&self) -> &str {
        self.url.path().trim_start_matches('/')
    }

    /// Percent-decoded user name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Percent-decoded password
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The same DSN pointed at another database
    pub fn with_database(&self, database: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(&format!("/{database}"));
        Self {
            url,
            options: self.options.clone().database(database),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

fn decode_credential(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| TestDbError::ParseDsn {
            source: sqlx::Error::Configuration(Box::new(e)),
        })
}

impl std::fmt::Debug for Dsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut masked = self.url.clone();
        if masked.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        f.debug_tuple("Dsn").field(&masked.as_str()).finish()
    }
}
