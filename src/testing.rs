//! In-memory stand-ins for database handles, for unit-testing code built on top of the
//! forking machinery without a running PostgreSQL.

use crate::backend::container::{ContainerRunner, ContainerSpec, DatabaseContainer};
use crate::conn::{Conn, Connector};
use crate::error::BoxError;
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::postgres::PgConnectOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Recorded {
    executed: Mutex<Vec<String>>,
    fail_on: Mutex<Vec<String>>,
    fail_ping: AtomicBool,
    pings: Mutex<u32>,
    closed: AtomicBool,
}

/// Connection that records every executed statement. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingConn {
    inner: Arc<Recorded>,
}

impl RecordingConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `exec` fail for exactly this statement text
    pub fn fail_on(self, sql: &str) -> Self {
        self.inner.fail_on.lock().push(sql.to_string());
        self
    }

    pub fn fail_ping(self) -> Self {
        self.inner.fail_ping.store(true, Ordering::SeqCst);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.inner.executed.lock().clone()
    }

    pub fn pings(&self) -> u32 {
        *self.inner.pings.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Conn for RecordingConn {
    async fn exec(&self, sql: &str) -> Result<(), sqlx::Error> {
        if self.is_closed() {
            return Err(sqlx::Error::PoolClosed);
        }
        self.inner.executed.lock().push(sql.to_string());
        if self.inner.fail_on.lock().iter().any(|f| f == sql) {
            return Err(sqlx::Error::Protocol(format!("rejected statement: {sql}")));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        *self.inner.pings.lock() += 1;
        if self.inner.fail_ping.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out [`RecordingConn`]s and remembering which database each was
/// opened for.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    opened: Arc<Mutex<Vec<(Option<String>, RecordingConn)>>>,
    prepared: Arc<Mutex<Vec<RecordingConn>>>,
    refuse: Arc<AtomicBool>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out `conn` for the next connect instead of a fresh one
    pub fn prepare(&self, conn: RecordingConn) -> &Self {
        self.prepared.lock().push(conn);
        self
    }

    /// Make every connect attempt fail
    pub fn refuse(self) -> Self {
        self.refuse.store(true, Ordering::SeqCst);
        self
    }

    /// Connections opened so far, with the database each targeted
    pub fn opened(&self) -> Vec<(Option<String>, RecordingConn)> {
        self.opened.lock().clone()
    }

    pub fn connection(&self, index: usize) -> Option<RecordingConn> {
        self.opened.lock().get(index).map(|(_, conn)| conn.clone())
    }
}

#[async_trait]
impl Connector<RecordingConn> for RecordingConnector {
    async fn connect(&self, options: PgConnectOptions) -> Result<RecordingConn, sqlx::Error> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Configuration("connection refused".into()));
        }

        let conn = {
            let mut prepared = self.prepared.lock();
            if prepared.is_empty() {
                RecordingConn::new()
            } else {
                prepared.remove(0)
            }
        };
        self.opened
            .lock()
            .push((options.get_database().map(str::to_string), conn.clone()));
        Ok(conn)
    }
}

/// Container runner that starts nothing and hands out a fixed connection string.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    connection_string: Option<String>,
    fail_start: bool,
    started: Arc<Mutex<Vec<ContainerSpec>>>,
    terminated: Arc<AtomicBool>,
}

impl FakeRunner {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            fail_start: false,
            started: Arc::default(),
            terminated: Arc::default(),
        }
    }

    /// Containers start, but can't report a connection string
    pub fn without_connection_string() -> Self {
        Self {
            connection_string: None,
            ..Self::new("")
        }
    }

    /// Containers fail to start
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new("")
        }
    }

    pub fn started(&self) -> Vec<ContainerSpec> {
        self.started.lock().clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRunner for FakeRunner {
    async fn run(&self, spec: &ContainerSpec) -> Result<Box<dyn DatabaseContainer>, BoxError> {
        if self.fail_start {
            return Err("container runtime unavailable".into());
        }
        self.started.lock().push(spec.clone());

        Ok(Box::new(FakeContainer {
            connection_string: self.connection_string.clone(),
            terminated: self.terminated.clone(),
        }))
    }
}

struct FakeContainer {
    connection_string: Option<String>,
    terminated: Arc<AtomicBool>,
}

#[async_trait]
impl DatabaseContainer for FakeContainer {
    async fn connection_string(&self) -> Result<String, BoxError> {
        self.connection_string
            .clone()
            .ok_or_else(|| "container has no mapped port".into())
    }

    async fn terminate(&mut self) -> Result<(), BoxError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}
