//! Shared helpers for the integration tests.

use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use tasker_testdb::{Bindings, Connect, Dependencies};

/// Dependencies handed to every test, populated per fork.
#[derive(Default)]
pub struct Deps {
    pub conn: Option<Connect>,
    pub options: Option<PgConnectOptions>,
    pub dsn: String,
}

impl Dependencies for Deps {
    fn bindings() -> Bindings<Self> {
        Bindings::new()
            .conn("postgres", |deps: &mut Deps, conn| deps.conn = Some(conn))
            .options("postgres.config", |deps: &mut Deps, options| {
                deps.options = Some(options)
            })
            .dsn("postgres.dsn", |deps: &mut Deps, dsn| deps.dsn = dsn)
    }
}

impl Deps {
    pub fn pool(&self) -> &sqlx::PgPool {
        self.conn
            .as_ref()
            .expect("connection was not injected")
            .pool()
    }
}

pub fn fixture_migrations() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/migrations")
}
