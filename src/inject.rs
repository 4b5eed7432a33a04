//! # Dependency Injection
//!
//! Test dependency structs declare, once, which of their fields receive which forked
//! resource and under what label:
//!
//! ```rust
//! use sqlx::postgres::PgConnectOptions;
//! use tasker_testdb::{Bindings, Connect, Dependencies};
//!
//! #[derive(Default)]
//! struct Deps {
//!     conn: Option<Connect>,
//!     options: Option<PgConnectOptions>,
//!     dsn: String,
//! }
//!
//! impl Dependencies for Deps {
//!     fn bindings() -> Bindings<Self> {
//!         Bindings::new()
//!             .conn("postgres", |deps: &mut Deps, conn| deps.conn = Some(conn))
//!             .options("postgres.config", |deps: &mut Deps, opts| deps.options = Some(opts))
//!             .dsn("postgres.dsn", |deps: &mut Deps, dsn| deps.dsn = dsn)
//!     }
//! }
//! ```
//!
//! At fork time only setters whose label equals the configured label for that resource
//! run; everything else in the struct is left as the test passed it in.

use crate::conn::{Conn, Connect};
use sqlx::postgres::{PgConnectOptions, PgPool};

type Setter<T, V> = Box<dyn Fn(&mut T, V) + Send + Sync>;

/// Typed setter table for a dependency struct `T`.
pub struct Bindings<T, C = PgPool> {
    conn: Vec<(String, Setter<T, Connect<C>>)>,
    options: Vec<(String, Setter<T, PgConnectOptions>)>,
    dsn: Vec<(String, Setter<T, String>)>,
}

impl<T, C> Default for Bindings<T, C> {
    fn default() -> Self {
        Self {
            conn: Vec::new(),
            options: Vec::new(),
            dsn: Vec::new(),
        }
    }
}

impl<T, C> std::fmt::Debug for Bindings<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("conn", &labels_of(&self.conn))
            .field("options", &labels_of(&self.options))
            .field("dsn", &labels_of(&self.dsn))
            .finish()
    }
}

fn labels_of<S>(setters: &[(String, S)]) -> Vec<&str> {
    setters.iter().map(|(label, _)| label.as_str()).collect()
}

impl<T, C: Clone> Bindings<T, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conn(
        mut self,
        label: impl Into<String>,
        setter: impl Fn(&mut T, Connect<C>) + Send + Sync + 'static,
    ) -> Self {
        self.conn.push((label.into(), Box::new(setter)));
        self
    }

    pub fn options(
        mut self,
        label: impl Into<String>,
        setter: impl Fn(&mut T, PgConnectOptions) + Send + Sync + 'static,
    ) -> Self {
        self.options.push((label.into(), Box::new(setter)));
        self
    }

    pub fn dsn(
        mut self,
        label: impl Into<String>,
        setter: impl Fn(&mut T, String) + Send + Sync + 'static,
    ) -> Self {
        self.dsn.push((label.into(), Box::new(setter)));
        self
    }

    /// Run the setters matching `labels`, returning how many fields were populated
    pub fn apply(&self, to: &mut T, labels: &Labels, resources: &Resources<C>) -> usize {
        let mut populated = 0;
        populated += apply_matching(&self.conn, &labels.conn, to, || resources.conn.clone());
        populated += apply_matching(&self.options, &labels.options, to, || {
            resources.options.clone()
        });
        populated += apply_matching(&self.dsn, &labels.dsn, to, || resources.dsn.clone());
        populated
    }
}

fn apply_matching<T, V>(
    setters: &[(String, Setter<T, V>)],
    label: &str,
    to: &mut T,
    value: impl Fn() -> V,
) -> usize {
    if label.is_empty() {
        return 0;
    }

    let mut populated = 0;
    for (_, setter) in setters.iter().filter(|(bound, _)| bound == label) {
        setter(to, value());
        populated += 1;
    }
    populated
}

/// A struct that can receive forked resources.
pub trait Dependencies<C: Conn = PgPool>: Sized + Send + 'static {
    fn bindings() -> Bindings<Self, C>;
}

/// Configured label per resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub conn: String,
    pub options: String,
    pub dsn: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            conn: "postgres".to_string(),
            options: "postgres.config".to_string(),
            dsn: "postgres.dsn".to_string(),
        }
    }
}

/// The resources produced by one fork.
#[derive(Debug, Clone)]
pub struct Resources<C = PgPool> {
    pub conn: Connect<C>,
    pub options: PgConnectOptions,
    pub dsn: String,
}
