//! Pooled store handle shared by request workers.
//!
//! # Invariants
//! - Pooled connections get the same pragmas as [`super::open_db`] ones, and
//!   migrations finish before the first connection is handed out.
//! - Requests never queue behind an in-process lock; concurrent writers are
//!   ordered by SQLite's own write lock and busy timeout.
//! - An in-memory store is one long-lived connection, so its requests take
//!   turns.

use super::migrations::apply_migrations;
use super::open::{configure_connection, IN_MEMORY_PATH};
use super::DbResult;
use log::{error, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Pool size used when the caller does not pick one.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection checked out of a [`Database`]; returns to the pool on drop.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Opens (or creates) the store at `path` with the default pool size;
    /// `:memory:` selects a private in-memory store.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with(path, DEFAULT_MAX_CONNECTIONS)
    }

    /// Opens the store at `path` with up to `max_connections` pooled
    /// connections.
    pub fn open_with(path: impl AsRef<Path>, max_connections: u32) -> DbResult<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY_PATH) {
            return Self::open_in_memory();
        }

        let started_at = Instant::now();
        let manager =
            SqliteConnectionManager::file(path).with_init(|conn| configure_connection(conn, true));
        let pool = Pool::builder()
            .max_size(max_connections.max(1))
            .min_idle(Some(1))
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)
            .map_err(|err| {
                log_open_failure("file", started_at, &err);
                err
            })?;
        Self::migrate(pool, "file", started_at)
    }

    /// Opens a private in-memory store backed by a single connection.
    pub fn open_in_memory() -> DbResult<Self> {
        let started_at = Instant::now();
        let manager =
            SqliteConnectionManager::memory().with_init(|conn| configure_connection(conn, false));
        // Replacing the connection would drop the data, so it never expires.
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)
            .map_err(|err| {
                log_open_failure("memory", started_at, &err);
                err
            })?;
        Self::migrate(pool, "memory", started_at)
    }

    fn migrate(
        pool: Pool<SqliteConnectionManager>,
        mode: &str,
        started_at: Instant,
    ) -> DbResult<Self> {
        let mut conn = pool.get()?;
        if let Err(err) = apply_migrations(&mut conn) {
            log_open_failure(mode, started_at, &err);
            return Err(err);
        }
        drop(conn);

        info!(
            "event=db_open module=db status=ok mode={} pool_size={} duration_ms={}",
            mode,
            pool.max_size(),
            started_at.elapsed().as_millis()
        );
        Ok(Self { pool })
    }

    /// Checks out a connection, waiting while every pooled one is busy.
    pub fn connection(&self) -> DbResult<DbConnection> {
        self.pool.get().map_err(|err| {
            error!(
                "event=db_checkout module=db status=error error_code=pool_timeout error={}",
                err
            );
            err.into()
        })
    }

    /// Runs `f` on a checked-out connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> DbResult<T> {
        let conn = self.connection()?;
        Ok(f(&conn))
    }
}

fn log_open_failure(mode: &str, started_at: Instant, err: &dyn std::fmt::Display) {
    error!(
        "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
        mode,
        started_at.elapsed().as_millis(),
        err
    );
}
