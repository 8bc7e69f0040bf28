//! SQLite-backed [`GraphStore`].
//!
//! One connection behind a mutex. A transaction holds the lock for its whole
//! lifetime; across processes, `BEGIN IMMEDIATE` plus `busy_timeout`
//! serialise writers.

mod migrations;
mod rows;
mod tx;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{GraphStore, GraphTx};

pub use migrations::LATEST_VERSION;
pub use tx::SqliteTx;

/// Default wait for a competing writer to release the database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and migrate it.
    #[instrument(level = "debug")]
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Migration(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, "journal mode");
        Self::init(conn, busy_timeout)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, DEFAULT_BUSY_TIMEOUT)
    }

    fn init(conn: Connection, busy_timeout: Duration) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(busy_timeout)?;
        migrations::run_migrations(&conn)?;
        debug!(?busy_timeout, "store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn begin(&self, begin: &str) -> StoreResult<Box<dyn GraphTx + '_>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Box::new(SqliteTx::begin(conn, begin)?))
    }
}

impl GraphStore for SqliteStore {
    fn write(&self) -> StoreResult<Box<dyn GraphTx + '_>> {
        self.begin("BEGIN IMMEDIATE")
    }

    fn read(&self) -> StoreResult<Box<dyn GraphTx + '_>> {
        self.begin("BEGIN DEFERRED")
    }
}
