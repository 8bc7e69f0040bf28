//! Schema migrations tracked through `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::infrastructure::error::{StoreError, StoreResult};

/// Latest schema version.
pub const LATEST_VERSION: i64 = 1;

/// v001: trees, paths, steps, options, solutions and the two join tables.
///
/// The CHECK constraints mirror the validator rules.
const V001_INITIAL_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS solutions (
        id          TEXT PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        slug        TEXT NOT NULL,
        creator     TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS trees (
        id          TEXT PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        creator     TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        CONSTRAINT tree_name_per_creator UNIQUE (name, creator)
    );

    CREATE TABLE IF NOT EXISTS paths (
        id          TEXT PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        creator     TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS steps (
        id          TEXT PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        is_first    INTEGER NOT NULL DEFAULT 0,
        is_final    INTEGER NOT NULL DEFAULT 0,
        solution_id TEXT REFERENCES solutions(id) ON DELETE RESTRICT,
        creator     TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        CONSTRAINT not_first_and_final CHECK (is_first = 0 OR is_final = 0),
        CONSTRAINT not_final_with_no_solution CHECK (
            (is_final = 0 AND solution_id IS NULL)
            OR (is_final = 1 AND solution_id IS NOT NULL)
        )
    );

    CREATE TABLE IF NOT EXISTS options (
        id           TEXT PRIMARY KEY NOT NULL,
        name         TEXT NOT NULL,
        step_id      TEXT NOT NULL REFERENCES steps(id) ON DELETE CASCADE,
        next_step_id TEXT REFERENCES steps(id) ON DELETE CASCADE,
        creator      TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        CONSTRAINT steps_not_equal CHECK (next_step_id IS NULL OR next_step_id <> step_id)
    );

    CREATE TABLE IF NOT EXISTS tree_paths (
        tree_id TEXT NOT NULL REFERENCES trees(id) ON DELETE CASCADE,
        path_id TEXT NOT NULL REFERENCES paths(id) ON DELETE CASCADE,
        PRIMARY KEY (tree_id, path_id)
    );

    CREATE TABLE IF NOT EXISTS path_steps (
        path_id TEXT NOT NULL REFERENCES paths(id) ON DELETE CASCADE,
        step_id TEXT NOT NULL REFERENCES steps(id) ON DELETE CASCADE,
        PRIMARY KEY (path_id, step_id)
    );

    CREATE INDEX IF NOT EXISTS idx_steps_name ON steps(name);
    CREATE INDEX IF NOT EXISTS idx_steps_solution ON steps(solution_id);
    CREATE INDEX IF NOT EXISTS idx_options_step ON options(step_id);
    CREATE INDEX IF NOT EXISTS idx_options_next_step ON options(next_step_id);
    CREATE INDEX IF NOT EXISTS idx_tree_paths_path ON tree_paths(path_id);
    CREATE INDEX IF NOT EXISTS idx_path_steps_step ON path_steps(step_id);
";

fn user_version(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to [`LATEST_VERSION`].
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current = user_version(conn)?;
    debug!(current, latest = LATEST_VERSION, "checking schema version");
    if current > LATEST_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{LATEST_VERSION}"
        )));
    }
    if current >= LATEST_VERSION {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(V001_INITIAL_SCHEMA)
        .map_err(|e| StoreError::Migration(format!("v001: {e}")))?;
    tx.execute_batch(&format!("PRAGMA user_version = {LATEST_VERSION}"))?;
    tx.commit()?;
    info!(version = LATEST_VERSION, "schema migrated");
    Ok(())
}
