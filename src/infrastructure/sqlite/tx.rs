//! [`GraphTx`] over one locked SQLite connection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::MutexGuard;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, trace};

use crate::domain::{
    OptionId, Path, PathId, Solution, SolutionId, Step, StepId, StepOption, Tree, TreeId,
};
use crate::infrastructure::error::StoreResult;
use crate::infrastructure::sqlite::rows::{
    encode_ts, option_from_row, path_from_row, solution_from_row, step_row, tree_from_row,
    StepRow, OPTION_COLUMNS, PATH_COLUMNS, SOLUTION_COLUMNS, STEP_COLUMNS, TREE_COLUMNS,
};
use crate::infrastructure::traits::GraphTx;

const TREE_STEP_IDS: &str = "SELECT ps.step_id FROM path_steps ps
     JOIN tree_paths tp ON tp.path_id = ps.path_id
     WHERE tp.tree_id = ?1";
const PATH_STEP_IDS: &str = "SELECT step_id FROM path_steps WHERE path_id = ?1";
const STEP_ID: &str = "SELECT ?1";

/// Open transaction holding the connection lock until commit or drop.
pub struct SqliteTx<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl<'a> SqliteTx<'a> {
    /// Start a transaction with the given `BEGIN` flavour.
    pub(super) fn begin(conn: MutexGuard<'a, Connection>, begin: &str) -> StoreResult<Self> {
        conn.execute_batch(begin)?;
        trace!(begin, "transaction started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Steps whose id is produced by `filter` (a single-column subquery
    /// taking `param` as `?1`), with their owning-path sets.
    fn load_steps<P: ToSql>(&self, filter: &str, param: P) -> StoreResult<Vec<Step>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STEP_COLUMNS} FROM steps WHERE id IN ({filter}) ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map(params![param], step_row)?
            .collect::<Result<Vec<StepRow>, _>>()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT step_id, path_id FROM path_steps WHERE step_id IN ({filter})"
        ))?;
        let mut owners: HashMap<StepId, BTreeSet<PathId>> = HashMap::new();
        let pairs = stmt.query_map(params![param], |row| {
            Ok((row.get::<_, StepId>(0)?, row.get::<_, PathId>(1)?))
        })?;
        for pair in pairs {
            let (step, path) = pair?;
            owners.entry(step).or_default().insert(path);
        }

        rows.into_iter()
            .map(|row| {
                let paths = owners.remove(&row.id).unwrap_or_default();
                row.into_step(paths)
            })
            .collect()
    }

    fn load_options<P: ToSql>(&self, filter: &str, param: P) -> StoreResult<Vec<StepOption>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OPTION_COLUMNS} FROM options WHERE step_id IN ({filter})
             ORDER BY created_at, id"
        ))?;
        let options = stmt
            .query_map(params![param], option_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }

    fn tree_path_ids(&self, tree: TreeId) -> StoreResult<Vec<PathId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path_id FROM tree_paths WHERE tree_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![tree], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn path_step_ids(&self, path: PathId) -> StoreResult<Vec<StepId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT step_id FROM path_steps WHERE path_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![path], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn with_paths(&self, mut tree: Tree) -> StoreResult<Tree> {
        tree.paths = self.tree_path_ids(tree.id)?;
        Ok(tree)
    }

    fn with_steps(&self, mut path: Path) -> StoreResult<Path> {
        path.steps = self.path_step_ids(path.id)?;
        Ok(path)
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                debug!(error = %e, "rollback failed");
            } else {
                trace!("transaction rolled back");
            }
        }
    }
}

impl GraphTx for SqliteTx<'_> {
    // ---------------------------------------------------------------- trees

    fn insert_tree(&self, tree: &Tree) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO trees ({TREE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                tree.id,
                tree.name,
                tree.description,
                tree.creator,
                encode_ts(&tree.created_at)
            ],
        )?;
        for path in &tree.paths {
            self.add_path_to_tree(tree.id, *path)?;
        }
        Ok(())
    }

    fn update_tree(&self, tree: &Tree) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE trees SET name = ?2, description = ?3 WHERE id = ?1",
            params![tree.id, tree.name, tree.description],
        )?;
        Ok(())
    }

    fn set_tree_paths(&self, tree: TreeId, paths: &[PathId]) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM tree_paths WHERE tree_id = ?1", params![tree])?;
        for path in paths {
            self.add_path_to_tree(tree, *path)?;
        }
        Ok(())
    }

    fn get_tree(&self, id: TreeId) -> StoreResult<Option<Tree>> {
        let tree = self
            .conn
            .query_row(
                &format!("SELECT {TREE_COLUMNS} FROM trees WHERE id = ?1"),
                params![id],
                tree_from_row,
            )
            .optional()?;
        tree.map(|t| self.with_paths(t)).transpose()
    }

    fn find_tree(&self, creator: &str, name: &str) -> StoreResult<Option<Tree>> {
        let tree = self
            .conn
            .query_row(
                &format!("SELECT {TREE_COLUMNS} FROM trees WHERE creator = ?1 AND name = ?2"),
                params![creator, name],
                tree_from_row,
            )
            .optional()?;
        tree.map(|t| self.with_paths(t)).transpose()
    }

    fn list_trees(&self) -> StoreResult<Vec<Tree>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TREE_COLUMNS} FROM trees ORDER BY created_at, id"
        ))?;
        let trees = stmt
            .query_map([], tree_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        trees.into_iter().map(|t| self.with_paths(t)).collect()
    }

    fn delete_tree(&self, id: TreeId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM trees WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // ---------------------------------------------------------------- paths

    fn insert_path(&self, path: &Path) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO paths ({PATH_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"),
            params![path.id, path.name, path.creator, encode_ts(&path.created_at)],
        )?;
        for step in &path.steps {
            self.attach_step(path.id, *step)?;
        }
        Ok(())
    }

    fn update_path(&self, path: &Path) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE paths SET name = ?2 WHERE id = ?1",
            params![path.id, path.name],
        )?;
        Ok(())
    }

    fn get_path(&self, id: PathId) -> StoreResult<Option<Path>> {
        let path = self
            .conn
            .query_row(
                &format!("SELECT {PATH_COLUMNS} FROM paths WHERE id = ?1"),
                params![id],
                path_from_row,
            )
            .optional()?;
        path.map(|p| self.with_steps(p)).transpose()
    }

    fn list_paths(&self) -> StoreResult<Vec<Path>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATH_COLUMNS} FROM paths ORDER BY created_at, id"
        ))?;
        let paths = stmt
            .query_map([], path_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        paths.into_iter().map(|p| self.with_steps(p)).collect()
    }

    fn add_path_to_tree(&self, tree: TreeId, path: PathId) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tree_paths (tree_id, path_id) VALUES (?1, ?2)",
            params![tree, path],
        )?;
        Ok(())
    }

    fn attach_step(&self, path: PathId, step: StepId) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO path_steps (path_id, step_id) VALUES (?1, ?2)",
            params![path, step],
        )?;
        Ok(())
    }

    fn step_memberships(&self, path: PathId) -> StoreResult<BTreeMap<StepId, BTreeSet<PathId>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT step_id, path_id FROM path_steps WHERE step_id IN ({PATH_STEP_IDS})"
        ))?;
        let mut memberships: BTreeMap<StepId, BTreeSet<PathId>> = BTreeMap::new();
        let pairs = stmt.query_map(params![path], |row| {
            Ok((row.get::<_, StepId>(0)?, row.get::<_, PathId>(1)?))
        })?;
        for pair in pairs {
            let (step, owner) = pair?;
            memberships.entry(step).or_default().insert(owner);
        }
        Ok(memberships)
    }

    fn delete_path(&self, id: PathId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM paths WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // ---------------------------------------------------------------- steps

    fn insert_step(&self, step: &Step) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO steps ({STEP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                step.id,
                step.name,
                step.role.is_first(),
                step.role.is_final(),
                step.role.solution(),
                step.creator,
                encode_ts(&step.created_at)
            ],
        )?;
        for path in &step.paths {
            self.attach_step(*path, step.id)?;
        }
        Ok(())
    }

    fn update_step(&self, step: &Step) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE steps SET name = ?2, is_first = ?3, is_final = ?4, solution_id = ?5
             WHERE id = ?1",
            params![
                step.id,
                step.name,
                step.role.is_first(),
                step.role.is_final(),
                step.role.solution()
            ],
        )?;
        Ok(())
    }

    fn get_step(&self, id: StepId) -> StoreResult<Option<Step>> {
        Ok(self.load_steps(STEP_ID, id)?.into_iter().next())
    }

    fn steps_of_path(&self, path: PathId) -> StoreResult<Vec<Step>> {
        self.load_steps(PATH_STEP_IDS, path)
    }

    fn steps_of_tree(&self, tree: TreeId) -> StoreResult<Vec<Step>> {
        self.load_steps(TREE_STEP_IDS, tree)
    }

    fn delete_step(&self, id: StepId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM steps WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // -------------------------------------------------------------- options

    fn insert_option(&self, option: &StepOption) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO options ({OPTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                option.id,
                option.name,
                option.step,
                option.next_step,
                option.creator,
                encode_ts(&option.created_at)
            ],
        )?;
        Ok(())
    }

    fn update_option(&self, option: &StepOption) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE options SET name = ?2, step_id = ?3, next_step_id = ?4 WHERE id = ?1",
            params![option.id, option.name, option.step, option.next_step],
        )?;
        Ok(())
    }

    fn get_option(&self, id: OptionId) -> StoreResult<Option<StepOption>> {
        let option = self
            .conn
            .query_row(
                &format!("SELECT {OPTION_COLUMNS} FROM options WHERE id = ?1"),
                params![id],
                option_from_row,
            )
            .optional()?;
        Ok(option)
    }

    fn options_of_step(&self, step: StepId) -> StoreResult<Vec<StepOption>> {
        self.load_options(STEP_ID, step)
    }

    fn options_of_tree(&self, tree: TreeId) -> StoreResult<Vec<StepOption>> {
        self.load_options(TREE_STEP_IDS, tree)
    }

    fn count_options(&self, step: StepId) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM options WHERE step_id = ?1",
            params![step],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn delete_option(&self, id: OptionId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM options WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // ------------------------------------------------------------ solutions

    fn insert_solution(&self, solution: &Solution) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO solutions ({SOLUTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                solution.id,
                solution.name,
                solution.description,
                solution.slug,
                solution.creator,
                encode_ts(&solution.created_at)
            ],
        )?;
        Ok(())
    }

    fn update_solution(&self, solution: &Solution) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE solutions SET name = ?2, description = ?3, slug = ?4 WHERE id = ?1",
            params![
                solution.id,
                solution.name,
                solution.description,
                solution.slug
            ],
        )?;
        Ok(())
    }

    fn get_solution(&self, id: SolutionId) -> StoreResult<Option<Solution>> {
        let solution = self
            .conn
            .query_row(
                &format!("SELECT {SOLUTION_COLUMNS} FROM solutions WHERE id = ?1"),
                params![id],
                solution_from_row,
            )
            .optional()?;
        Ok(solution)
    }

    fn list_solutions(&self) -> StoreResult<Vec<Solution>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SOLUTION_COLUMNS} FROM solutions ORDER BY created_at, id"
        ))?;
        let solutions = stmt
            .query_map([], solution_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(solutions)
    }

    fn final_steps_using(&self, id: SolutionId) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM steps WHERE solution_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn delete_solution(&self, id: SolutionId) -> StoreResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM solutions WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        trace!("transaction committed");
        Ok(())
    }
}
