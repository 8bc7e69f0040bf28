//! Path service

use tracing::{debug, info};

use crate::application::views::{path_solution, CleanupReport, PathView, SolutionView};
use crate::application::ApplicationResult;
use crate::domain::{validate_name, Path, PathId, Principal, StepId, TreeId};

use super::{authorize_write, load_path, load_step, load_tree, CleanupCoordinator, Store};

pub struct PathService {
    store: Store,
}

impl PathService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a path, optionally adding it to `tree` in the same transaction.
    pub fn create(
        &self,
        actor: &Principal,
        name: &str,
        tree: Option<TreeId>,
    ) -> ApplicationResult<Path> {
        debug!("create: path name={} tree={:?}", name, tree);
        authorize_write(actor)?;
        validate_name("path", name)?;

        let tx = self.store.write()?;
        if let Some(tree) = tree {
            load_tree(&*tx, tree)?;
        }
        let path = Path::new(name, &actor.name);
        tx.insert_path(&path)?;
        if let Some(tree) = tree {
            tx.add_path_to_tree(tree, path.id)?;
        }
        tx.commit()?;

        info!(path = %path.id, name = %path.name, "path created");
        Ok(path)
    }

    pub fn rename(&self, actor: &Principal, id: PathId, name: &str) -> ApplicationResult<Path> {
        debug!("rename: path={} name={}", id, name);
        authorize_write(actor)?;
        validate_name("path", name)?;

        let tx = self.store.write()?;
        let mut path = load_path(&*tx, id)?;
        path.name = name.to_string();
        tx.update_path(&path)?;
        tx.commit()?;
        info!(path = %path.id, name = %path.name, "path renamed");
        Ok(path)
    }

    /// Share an existing step with this path.
    pub fn attach_step(
        &self,
        actor: &Principal,
        path: PathId,
        step: StepId,
    ) -> ApplicationResult<()> {
        debug!("attach_step: path={} step={}", path, step);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        load_path(&*tx, path)?;
        load_step(&*tx, step)?;
        tx.attach_step(path, step)?;
        tx.commit()?;
        info!(%path, %step, "step attached");
        Ok(())
    }

    /// Solution of the path's final step, if it has one.
    pub fn solution(&self, id: PathId) -> ApplicationResult<Option<SolutionView>> {
        let tx = self.store.read()?;
        load_path(&*tx, id)?;
        let steps = tx.steps_of_path(id)?;
        path_solution(&*tx, &steps)
    }

    /// Delete the path together with the steps no other path owns.
    pub fn delete(&self, actor: &Principal, id: PathId) -> ApplicationResult<CleanupReport> {
        debug!("delete: path={}", id);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let report = CleanupCoordinator::delete_path(&*tx, id)?;
        tx.commit()?;
        Ok(report)
    }

    pub fn get(&self, id: PathId) -> ApplicationResult<PathView> {
        let tx = self.store.read()?;
        let path = load_path(&*tx, id)?;
        PathView::load(&*tx, path)
    }

    pub fn list(&self) -> ApplicationResult<Vec<Path>> {
        let tx = self.store.read()?;
        Ok(tx.list_paths()?)
    }
}
